use anyhow::Context;
use std::path::Path;
use tracing::{info, warn};

use crate::checks::report::CheckReport;
use crate::utils::binary_payload::{decode_payload, decode_to_utf8, DecodeError};
use crate::utils::content_guard::{printable_text, safe_truncate_utf8};
use crate::utils::content_kind::{classify, ContentKind};
use crate::utils::format_signature::{
    FormatSignature, HeaderCheck, SignatureRegistry, TrailerCheck, TruncationReason,
};
use crate::utils::markup::{reduce_markup, MarkupReduction};

const PREVIEW_CHARS: usize = 200;

/// Where a payload ended up after classification and decoding
#[derive(Debug, Clone)]
pub enum Dispatched {
    /// Literal text, possibly reduced from markup
    Text(MarkupReduction),
    /// Decoded bytes checked against a format signature
    Binary {
        signature: FormatSignature,
        header: HeaderCheck,
        trailer: TrailerCheck,
        bytes: Vec<u8>,
    },
    /// Base64 that decoded to readable text (e.g. an encoded HTML body)
    DecodedText {
        decoded_len: usize,
        reduction: MarkupReduction,
    },
    /// Decoded bytes matching no known signature
    UnknownBinary { bytes: Vec<u8> },
}

/// Classifies a payload and routes it to markup reduction or decode-and-validate.
///
/// `expected` pins the format to validate against; otherwise the registry picks
/// one by header. `charset` is the declared encoding of decoded text bodies.
/// Only base64 decoding can fail.
pub fn dispatch(
    payload: &str,
    registry: &SignatureRegistry,
    expected: Option<&FormatSignature>,
    charset: Option<&str>,
) -> Result<Dispatched, DecodeError> {
    match classify(payload) {
        ContentKind::PlainOrMarkupText => Ok(Dispatched::Text(reduce_markup(payload))),
        ContentKind::EncodedBinary => {
            let bytes = decode_payload(payload)?;

            if let Some(signature) = expected.or_else(|| registry.identify(&bytes)) {
                return Ok(Dispatched::Binary {
                    signature: signature.clone(),
                    header: signature.check_header(&bytes),
                    trailer: signature.check_trailer(&bytes),
                    bytes,
                });
            }

            let text = decode_to_utf8(&bytes, charset).ok();
            match text.as_deref().and_then(printable_text) {
                Some(text) => Ok(Dispatched::DecodedText {
                    decoded_len: bytes.len(),
                    reduction: reduce_markup(text),
                }),
                None => Ok(Dispatched::UnknownBinary { bytes }),
            }
        }
    }
}

/// Builds the diagnostic report for a single payload.
pub fn payload_report(
    name: &str,
    payload: &str,
    registry: &SignatureRegistry,
    expected: Option<&FormatSignature>,
    charset: Option<&str>,
    save_to: Option<&Path>,
) -> CheckReport {
    let mut report = CheckReport::new(format!("Payload check: {}", name));
    let kind = classify(payload);
    info!(target: "payload_check", name = name, len = payload.len(), kind = kind.label(), "Classified payload");

    report.info("Length", format!("{} characters", payload.len()));
    report.info("Classification", kind.label());

    let dispatched = match dispatch(payload, registry, expected, charset) {
        Ok(dispatched) => dispatched,
        Err(e) => {
            warn!(target: "payload_check", name = name, "Base64 decode failed: {}", e);
            report.fail("Decode", e.to_string());
            return report;
        }
    };

    match dispatched {
        Dispatched::Text(reduction) => describe_reduction(&mut report, &reduction),
        Dispatched::DecodedText {
            decoded_len,
            reduction,
        } => {
            report.pass("Decode", format!("{} bytes of encoded text", decoded_len));
            describe_reduction(&mut report, &reduction);
        }
        Dispatched::UnknownBinary { bytes } => {
            report.pass("Decode", format!("{} bytes", bytes.len()));
            report.warn(
                "Format",
                format!("no known signature ({})", registry.names().join(", ")),
            );
            save_artifact(&mut report, &bytes, save_to);
        }
        Dispatched::Binary {
            signature,
            header,
            trailer,
            bytes,
        } => {
            report.pass("Decode", format!("{} bytes", bytes.len()));
            describe_signature(&mut report, &signature, header, trailer);
            save_artifact(&mut report, &bytes, save_to);
        }
    }

    report
}

fn describe_reduction(report: &mut CheckReport, reduction: &MarkupReduction) {
    match reduction {
        MarkupReduction::Unchanged(text) => {
            report.pass("Text", safe_truncate_utf8(text, PREVIEW_CHARS, "..."));
        }
        MarkupReduction::Extracted { text, parse_errors } => {
            report.pass(
                "Markup",
                format!(
                    "reduced to {} characters ({} parse errors recovered)",
                    text.len(),
                    parse_errors
                ),
            );
            report.info("Text", safe_truncate_utf8(text, PREVIEW_CHARS, "..."));
        }
        MarkupReduction::Fallback { original, note } => {
            report.warn("Markup", note.as_str());
            report.info("Text", safe_truncate_utf8(original, PREVIEW_CHARS, "..."));
        }
    }
}

/// Adds header and trailer lines; neither can fail the report.
pub fn describe_signature(
    report: &mut CheckReport,
    signature: &FormatSignature,
    header: HeaderCheck,
    trailer: TrailerCheck,
) {
    report.info("Format", format!("{} ({})", signature.name, signature.mime));
    match header {
        HeaderCheck::Valid => report.pass("Header", format!("valid {} signature", signature.name)),
        HeaderCheck::Invalid => {
            report.warn("Header", format!("invalid {} signature", signature.name))
        }
    }

    match trailer {
        TrailerCheck::Complete { marker_offset } => {
            report.pass("Trailer", format!("complete (marker at byte {})", marker_offset))
        }
        TrailerCheck::PossiblyTruncated(TruncationReason::MarkerMissing) => {
            report.warn("Trailer", "end-of-file marker missing, possibly truncated")
        }
        TrailerCheck::PossiblyTruncated(TruncationReason::TrailingBytes { count }) => {
            report.warn(
                "Trailer",
                format!("{} bytes after end-of-file marker, possibly truncated", count),
            )
        }
        TrailerCheck::NotApplicable => {
            report.info("Trailer", format!("{} has no end-of-file marker", signature.name))
        }
    }
}

pub fn save_artifact(report: &mut CheckReport, bytes: &[u8], save_to: Option<&Path>) {
    let Some(path) = save_to else {
        return;
    };
    let written = std::fs::write(path, bytes)
        .with_context(|| format!("failed to write decoded payload to {}", path.display()));
    match written {
        Ok(()) => {
            info!(target: "payload_check", path = %path.display(), size = bytes.len(), "Saved decoded payload");
            report.pass("Saved", path.display().to_string());
        }
        Err(e) => {
            warn!(target: "payload_check", "{:#}", e);
            report.fail("Saved", format!("{:#}", e));
        }
    }
}
