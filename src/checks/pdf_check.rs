use std::path::Path;
use tracing::{info, warn};

use crate::checks::payload_check::{describe_signature, save_artifact};
use crate::checks::report::CheckReport;
use crate::utils::binary_payload::decode_payload;
use crate::utils::content_guard::safe_truncate_utf8;
use crate::utils::format_signature::PDF;
use crate::utils::pdf::{extract_text_from_pdf_mem, PdfStructure};

const TEXT_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct PdfCheckOptions<'a> {
    pub save_to: Option<&'a Path>,
    pub extract_text: bool,
}

/// Decodes a base64 PDF payload and reports its structure.
pub fn inspect_pdf(payload: &str, options: &PdfCheckOptions<'_>) -> CheckReport {
    let mut report = CheckReport::new("PDF payload analysis");
    report.info("Base64 length", format!("{} characters", payload.trim().len()));

    let bytes = match decode_payload(payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(target: "pdf_check", "Base64 decode failed: {}", e);
            report.fail("Decode", e.to_string());
            return report;
        }
    };
    report.pass("Decode", format!("{} bytes", bytes.len()));

    let structure = PdfStructure::analyze(&bytes);
    info!(target: "pdf_check", size = structure.size, lines = structure.line_count, complete = structure.trailer.is_complete(), "PDF structure analyzed");

    report.info("Head", structure.head_preview.as_str());
    report.info("Tail", structure.tail_preview.as_str());
    describe_signature(&mut report, &PDF, structure.header, structure.trailer);
    if let Some(version) = &structure.version_line {
        report.info("Version", version.as_str());
    }
    match (&structure.eof_offset, &structure.after_eof) {
        (Some(offset), Some(rest)) => {
            report.info("%%EOF position", offset.to_string());
            report.info("After %%EOF", format!("{:?}", rest));
        }
        _ => report.info("%%EOF position", "not found"),
    }

    report.info("Total lines", structure.line_count.to_string());
    report.info("First line", format!("{:?}", structure.first_line));
    for (number, line) in &structure.last_lines {
        report.info(format!("Line {}", number), format!("{:?}", line));
    }

    save_artifact(&mut report, &bytes, options.save_to);

    if options.extract_text {
        let started = std::time::Instant::now();
        match extract_text_from_pdf_mem(&bytes) {
            Ok(text) => {
                info!(target: "pdf_check", elapsed_ms = started.elapsed().as_millis() as u64, len = text.len(), "PDF text extraction succeeded");
                report.pass("Text extraction", format!("{} characters", text.len()));
                report.info(
                    "Text",
                    safe_truncate_utf8(text.trim(), TEXT_PREVIEW_CHARS, "... [truncated]"),
                );
            }
            Err(e) => {
                warn!(target: "pdf_check", "PDF text extraction failed: {:#}", e);
                report.warn("Text extraction", format!("{:#}", e));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::{inspect_pdf, PdfCheckOptions};
    use crate::checks::report::LineStatus;
    use crate::utils::binary_payload::encode_payload;

    const MINIMAL_PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<<\n/Type /Catalog\n/Pages 2 0 R\n>>\nendobj\nstartxref\n299\n%%EOF";

    #[test]
    fn reports_complete_pdf() {
        let report = inspect_pdf(&encode_payload(MINIMAL_PDF), &PdfCheckOptions::default());
        assert!(report.passed());
        assert_eq!(report.find("Header").map(|l| l.status), Some(LineStatus::Pass));
        assert_eq!(report.find("Trailer").map(|l| l.status), Some(LineStatus::Pass));
        assert_eq!(
            report.find("Version").map(|l| l.detail.as_str()),
            Some("%PDF-1.4")
        );
        assert_eq!(report.find("After %%EOF").map(|l| l.detail.as_str()), Some("\"\""));
    }

    #[test]
    fn warns_on_truncated_pdf() {
        let cut = &MINIMAL_PDF[..MINIMAL_PDF.len() - 10];
        let report = inspect_pdf(&encode_payload(cut), &PdfCheckOptions::default());
        assert!(report.passed());
        assert_eq!(report.find("Trailer").map(|l| l.status), Some(LineStatus::Warn));
        assert_eq!(
            report.find("%%EOF position").map(|l| l.detail.as_str()),
            Some("not found")
        );
    }

    #[test]
    fn fails_on_malformed_base64() {
        let report = inspect_pdf("JVBERi0xLjc", &PdfCheckOptions::default());
        assert!(!report.passed());
        assert_eq!(report.find("Decode").map(|l| l.status), Some(LineStatus::Fail));
    }

    #[test]
    fn non_pdf_bytes_warn_on_header() {
        let report = inspect_pdf(&encode_payload(b"GIF89a...."), &PdfCheckOptions::default());
        assert_eq!(report.find("Header").map(|l| l.status), Some(LineStatus::Warn));
        assert!(report.find("Version").is_none());
    }

    #[test]
    fn failed_text_extraction_only_warns() {
        let options = PdfCheckOptions {
            extract_text: true,
            ..Default::default()
        };
        let report = inspect_pdf(&encode_payload(b"GIF89a...."), &options);
        assert!(report.passed(), "{}", report);
        assert_eq!(
            report.find("Text extraction").map(|l| l.status),
            Some(LineStatus::Warn)
        );
    }
}
