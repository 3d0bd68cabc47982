use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Decodes a base64 payload with the standard alphabet and padding rules.
///
/// Surrounding ASCII whitespace is ignored and an empty payload decodes to no
/// bytes. Anything else the engine rejects (bad padding, length not a multiple
/// of four, stray characters) is returned as [`DecodeError`].
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, DecodeError> {
    let trimmed = payload.trim_matches(|c: char| c.is_ascii_whitespace());
    let bytes = STANDARD.decode(trimmed)?;
    debug!(target: "binary_payload", encoded_len = trimmed.len(), decoded_len = bytes.len(), "Base64 payload decoded");
    Ok(bytes)
}

#[cfg(test)]
pub fn encode_payload(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode bytes into a UTF-8 String using BOM sniffing, a declared charset or chardetng.
/// Returns error if decoding performed replacements.
pub fn decode_to_utf8(bytes: &[u8], charset: Option<&str>) -> Result<String> {
    if let Some((enc, offset)) = encoding_rs::Encoding::for_bom(bytes) {
        let (cow, _used, had_errors) = enc.decode(&bytes[offset..]);
        if had_errors {
            anyhow::bail!("decoding had errors after BOM sniff");
        }
        return Ok(cow.into_owned());
    }

    if let Some(label) = charset.map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(enc) = encoding_rs::Encoding::for_label_no_replacement(label.as_bytes()) {
            let (cow, _used, had_errors) = enc.decode(bytes);
            if !had_errors {
                return Ok(cow.into_owned());
            }
            anyhow::bail!(format!(
                "decoding with declared charset '{}' produced errors",
                label
            ));
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    let (cow, _used, had_errors) = enc.decode(bytes);
    if had_errors {
        anyhow::bail!(format!(
            "decoding with detected charset '{}' produced errors",
            enc.name()
        ));
    }
    Ok(cow.into_owned())
}

#[cfg(test)]
mod tests {
    use super::{decode_payload, decode_to_utf8, encode_payload, DecodeError};

    #[test]
    fn decodes_what_was_encoded() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let encoded = encode_payload(&bytes);
        assert_eq!(decode_payload(&encoded).unwrap(), bytes);
        assert_eq!(decode_payload(&encode_payload(&[])).unwrap(), Vec::<u8>::new());
        assert_eq!(decode_payload(" \n").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn ignores_surrounding_whitespace() {
        assert_eq!(decode_payload("  JVBERi0=\r\n").unwrap(), b"%PDF-");
    }

    #[test]
    fn rejects_length_not_multiple_of_four() {
        let err = decode_payload("QUJDRA").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn rejects_misplaced_padding() {
        let err = decode_payload("QU=JDRA=").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn decodes_utf8_bodies() {
        let body = "<html><body>Société Générale</body></html>";
        assert_eq!(decode_to_utf8(body.as_bytes(), None).unwrap(), body);
    }

    #[test]
    fn honours_declared_charset() {
        let latin1 = [0x43, 0x61, 0x66, 0xE9];
        assert_eq!(decode_to_utf8(&latin1, Some("iso-8859-1")).unwrap(), "Café");
    }
}
