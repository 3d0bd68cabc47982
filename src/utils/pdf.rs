// PDF helpers for attachment inspection.
// Structural checks are advisory; only text extraction can fail.

use anyhow::Context;

use crate::utils::format_signature::{self, HeaderCheck, TrailerCheck, PDF};

const HEAD_PREVIEW_BYTES: usize = 8;
const TAIL_PREVIEW_BYTES: usize = 20;
const LAST_LINES: usize = 5;

/// Extracts text from a PDF stored fully in memory.
/// This is a thin wrapper over the `pdf-extract` crate API.
pub fn extract_text_from_pdf_mem(bytes: &[u8]) -> anyhow::Result<String> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .context("failed to extract text from PDF bytes using pdf-extract")?;
    Ok(text)
}

/// Structural facts about a decoded PDF payload
#[derive(Debug, Clone)]
pub struct PdfStructure {
    pub size: usize,
    pub head_preview: String,
    pub tail_preview: String,
    pub header: HeaderCheck,
    /// First line, e.g. `%PDF-1.7`, when the header is valid
    pub version_line: Option<String>,
    pub trailer: TrailerCheck,
    pub eof_offset: Option<usize>,
    pub after_eof: Option<String>,
    pub line_count: usize,
    pub first_line: String,
    /// Trailing lines with their zero-based line numbers
    pub last_lines: Vec<(usize, String)>,
}

impl PdfStructure {
    pub fn analyze(bytes: &[u8]) -> Self {
        // Latin-1 keeps a one-to-one byte/char mapping, so offsets stay valid.
        let content: String = bytes.iter().map(|&b| b as char).collect();
        let lines: Vec<&str> = content.split('\n').collect();

        let header = PDF.check_header(bytes);
        let version_line = match header {
            HeaderCheck::Valid => lines.first().map(|l| l.trim_end_matches('\r').to_string()),
            HeaderCheck::Invalid => None,
        };

        let marker = PDF.trailer.unwrap_or(b"%%EOF");
        let eof_offset = format_signature::rfind(bytes, marker);
        let after_eof = eof_offset.map(|offset| {
            bytes[offset + marker.len()..]
                .iter()
                .map(|&b| b as char)
                .collect::<String>()
        });

        let start = lines.len().saturating_sub(LAST_LINES);
        let last_lines = lines[start..]
            .iter()
            .enumerate()
            .map(|(i, line)| (start + i, line.to_string()))
            .collect();

        Self {
            size: bytes.len(),
            head_preview: preview(&bytes[..bytes.len().min(HEAD_PREVIEW_BYTES)]),
            tail_preview: preview(&bytes[bytes.len().saturating_sub(TAIL_PREVIEW_BYTES)..]),
            header,
            version_line,
            trailer: PDF.check_trailer(bytes),
            eof_offset,
            after_eof,
            line_count: lines.len(),
            first_line: lines.first().map(|l| l.to_string()).unwrap_or_default(),
            last_lines,
        }
    }
}

/// Printable rendering of raw bytes (`\n`, `\xb5`, ...).
pub fn preview(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}

#[cfg(test)]
mod tests {
    use super::{preview, PdfStructure};
    use crate::utils::format_signature::{HeaderCheck, TrailerCheck, TruncationReason};

    const MINIMAL_PDF: &str = "%PDF-1.4\n1 0 obj\n<<\n/Type /Catalog\n/Pages 2 0 R\n>>\nendobj\ntrailer\n<<\n/Size 5\n/Root 1 0 R\n>>\nstartxref\n299\n%%EOF";

    #[test]
    fn analyzes_complete_pdf() {
        let report = PdfStructure::analyze(MINIMAL_PDF.as_bytes());
        assert_eq!(report.size, MINIMAL_PDF.len());
        assert_eq!(report.header, HeaderCheck::Valid);
        assert_eq!(report.version_line.as_deref(), Some("%PDF-1.4"));
        assert!(report.trailer.is_complete());
        assert_eq!(report.eof_offset, Some(MINIMAL_PDF.len() - 5));
        assert_eq!(report.after_eof.as_deref(), Some(""));
        assert_eq!(report.line_count, 15);
        assert_eq!(report.first_line, "%PDF-1.4");
        assert_eq!(report.last_lines.len(), 5);
        assert_eq!(report.last_lines[4], (14, "%%EOF".to_string()));
        assert_eq!(report.head_preview, "%PDF-1.4");
    }

    #[test]
    fn reports_truncated_pdf() {
        let cut = &MINIMAL_PDF.as_bytes()[..40];
        let report = PdfStructure::analyze(cut);
        assert_eq!(report.header, HeaderCheck::Valid);
        assert_eq!(
            report.trailer,
            TrailerCheck::PossiblyTruncated(TruncationReason::MarkerMissing)
        );
        assert!(report.eof_offset.is_none());
        assert!(report.after_eof.is_none());
    }

    #[test]
    fn rejects_non_pdf_header() {
        let report = PdfStructure::analyze(b"<html>not a pdf</html>");
        assert_eq!(report.header, HeaderCheck::Invalid);
        assert!(report.version_line.is_none());
    }

    #[test]
    fn previews_escape_binary_bytes() {
        assert_eq!(preview(b"%PDF-1.7\r\n%\xb5"), "%PDF-1.7\\r\\n%\\xb5");
    }
}
