use once_cell::sync::Lazy;
use regex::Regex;

/// Payloads at or below this length are never treated as encoded attachments.
pub const MIN_ENCODED_LEN: usize = 100;

static BASE64_ALPHABET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/=]+$").expect("valid base64 alphabet regex"));

/// How a raw payload from a workflow message should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Literal text or markup; reduce to plain text
    PlainOrMarkupText,
    /// Base64-encoded binary attachment; decode and validate
    EncodedBinary,
}

impl ContentKind {
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::PlainOrMarkupText => "plain/markup text",
            ContentKind::EncodedBinary => "base64-encoded binary",
        }
    }
}

/// Classifies a payload by length and character composition only.
///
/// A payload is `EncodedBinary` when it is longer than [`MIN_ENCODED_LEN`],
/// consists entirely of base64 alphabet characters and carries no `<`.
/// Everything else, the empty string included, is `PlainOrMarkupText`.
pub fn classify(payload: &str) -> ContentKind {
    if payload.len() > MIN_ENCODED_LEN
        && BASE64_ALPHABET_REGEX.is_match(payload)
        && !payload.contains('<')
    {
        ContentKind::EncodedBinary
    } else {
        ContentKind::PlainOrMarkupText
    }
}
