use once_cell::sync::Lazy;

/// Magic bytes (and optional end-of-file sentinel) identifying a binary file format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSignature {
    pub name: &'static str,
    pub mime: &'static str,
    pub header: &'static [u8],
    pub trailer: Option<&'static [u8]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderCheck {
    Valid,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationReason {
    /// The end-of-file marker never appears
    MarkerMissing,
    /// Non-whitespace bytes follow the last end-of-file marker
    TrailingBytes { count: usize },
}

/// Advisory result of looking for the end-of-file marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailerCheck {
    Complete { marker_offset: usize },
    PossiblyTruncated(TruncationReason),
    /// The format has no trailer marker to look for
    NotApplicable,
}

impl TrailerCheck {
    pub fn is_complete(&self) -> bool {
        matches!(self, TrailerCheck::Complete { .. })
    }
}

pub const PDF: FormatSignature = FormatSignature {
    name: "PDF",
    mime: "application/pdf",
    header: b"%PDF-",
    trailer: Some(b"%%EOF"),
};

pub const PNG: FormatSignature = FormatSignature {
    name: "PNG",
    mime: "image/png",
    header: &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A],
    trailer: Some(&[b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82]),
};

pub const JPEG: FormatSignature = FormatSignature {
    name: "JPEG",
    mime: "image/jpeg",
    header: &[0xFF, 0xD8, 0xFF],
    trailer: Some(&[0xFF, 0xD9]),
};

pub const GIF: FormatSignature = FormatSignature {
    name: "GIF",
    mime: "image/gif",
    header: b"GIF8",
    trailer: None,
};

// ZIP archives may carry a comment after the central directory end record.
pub const ZIP: FormatSignature = FormatSignature {
    name: "ZIP",
    mime: "application/zip",
    header: &[0x50, 0x4B, 0x03, 0x04],
    trailer: None,
};

impl FormatSignature {
    pub fn check_header(&self, bytes: &[u8]) -> HeaderCheck {
        if bytes.starts_with(self.header) {
            HeaderCheck::Valid
        } else {
            HeaderCheck::Invalid
        }
    }

    /// Locates the last trailer marker and checks that only ASCII whitespace follows it.
    pub fn check_trailer(&self, bytes: &[u8]) -> TrailerCheck {
        let Some(marker) = self.trailer else {
            return TrailerCheck::NotApplicable;
        };

        match rfind(bytes, marker) {
            None => TrailerCheck::PossiblyTruncated(TruncationReason::MarkerMissing),
            Some(offset) => {
                let rest = &bytes[offset + marker.len()..];
                let count = rest.iter().filter(|b| !b.is_ascii_whitespace()).count();
                if count == 0 {
                    TrailerCheck::Complete {
                        marker_offset: offset,
                    }
                } else {
                    TrailerCheck::PossiblyTruncated(TruncationReason::TrailingBytes { count })
                }
            }
        }
    }
}

/// Last byte offset at which `needle` occurs in `haystack`.
pub fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Ordered set of known signatures; the first header match wins.
#[derive(Debug, Clone)]
pub struct SignatureRegistry {
    signatures: Vec<FormatSignature>,
}

static BUILTIN_REGISTRY: Lazy<SignatureRegistry> = Lazy::new(SignatureRegistry::default);

impl Default for SignatureRegistry {
    fn default() -> Self {
        Self {
            signatures: vec![PDF, PNG, JPEG, GIF, ZIP],
        }
    }
}

impl SignatureRegistry {
    #[cfg(test)]
    pub fn empty() -> Self {
        Self {
            signatures: Vec::new(),
        }
    }

    /// Shared registry with the built-in signatures.
    pub fn builtin() -> &'static SignatureRegistry {
        &BUILTIN_REGISTRY
    }

    /// Adds a signature; it replaces any existing entry with the same name.
    pub fn register(&mut self, signature: FormatSignature) {
        self.signatures.retain(|s| s.name != signature.name);
        self.signatures.push(signature);
    }

    pub fn identify(&self, bytes: &[u8]) -> Option<&FormatSignature> {
        self.signatures
            .iter()
            .find(|s| s.check_header(bytes) == HeaderCheck::Valid)
    }

    pub fn get(&self, name: &str) -> Option<&FormatSignature> {
        self.signatures
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.signatures.iter().map(|s| s.name).collect()
    }
}
