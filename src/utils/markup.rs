use scraper::{Html, Node};
use tracing::{debug, warn};

/// Elements whose text children are not readable content
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Outcome of reducing a text payload to plain text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupReduction {
    /// No `<html>`/`<body>` markers; the payload is already plain text
    Unchanged(String),
    /// Text nodes flattened in document order
    Extracted { text: String, parse_errors: usize },
    /// Nothing could be recovered from the markup; the original is returned as-is
    Fallback { original: String, note: String },
}

impl MarkupReduction {
    /// The text to hand downstream, whichever branch was taken.
    pub fn text(&self) -> &str {
        match self {
            MarkupReduction::Unchanged(text) => text,
            MarkupReduction::Extracted { text, .. } => text,
            MarkupReduction::Fallback { original, .. } => original,
        }
    }
}

/// Returns true when the payload carries `<html>` or `<body>` (ASCII case-insensitive).
pub fn has_markup_markers(input: &str) -> bool {
    let lowered = input.to_ascii_lowercase();
    lowered.contains("<html>") || lowered.contains("<body>")
}

/// Flattens an HTML payload into its text nodes joined by single spaces.
///
/// Payloads without markup markers are returned unchanged. The html5ever parser
/// recovers from any input; when it reports errors and yields no text at all the
/// original payload is returned inside [`MarkupReduction::Fallback`].
pub fn reduce_markup(input: &str) -> MarkupReduction {
    if !has_markup_markers(input) {
        return MarkupReduction::Unchanged(input.to_string());
    }

    let document = Html::parse_document(input);
    let parse_errors = document.errors.len();
    let text = collect_text(&document);
    debug!(target: "markup", input_len = input.len(), text_len = text.len(), parse_errors, "Markup reduced");

    if text.is_empty() && parse_errors > 0 {
        let note = format!(
            "markup parsing recovered no text ({} parse error(s), first: {})",
            parse_errors,
            document.errors[0]
        );
        warn!(target: "markup", parse_errors, "Markup reduction failed; keeping original payload");
        return MarkupReduction::Fallback {
            original: input.to_string(),
            note,
        };
    }

    MarkupReduction::Extracted { text, parse_errors }
}

fn collect_text(document: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let skipped = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|el| el.name()))
            .map(|name| SKIPPED_ELEMENTS.contains(&name))
            .unwrap_or(false);
        if skipped {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ")
}
