use serde::Deserialize;
use tracing::info;

use crate::checks::payload_check::payload_report;
use crate::checks::report::CheckReport;
use crate::utils::format_signature::SignatureRegistry;

/// Email/form payload forwarded by the workflow-automation tool
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkflowMessage {
    pub subject: Option<String>,
    #[serde(alias = "from_email")]
    pub from: Option<String>,
    pub body: Option<String>,
    pub attachments: Vec<WorkflowAttachment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkflowAttachment {
    pub name: Option<String>,
    #[serde(alias = "fileName")]
    pub filename: Option<String>,
    #[serde(rename = "contentBase64", alias = "contentBytes")]
    pub content_base64: Option<String>,
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
}

impl WorkflowAttachment {
    pub fn display_name(&self) -> &str {
        self.filename
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("unnamed attachment")
    }

    /// `charset` parameter of the declared content type, e.g. `text/html; charset=iso-8859-1`.
    fn charset(&self) -> Option<&str> {
        self.content_type
            .as_deref()?
            .split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"'))
    }

    /// File extension, lowercased, used to pin the expected format.
    fn extension(&self) -> Option<String> {
        let name = self.display_name();
        let (_, ext) = name.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }
}

/// Runs the payload check over the message body and every attachment.
pub fn inspect_message(message: &WorkflowMessage, registry: &SignatureRegistry) -> CheckReport {
    let mut report = CheckReport::new(format!(
        "Workflow message: {}",
        message.subject.as_deref().unwrap_or("(no subject)")
    ));
    if let Some(from) = &message.from {
        report.info("From", from.as_str());
    }
    info!(target: "message_check", attachments = message.attachments.len(), has_body = message.body.is_some(), "Inspecting workflow message");

    match message.body.as_deref() {
        Some(body) => {
            let body_report = payload_report("body", body, registry, None, None, None);
            report.absorb("[body]", body_report);
        }
        None => report.warn("[body]", "message has no body"),
    }

    for (index, attachment) in message.attachments.iter().enumerate() {
        let prefix = format!("[{}:{}]", index, attachment.display_name());
        let Some(content) = attachment.content_base64.as_deref().filter(|c| !c.is_empty()) else {
            report.warn(prefix, "attachment has no content, skipped");
            continue;
        };

        let expected = attachment
            .extension()
            .and_then(|ext| registry.get(&ext));
        if let Some(content_type) = &attachment.content_type {
            report.info(format!("{} Content type", prefix), content_type.as_str());
        }
        let attachment_report = payload_report(
            attachment.display_name(),
            content,
            registry,
            expected,
            attachment.charset(),
            None,
        );
        report.absorb(&prefix, attachment_report);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::{inspect_message, WorkflowAttachment, WorkflowMessage};
    use crate::checks::report::LineStatus;
    use crate::utils::binary_payload::encode_payload;
    use crate::utils::format_signature::SignatureRegistry;

    #[test]
    fn inspects_body_and_attachments() {
        let pdf = encode_payload(
            b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\nstartxref\n299\n%%EOF\n",
        );
        let truncated = encode_payload(
            b"%PDF-1.7\r\n1 0 obj\r\n<</Type/Catalog/Pages 2 0 R/Lang(en) /StructTreeRoot 32 0 R>>\r\nendobj",
        );
        let raw = serde_json::json!({
            "subject": "Cyber Insurance Quote Request",
            "from": "john@techcorp.com",
            "body": "<html><body><div>New Submission</div><div><br></div></body></html>",
            "attachments": [
                { "filename": "Application.pdf", "contentBase64": pdf },
                { "name": "Loss-Runs.PDF", "contentBase64": truncated },
                { "filename": "empty.txt" }
            ]
        });
        let message: WorkflowMessage = serde_json::from_value(raw).unwrap();
        let report = inspect_message(&message, SignatureRegistry::builtin());

        assert!(report.passed());
        assert_eq!(
            report.find("[body] Text").map(|l| l.detail.as_str()),
            Some("New Submission")
        );
        assert_eq!(
            report.find("[0:Application.pdf] Trailer").map(|l| l.status),
            Some(LineStatus::Pass)
        );
        assert_eq!(
            report.find("[1:Loss-Runs.PDF] Trailer").map(|l| l.status),
            Some(LineStatus::Warn)
        );
        assert_eq!(
            report.find("[2:empty.txt]").map(|l| l.status),
            Some(LineStatus::Warn)
        );
    }

    #[test]
    fn decodes_attachment_with_declared_charset() {
        let mut html = b"<html><body><p>R\xE9sum\xE9 ".to_vec();
        html.extend_from_slice("attached for review ".repeat(6).as_bytes());
        html.extend_from_slice(b"</p></body></html>");
        let raw = serde_json::json!({
            "from_email": "john@techcorp.com",
            "body": "Please see attached.",
            "attachments": [{
                "fileName": "resume.html",
                "contentBytes": encode_payload(&html),
                "contentType": "text/html; charset=\"ISO-8859-1\""
            }]
        });
        let message: WorkflowMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(message.attachments[0].charset(), Some("ISO-8859-1"));

        let report = inspect_message(&message, SignatureRegistry::builtin());
        assert_eq!(
            report.find("From").map(|l| l.detail.as_str()),
            Some("john@techcorp.com")
        );
        assert!(report
            .find("[0:resume.html] Text")
            .map(|l| l.detail.starts_with("R\u{e9}sum\u{e9} attached for review"))
            .unwrap_or(false));
    }

    #[test]
    fn charset_is_optional() {
        let attachment = WorkflowAttachment {
            content_type: Some("application/pdf".to_string()),
            ..Default::default()
        };
        assert_eq!(attachment.charset(), None);
    }

    #[test]
    fn tolerates_missing_fields() {
        let message: WorkflowMessage = serde_json::from_str("{}").unwrap();
        let report = inspect_message(&message, SignatureRegistry::builtin());
        assert!(report.title.ends_with("(no subject)"));
        assert_eq!(report.find("[body]").map(|l| l.status), Some(LineStatus::Warn));
    }
}
