use std::time::Instant;
use tracing::{error, info};

use crate::checks::report::CheckReport;
use crate::utils::llm_client::{ExtractionRequest, LlmClientError, LlmServiceClient};

/// Sample submission used when no text is supplied on the command line.
pub fn sample_extraction_request() -> ExtractionRequest {
    ExtractionRequest {
        text: "We are a small tech company looking for cyber insurance. We have 50 employees and use cloud services extensively.".to_string(),
        email_subject: Some("Cyber Insurance Quote Request".to_string()),
        sender_email: Some("john@techcorp.com".to_string()),
        attachment_info: None,
    }
}

fn describe_error(err: &LlmClientError) -> String {
    match err {
        LlmClientError::Status { status, body } => format!("HTTP {}: {}", status, body),
        LlmClientError::Connect(_) => format!("service unreachable ({})", err),
        LlmClientError::Timeout(limit) => format!("no response within {:?}", limit),
        other => other.to_string(),
    }
}

/// Exercises health, models and (when healthy) extraction endpoints.
pub async fn run_llm_check(client: &LlmServiceClient, request: &ExtractionRequest) -> CheckReport {
    let mut report = CheckReport::new(format!("LLM microservice check: {}", client.base_url()));

    let health_ok = match client.health().await {
        Ok(health) => {
            let status = health.status.clone().unwrap_or_else(|| "unknown".to_string());
            info!(target: "llm_check", status = %status, "Health endpoint responded");
            if let Some(service) = &health.service {
                report.info("Service", service.as_str());
            }
            if let Some(timestamp) = &health.timestamp {
                report.info("Timestamp", timestamp.as_str());
            }
            if let Some(model) = &health.model {
                report.info("Model", model.as_str());
            }
            if let Some(err) = &health.error {
                report.info("Service error", err.as_str());
            }
            if health.is_healthy() {
                report.pass("Health", status);
            } else {
                report.warn("Health", format!("service reports '{}'", status));
            }
            true
        }
        Err(e) => {
            error!(target: "llm_check", "Health check failed: {}", e);
            report.fail("Health", describe_error(&e));
            false
        }
    };

    match client.models().await {
        Ok(catalog) => {
            let mut models = catalog.models.clone();
            if let Some(current) = &catalog.current_model {
                if !models.contains(current) {
                    models.insert(0, current.clone());
                }
            }
            if models.is_empty() {
                report.warn("Models", "no model identifiers reported");
            } else {
                report.pass("Models", models.join(", "));
            }
            if !catalog.capabilities.is_empty() {
                report.info("Capabilities", catalog.capabilities.join(", "));
            }
            if !catalog.supported_formats.is_empty() {
                report.info("Supported formats", catalog.supported_formats.join(", "));
            }
        }
        Err(e) => {
            error!(target: "llm_check", "Models request failed: {}", e);
            report.fail("Models", describe_error(&e));
        }
    }

    if !health_ok {
        report.fail("Extraction", "skipped: service is not running or not responding");
        return report;
    }

    let started = Instant::now();
    match client.extract(request).await {
        Ok(response) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            info!(target: "llm_check", elapsed_ms, "Extraction endpoint responded");
            match &response.extracted_fields {
                Some(fields) => {
                    let pretty = serde_json::to_string_pretty(fields)
                        .unwrap_or_else(|_| format!("{:?}", fields));
                    report.pass("Extraction", format!("{} fields", fields.len()));
                    report.info("Extracted fields", pretty);
                }
                None => report.warn("Extraction", "response carried no extracted_fields"),
            }
            match response.processing_time_ms {
                Some(ms) => report.info("Processing time", format!("{}ms", ms)),
                None => report.info(
                    "Processing time",
                    format!("not reported ({}ms round trip)", elapsed_ms),
                ),
            }
            if let Some(summary) = &response.summary {
                report.info("Summary", summary.to_string());
            }
            if let Some(model) = &response.model_used {
                report.info("Model used", model.as_str());
            }
        }
        Err(e) => {
            error!(target: "llm_check", "Extraction failed: {}", e);
            report.fail("Extraction", describe_error(&e));
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::{run_llm_check, sample_extraction_request};
    use crate::checks::report::LineStatus;
    use crate::utils::llm_client::test_server::serve;
    use crate::utils::llm_client::{LlmServiceClient, DEFAULT_TIMEOUT};

    #[tokio::test]
    async fn healthy_service_passes() {
        let (base, server) = serve(vec![
            (200, r#"{"status":"healthy","model":"gemini-1.5-flash"}"#),
            (200, r#"{"current_model":"gemini-1.5-flash","supported_formats":["email_text"]}"#),
            (200, r#"{"extracted_fields":{"company_size":"small","employees":50},"processing_time_ms":812.5}"#),
        ])
        .await;

        let client = LlmServiceClient::new(&base, DEFAULT_TIMEOUT).unwrap();
        let report = run_llm_check(&client, &sample_extraction_request()).await;

        assert!(report.passed(), "{}", report);
        assert_eq!(
            report.find("Models").map(|l| l.detail.as_str()),
            Some("gemini-1.5-flash")
        );
        assert_eq!(
            report.find("Processing time").map(|l| l.detail.as_str()),
            Some("812.5ms")
        );
        let requests = server.await.unwrap();
        assert!(requests[2].contains("cyber insurance"));
    }

    #[tokio::test]
    async fn unreachable_service_skips_extraction() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = LlmServiceClient::new(&format!("http://{}", addr), DEFAULT_TIMEOUT).unwrap();
        let report = run_llm_check(&client, &sample_extraction_request()).await;

        assert!(!report.passed());
        let health = report.find("Health").unwrap();
        assert_eq!(health.status, LineStatus::Fail);
        assert!(health.detail.starts_with("service unreachable"));
        assert!(report
            .find("Extraction")
            .map(|l| l.detail.starts_with("skipped"))
            .unwrap_or(false));
    }

    #[tokio::test]
    async fn extraction_error_reports_status_and_body() {
        let (base, _server) = serve(vec![
            (200, r#"{"status":"degraded","error":"quota exceeded"}"#),
            (200, r#"[]"#),
            (500, r#"{"detail":"Extraction failed: quota exceeded"}"#),
        ])
        .await;

        let client = LlmServiceClient::new(&base, DEFAULT_TIMEOUT).unwrap();
        let report = run_llm_check(&client, &sample_extraction_request()).await;

        assert_eq!(report.find("Health").map(|l| l.status), Some(LineStatus::Warn));
        assert_eq!(report.find("Models").map(|l| l.status), Some(LineStatus::Warn));
        let extraction = report.find("Extraction").unwrap();
        assert_eq!(extraction.status, LineStatus::Fail);
        assert!(extraction.detail.starts_with("HTTP 500"));
        assert!(extraction.detail.contains("quota exceeded"));
    }
}
