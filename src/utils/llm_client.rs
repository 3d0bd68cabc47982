use reqwest::{header, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum LlmClientError {
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("connection failed: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid service URL: {0}")]
    Url(#[from] url::ParseError),
}

/// `GET /api/health` body; every field is optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct HealthStatus {
    pub status: Option<String>,
    pub service: Option<String>,
    pub timestamp: Option<String>,
    pub model: Option<String>,
    pub llm_service_available: Option<bool>,
    pub error: Option<String>,
    #[allow(dead_code)]
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("healthy"))
            .unwrap_or(false)
    }
}

/// `GET /api/models` body, normalised from either an object or a bare list.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelCatalog {
    pub current_model: Option<String>,
    pub models: Vec<String>,
    pub capabilities: Vec<String>,
    pub supported_formats: Vec<String>,
    #[allow(dead_code)]
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModelsPayload {
    List(Vec<Value>),
    Catalog(ModelCatalog),
}

impl From<ModelsPayload> for ModelCatalog {
    fn from(payload: ModelsPayload) -> Self {
        match payload {
            ModelsPayload::Catalog(catalog) => catalog,
            ModelsPayload::List(items) => ModelCatalog {
                models: items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_info: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionResponse {
    pub extracted_fields: Option<Map<String, Value>>,
    pub summary: Option<Value>,
    pub processing_time_ms: Option<f64>,
    pub model_used: Option<String>,
}

/// Client for the LLM extraction microservice
pub struct LlmServiceClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl LlmServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LlmClientError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, LlmClientError> {
        Ok(self.base_url.join(path)?)
    }

    pub async fn health(&self) -> Result<HealthStatus, LlmClientError> {
        let url = self.endpoint("api/health")?;
        self.send(self.client.get(url)).await
    }

    pub async fn models(&self) -> Result<ModelCatalog, LlmClientError> {
        let url = self.endpoint("api/models")?;
        let payload: ModelsPayload = self.send(self.client.get(url)).await?;
        Ok(payload.into())
    }

    pub async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionResponse, LlmClientError> {
        let url = self.endpoint("api/extract")?;
        debug!(target: "llm_client", text_len = request.text.len(), "Sending extraction request");
        self.send(self.client.post(url).json(request)).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, LlmClientError> {
        let response = request
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        debug!(target: "llm_client", status = status.as_u16(), len = body.len(), "Received response");

        if !status.is_success() {
            warn!(target: "llm_client", status = status.as_u16(), "Non-success status from LLM service");
            return Err(LlmClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str::<T>(&body)?)
    }

    fn transport_error(&self, err: reqwest::Error) -> LlmClientError {
        if err.is_timeout() {
            LlmClientError::Timeout(self.timeout)
        } else if err.is_connect() {
            LlmClientError::Connect(err)
        } else {
            LlmClientError::Request(err)
        }
    }
}
