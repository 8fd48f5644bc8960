use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::composer::ComposedRequest;
use crate::error::RelayError;
use crate::truncate_text;

/// A model backend the relay can send composed requests to.
///
/// Implementations return the provider's raw JSON reply; extraction is the
/// relay's job.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, request: &ComposedRequest) -> Result<Value, RelayError>;
}

pub struct GeminiProvider {
    api_base: String,
    api_key: String,
    model: String,
    http: Client,
}

impl GeminiProvider {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into().trim().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            http: Client::new(),
        }
    }

    pub fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    /// Names of upstream models that support `generateContent`.
    pub async fn list_models(&self) -> Result<Vec<String>, RelayError> {
        let endpoint = format!("{}/models", self.api_base);
        let response = self
            .http
            .get(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(transport_error)?;
        let payload = response_json_or_error(response).await?;
        let models = payload
            .get("models")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(models
            .iter()
            .filter(|model| {
                model
                    .get("supportedGenerationMethods")
                    .and_then(Value::as_array)
                    .map(|methods| {
                        methods
                            .iter()
                            .any(|method| method.as_str() == Some("generateContent"))
                    })
                    .unwrap_or(false)
            })
            .filter_map(|model| model.get("name").and_then(Value::as_str))
            .map(|name| name.strip_prefix("models/").unwrap_or(name).to_string())
            .collect())
    }
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &ComposedRequest) -> Result<Value, RelayError> {
        let endpoint = self.endpoint_for_model(&self.model);
        debug!(%endpoint, parts = request.parts.len(), "posting generateContent");
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request.to_gemini_payload())
            .send()
            .await
            .map_err(transport_error)?;
        response_json_or_error(response).await
    }
}

async fn response_json_or_error(response: Response) -> Result<Value, RelayError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    if !status.is_success() {
        return Err(classify_status(status, &body));
    }
    serde_json::from_str(&body).map_err(|err| RelayError::Upstream {
        status: status.as_u16(),
        message: format!("invalid JSON payload: {err}"),
    })
}

pub(crate) fn classify_status(status: StatusCode, body: &str) -> RelayError {
    let message = upstream_message(body);
    if status == StatusCode::TOO_MANY_REQUESTS
        || body.contains("RESOURCE_EXHAUSTED")
        || body.to_ascii_lowercase().contains("quota")
    {
        return RelayError::RateLimited(message);
    }
    match status.as_u16() {
        500 | 502 | 503 | 504 => RelayError::Transient(format!("{status}: {message}")),
        code => RelayError::Upstream {
            status: code,
            message,
        },
    }
}

/// Prefers Gemini's `error.message`, falling back to the raw body.
fn upstream_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|value| value.get("error"))
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .unwrap_or(body);
    truncate_text(message.trim(), 512)
}

pub(crate) fn transport_error(err: reqwest::Error) -> RelayError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        RelayError::Transient(err.to_string())
    } else {
        RelayError::Upstream {
            status: err.status().map(|status| status.as_u16()).unwrap_or(0),
            message: err.to_string(),
        }
    }
}
