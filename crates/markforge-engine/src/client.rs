use async_trait::async_trait;
use markforge_contracts::wire::{ErrorBody, GenerateLogoRequest, GenerateLogoResponse, GENERATE_LOGO_PATH};
use markforge_contracts::{DataUri, GenerationRequest};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::error::RelayError;
use crate::provider::transport_error;

/// Anything that can turn a generation request into an image: the in-process
/// [`crate::LogoRelay`] or a remote relay server.
#[async_trait]
pub trait Relay: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<DataUri, RelayError>;
}

/// Talks to a running `markforge serve` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRelayClient {
    base_url: String,
    http: Client,
}

impl HttpRelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, GENERATE_LOGO_PATH)
    }
}

#[async_trait]
impl Relay for HttpRelayClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<DataUri, RelayError> {
        let endpoint = self.endpoint();
        debug!(%endpoint, images = request.reference_images.len(), "posting to relay");
        let response = self
            .http
            .post(&endpoint)
            .json(&GenerateLogoRequest::from(request))
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        decode_reply(status, &body)
    }
}

fn decode_reply(status: StatusCode, body: &str) -> Result<DataUri, RelayError> {
    if status.is_success() {
        return serde_json::from_str::<GenerateLogoResponse>(body)
            .map(|reply| reply.image)
            .map_err(|err| RelayError::ExtractionFailed(format!("relay reply had no image: {err}")));
    }
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|error| error.message)
        .or_else(|_| {
            serde_json::from_str::<Value>(body).map(|value| {
                value
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            })
        })
        .unwrap_or_default();
    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => RelayError::RateLimited(message),
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            RelayError::Transient(message)
        }
        _ => RelayError::Server {
            status: status.as_u16(),
            message,
        },
    })
}
