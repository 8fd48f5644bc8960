use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use markforge_contracts::models::{ModelSelector, ModelSpec};
use markforge_contracts::{DataUri, GenerationRequest};
use tracing::{error, info, warn};

use crate::client::Relay;
use crate::composer::compose;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::extractor::extract_image;
use crate::provider::{GeminiProvider, ImageProvider};
use crate::truncate_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first, for transient failures only.
    pub max_retries: usize,
    pub backoff: Duration,
    /// Upper bound for a single attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_millis(750),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: config.retry_backoff,
            timeout: config.request_timeout,
        }
    }
}

/// Validates, composes and forwards generation requests to a model provider.
///
/// Holds only immutable state, so one relay can serve concurrent requests.
#[derive(Clone)]
pub struct LogoRelay {
    provider: Arc<dyn ImageProvider>,
    model: ModelSpec,
    policy: RetryPolicy,
}

impl LogoRelay {
    pub fn new(provider: Arc<dyn ImageProvider>, model: ModelSpec, policy: RetryPolicy) -> Self {
        Self {
            provider,
            model,
            policy,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        let selection = ModelSelector::default().select_or_adopt(&config.model);
        if let Some(reason) = selection.fallback_reason.as_deref() {
            warn!("{reason}");
        }
        let provider = GeminiProvider::new(
            config.api_base.clone(),
            config.api_key.clone(),
            selection.model.name.clone(),
        );
        Self::new(
            Arc::new(provider),
            selection.model,
            RetryPolicy::from_config(config),
        )
    }

    pub fn model(&self) -> &ModelSpec {
        &self.model
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<DataUri, RelayError> {
        request.validate()?;
        info!(
            mode = request.mode.as_str(),
            model = %self.model.name,
            images = request.reference_images.len(),
            prompt = %truncate_text(request.prompt.trim(), 30),
            "generating logo"
        );

        let composed = compose(request, self.model.output);
        let max_attempts = self.policy.max_retries + 1;
        let mut attempt = 0;
        let response = loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(
                self.policy.timeout,
                self.provider.generate(&composed),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(RelayError::Transient(format!(
                    "no reply within {}s",
                    self.policy.timeout.as_secs_f64()
                ))),
            };
            match outcome {
                Ok(response) => break response,
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    warn!(
                        attempt,
                        max_attempts,
                        provider = self.provider.name(),
                        "retrying after transient failure: {err}"
                    );
                    if !self.policy.backoff.is_zero() {
                        tokio::time::sleep(self.policy.backoff).await;
                    }
                }
                Err(err) => {
                    error!(attempt, kind = err.kind(), "logo generation failed: {err}");
                    return Err(err);
                }
            }
        };

        extract_image(&response).inspect_err(|err| {
            error!(kind = err.kind(), "logo generation failed: {err}");
        })
    }
}

#[async_trait]
impl Relay for LogoRelay {
    async fn generate(&self, request: &GenerationRequest) -> Result<DataUri, RelayError> {
        LogoRelay::generate(self, request).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use markforge_contracts::models::{ModelSpec, OutputKind};
    use markforge_contracts::{DataUri, GenerationRequest, Mode, ValidationError};
    use serde_json::{json, Value};

    use super::{LogoRelay, RetryPolicy};
    use crate::composer::ComposedRequest;
    use crate::error::RelayError;
    use crate::provider::ImageProvider;

    /// Replays canned provider outcomes in order and counts calls.
    pub(crate) struct ScriptedProvider {
        script: Mutex<VecDeque<Result<Value, RelayError>>>,
        delay: Duration,
        pub(crate) calls: AtomicUsize,
    }

    impl ScriptedProvider {
        pub(crate) fn new(script: Vec<Result<Value, RelayError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::new(Vec::new())
            }
        }
    }

    #[async_trait]
    impl ImageProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _request: &ComposedRequest) -> Result<Value, RelayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RelayError::Transient("script exhausted".into())))
        }
    }

    pub(crate) fn image_reply(data: &str) -> Value {
        json!({
            "candidates": [{
                "content": { "parts": [{ "inlineData": { "mimeType": "image/png", "data": data } }] }
            }]
        })
    }

    fn relay_with(provider: Arc<ScriptedProvider>, timeout: Duration) -> LogoRelay {
        LogoRelay::new(
            provider,
            ModelSpec {
                name: "scripted-image".into(),
                provider: "scripted".into(),
                output: OutputKind::Raster,
            },
            RetryPolicy {
                max_retries: 1,
                backoff: Duration::ZERO,
                timeout,
            },
        )
    }

    fn create_request() -> GenerationRequest {
        GenerationRequest::new(Mode::Create, "A fox made of triangles", Vec::new())
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(RelayError::Transient("connection reset".into())),
            Ok(image_reply("Zm94")),
        ]));
        let relay = relay_with(provider.clone(), Duration::from_secs(5));
        let image = relay.generate(&create_request()).await.unwrap();
        assert_eq!(image, DataUri::new("image/png", "Zm94"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn two_transient_failures_stop_after_two_attempts() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(RelayError::Transient("reset".into())),
            Err(RelayError::Transient("reset again".into())),
            Ok(image_reply("bmV2ZXI=")),
        ]));
        let relay = relay_with(provider.clone(), Duration::from_secs(5));
        let err = relay.generate(&create_request()).await.unwrap_err();
        assert_eq!(err, RelayError::Transient("reset again".into()));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rate_limit_is_attempted_once() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(RelayError::RateLimited("quota".into())),
            Ok(image_reply("bmV2ZXI=")),
        ]));
        let relay = relay_with(provider.clone(), Duration::from_secs(5));
        let err = relay.generate(&create_request()).await.unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_requests_never_reach_the_provider() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(image_reply("eA=="))]));
        let relay = relay_with(provider.clone(), Duration::from_secs(5));
        let err = relay
            .generate(&GenerationRequest::new(Mode::Modernize, "", Vec::new()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RelayError::Validation(ValidationError::MissingReferenceImage)
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slow_attempts_time_out_as_transient() {
        let provider = Arc::new(ScriptedProvider::slow(Duration::from_millis(200)));
        let relay = relay_with(provider.clone(), Duration::from_millis(10));
        let err = relay.generate(&create_request()).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn prose_reply_is_not_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Imagine a fox." }] } }]
        }))]));
        let relay = relay_with(provider.clone(), Duration::from_secs(5));
        let err = relay.generate(&create_request()).await.unwrap_err();
        assert!(matches!(err, RelayError::ExtractionFailed(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
