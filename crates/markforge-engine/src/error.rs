use markforge_contracts::ValidationError;

/// Failure of one generation attempt, as seen by the relay and its clients.
///
/// Every variant is terminal for the attempt. Only [`RelayError::Transient`]
/// is retried, and only by the relay itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("transient upstream failure: {0}")]
    Transient(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("blocked by safety filters: {0}")]
    Blocked(String),
    #[error("upstream request failed ({status}): {message}")]
    Upstream { status: u16, message: String },
    /// Non-2xx reply from a markforge relay; `message` is already user-facing.
    #[error("relay replied {status}: {message}")]
    Server { status: u16, message: String },
}

impl RelayError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RelayError::Transient(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RelayError::RateLimited(_))
    }

    /// Short machine label, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Validation(_) => "validation",
            RelayError::Transient(_) => "transient",
            RelayError::RateLimited(_) => "rate_limited",
            RelayError::ExtractionFailed(_) => "extraction_failed",
            RelayError::Blocked(_) => "blocked",
            RelayError::Upstream { .. } => "upstream",
            RelayError::Server { .. } => "server",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            RelayError::Validation(err) => err.to_string(),
            RelayError::Transient(_) => {
                "The creative engine is unreachable right now. Please try again.".to_string()
            }
            RelayError::RateLimited(_) => {
                "Traffic limit reached. Please wait 60 seconds and try again.".to_string()
            }
            RelayError::ExtractionFailed(_) => {
                "The model answered without a usable logo. Please refine your request."
                    .to_string()
            }
            RelayError::Blocked(_) => "The request was blocked by AI safety filters.".to_string(),
            RelayError::Upstream { .. } => "Error generating logo.".to_string(),
            RelayError::Server { status, message } => {
                if message.trim().is_empty() {
                    format!("Server error: {status}")
                } else {
                    message.clone()
                }
            }
        }
    }

    /// HTTP status the relay server answers with.
    pub fn http_status(&self) -> u16 {
        match self {
            RelayError::Validation(_) => 400,
            RelayError::RateLimited(_) => 429,
            RelayError::ExtractionFailed(_) | RelayError::Blocked(_) => 422,
            RelayError::Transient(_) => 503,
            RelayError::Upstream { .. } => 502,
            RelayError::Server { status, .. } => *status,
        }
    }
}

#[cfg(test)]
mod tests {
    use markforge_contracts::ValidationError;

    use super::RelayError;

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(RelayError::Transient("reset".into()).is_retryable());
        assert!(!RelayError::RateLimited("429".into()).is_retryable());
        assert!(!RelayError::from(ValidationError::MissingReferenceImage).is_retryable());
        assert!(!RelayError::ExtractionFailed("prose".into()).is_retryable());
    }

    #[test]
    fn rate_limit_message_differs_from_generic_failure() {
        let limited = RelayError::RateLimited("quota".into()).user_message();
        let transient = RelayError::Transient("reset".into()).user_message();
        let upstream = RelayError::Upstream {
            status: 500,
            message: "boom".into(),
        }
        .user_message();
        assert!(limited.contains("wait"));
        assert_ne!(limited, transient);
        assert_ne!(limited, upstream);
    }

    #[test]
    fn status_codes_follow_error_class() {
        assert_eq!(
            RelayError::from(ValidationError::MissingPromptOrImage).http_status(),
            400
        );
        assert_eq!(RelayError::RateLimited(String::new()).http_status(), 429);
        assert_eq!(RelayError::ExtractionFailed(String::new()).http_status(), 422);
        assert_eq!(RelayError::Transient(String::new()).http_status(), 503);
    }

    #[test]
    fn server_message_is_passed_through() {
        let err = RelayError::Server {
            status: 500,
            message: "Error generating logo.".into(),
        };
        assert_eq!(err.user_message(), "Error generating logo.");
        let empty = RelayError::Server {
            status: 502,
            message: String::new(),
        };
        assert_eq!(empty.user_message(), "Server error: 502");
    }
}
