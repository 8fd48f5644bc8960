use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use markforge_contracts::models::DEFAULT_IMAGE_MODEL;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY", "GOOGLE_API_KEY"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no model API key configured; set GEMINI_API_KEY (or API_KEY) in the environment or .env")]
    MissingApiKey,
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Everything the relay needs to reach the model provider.
#[derive(Clone)]
pub struct RelayConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub request_timeout: Duration,
    pub max_retries: usize,
    pub retry_backoff: Duration,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .finish()
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = API_KEY_VARS
            .iter()
            .find_map(|key| non_empty(*key))
            .ok_or(ConfigError::MissingApiKey)?;
        let api_base = non_empty("GEMINI_API_BASE")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = non_empty("MARKFORGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string());
        let timeout_secs = clamped_u64(
            non_empty("MARKFORGE_REQUEST_TIMEOUT_SECS"),
            "MARKFORGE_REQUEST_TIMEOUT_SECS",
            60,
            5,
            300,
        )?;
        let backoff_ms = clamped_u64(
            non_empty("MARKFORGE_RETRY_BACKOFF_MS"),
            "MARKFORGE_RETRY_BACKOFF_MS",
            750,
            0,
            10_000,
        )?;

        Ok(Self {
            api_key,
            api_base,
            model,
            request_timeout: Duration::from_secs(timeout_secs),
            max_retries: 1,
            retry_backoff: Duration::from_millis(backoff_ms),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub relay: RelayConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let relay = RelayConfig::from_lookup(&lookup)?;
        let port = match lookup("PORT").map(|value| value.trim().to_string()) {
            Some(raw) if !raw.is_empty() => raw.parse::<u16>().map_err(|err| ConfigError::Invalid {
                key: "PORT",
                reason: err.to_string(),
            })?,
            _ => DEFAULT_PORT,
        };
        let bind = match lookup("MARKFORGE_BIND").map(|value| value.trim().to_string()) {
            Some(raw) if !raw.is_empty() => {
                raw.parse::<IpAddr>().map_err(|err| ConfigError::Invalid {
                    key: "MARKFORGE_BIND",
                    reason: err.to_string(),
                })?
            }
            _ => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };
        Ok(Self { bind, port, relay })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn clamped_u64(
    raw: Option<String>,
    key: &'static str,
    default: u64,
    min: u64,
    max: u64,
) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value = raw.parse::<u64>().map_err(|err| ConfigError::Invalid {
        key,
        reason: err.to_string(),
    })?;
    Ok(value.clamp(min, max))
}
