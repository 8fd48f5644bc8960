//! Generation pipeline for markforge: encoding reference images, composing
//! model requests, relaying them to Gemini, extracting artwork, and the
//! client-side controller that drives it all.

pub mod client;
pub mod composer;
pub mod config;
pub mod controller;
pub mod download;
pub mod encoder;
pub mod error;
pub mod extractor;
pub mod provider;
pub mod relay;
pub mod server;

pub use client::{HttpRelayClient, Relay};
pub use config::{ConfigError, RelayConfig, ServerConfig};
pub use controller::{ClientController, PendingGeneration, SessionState, Status};
pub use error::RelayError;
pub use provider::{GeminiProvider, ImageProvider};
pub use relay::{LogoRelay, RetryPolicy};

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
