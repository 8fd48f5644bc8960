//! Data types and policies shared by the markforge relay and its clients.
//!
//! Nothing in this crate touches the network or the filesystem.

pub mod chat;
pub mod generation;
pub mod history;
pub mod image;
pub mod models;
pub mod wire;

pub use generation::{
    GenerationRequest, GenerationResult, HistoryEntry, Mode, ValidationError,
    MAX_REFERENCE_IMAGES,
};
pub use history::{HistoryStore, HISTORY_CAPACITY};
pub use image::{DataUri, DataUriError, SVG_MIME};
