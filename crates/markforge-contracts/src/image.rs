use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const SVG_MIME: &str = "image/svg+xml";

/// Self-describing embedded image: `data:<mime>;base64,<payload>`.
///
/// The payload is kept in its encoded form. Images travel as data URIs
/// through the relay and the controller, so decoding only happens when a
/// result is written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataUri {
    mime: String,
    data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataUriError {
    #[error("not a data URI")]
    MissingScheme,
    #[error("data URI is not base64 encoded")]
    NotBase64,
    #[error("data URI has an empty mime type")]
    EmptyMime,
    #[error("data URI has an empty payload")]
    EmptyPayload,
}

impl DataUri {
    pub fn new(mime: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime: mime.into(),
            data: data.into(),
        }
    }

    pub fn from_bytes(mime: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime, BASE64.encode(bytes))
    }

    pub fn svg(markup: &str) -> Self {
        Self::from_bytes(SVG_MIME, markup.as_bytes())
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Base64 payload without the `data:` header.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(self.data.as_bytes())
    }

    pub fn is_vector(&self) -> bool {
        self.mime.eq_ignore_ascii_case(SVG_MIME)
    }

    pub fn file_extension(&self) -> &'static str {
        let lowered = self.mime.to_ascii_lowercase();
        if lowered.contains("svg") {
            return "svg";
        }
        if lowered.contains("jpeg") || lowered.contains("jpg") {
            return "jpg";
        }
        if lowered.contains("webp") {
            return "webp";
        }
        if lowered.contains("gif") {
            return "gif";
        }
        "png"
    }

    /// Approximate decoded size, used for log lines.
    pub fn byte_len(&self) -> usize {
        self.data.len() / 4 * 3
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, self.data)
    }
}

impl FromStr for DataUri {
    type Err = DataUriError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let rest = trimmed
            .strip_prefix("data:")
            .ok_or(DataUriError::MissingScheme)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUriError::NotBase64)?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or(DataUriError::NotBase64)?
            .trim();
        if mime.is_empty() {
            return Err(DataUriError::EmptyMime);
        }
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(DataUriError::EmptyPayload);
        }
        Ok(Self::new(mime, payload))
    }
}

impl Serialize for DataUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
