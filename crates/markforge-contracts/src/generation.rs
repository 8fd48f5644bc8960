use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::image::DataUri;

pub const MAX_REFERENCE_IMAGES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Modernize,
    Create,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Modernize, Mode::Create];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Modernize => "modernize",
            Mode::Create => "create",
        }
    }

    /// Label stored in history when the user left the prompt blank.
    pub fn default_prompt_label(self) -> &'static str {
        match self {
            Mode::Modernize => "Brand Revival",
            Mode::Create => "Forge Identity",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "modernize" | "revive" => Ok(Mode::Modernize),
            "create" | "new" => Ok(Mode::Create),
            other => Err(format!(
                "unknown mode '{other}' (expected 'modernize' or 'create')"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("To revive your brand, please upload at least one reference image.")]
    MissingReferenceImage,
    #[error("Please describe your vision or add a reference image.")]
    MissingPromptOrImage,
    #[error("At most 5 reference images are supported.")]
    TooManyImages,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub mode: Mode,
    pub prompt: String,
    pub reference_images: Vec<DataUri>,
}

impl GenerationRequest {
    pub fn new(mode: Mode, prompt: impl Into<String>, reference_images: Vec<DataUri>) -> Self {
        Self {
            mode,
            prompt: prompt.into(),
            reference_images,
        }
    }

    /// Modernize needs an image to work from. Create accepts either a brief
    /// or an image used as a style reference.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reference_images.len() > MAX_REFERENCE_IMAGES {
            return Err(ValidationError::TooManyImages);
        }
        match self.mode {
            Mode::Modernize if self.reference_images.is_empty() => {
                Err(ValidationError::MissingReferenceImage)
            }
            Mode::Create if self.prompt.trim().is_empty() && self.reference_images.is_empty() => {
                Err(ValidationError::MissingPromptOrImage)
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub image: DataUri,
    pub mode: Mode,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn new(image: DataUri, mode: Mode, prompt: impl Into<String>) -> Self {
        Self {
            image,
            mode,
            prompt: prompt.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub result: GenerationResult,
    pub reference_images: Vec<DataUri>,
}

impl HistoryEntry {
    pub fn new(result: GenerationResult, reference_images: Vec<DataUri>) -> Self {
        Self {
            id: Uuid::new_v4(),
            result,
            reference_images,
        }
    }

    /// Prompt as shown in the history list.
    pub fn display_prompt(&self) -> &str {
        let prompt = self.result.prompt.trim();
        if prompt.is_empty() {
            self.result.mode.default_prompt_label()
        } else {
            prompt
        }
    }
}
