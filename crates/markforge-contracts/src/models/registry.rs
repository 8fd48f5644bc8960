use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// How a model hands back artwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Inline image bytes in the response parts.
    Raster,
    /// SVG markup inside the response text.
    Vector,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub output: OutputKind,
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(normalize_model_name(name))
    }
}

/// Accepts both `gemini-x` and the API's `models/gemini-x` spelling.
pub fn normalize_model_name(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed.strip_prefix("models/").unwrap_or(trimmed)
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, output: OutputKind| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                provider: "gemini".to_string(),
                output,
            },
        );
    };

    insert(DEFAULT_IMAGE_MODEL, OutputKind::Raster);
    insert("gemini-3-pro-image-preview", OutputKind::Raster);
    insert("gemini-flash-latest", OutputKind::Vector);
    insert("gemini-2.5-flash", OutputKind::Vector);
    insert("gemini-2.5-pro", OutputKind::Vector);

    map
}
