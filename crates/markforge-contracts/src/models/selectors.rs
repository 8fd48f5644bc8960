use super::registry::{normalize_model_name, ModelRegistry, ModelSpec, OutputKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl ModelSelector {
    /// Resolves a configured model name. Unknown Gemini model names are kept,
    /// with the output kind guessed from the name: image-capable Gemini models
    /// carry `image` in their id.
    pub fn select_or_adopt(&self, requested: &str) -> ModelSelection {
        let name = normalize_model_name(requested);
        if let Some(model) = self.registry.get(name) {
            return ModelSelection {
                model: model.clone(),
                fallback_reason: None,
            };
        }
        let output = if name.contains("image") {
            OutputKind::Raster
        } else {
            OutputKind::Vector
        };
        ModelSelection {
            model: ModelSpec {
                name: name.to_string(),
                provider: "gemini".to_string(),
                output,
            },
            fallback_reason: Some(format!(
                "Model '{name}' is not registered; assuming {} output.",
                match output {
                    OutputKind::Raster => "raster",
                    OutputKind::Vector => "vector",
                }
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::ModelSelector;
    use crate::models::{ModelRegistry, ModelSpec, OutputKind, DEFAULT_IMAGE_MODEL};

    #[test]
    fn known_models_resolve_without_fallback() {
        let selector = ModelSelector::default();
        let selection = selector.select_or_adopt("models/gemini-flash-latest");
        assert_eq!(selection.model.name, "gemini-flash-latest");
        assert_eq!(selection.model.output, OutputKind::Vector);
        assert!(selection.fallback_reason.is_none());

        let default = selector.select_or_adopt(DEFAULT_IMAGE_MODEL);
        assert_eq!(default.model.output, OutputKind::Raster);
        assert!(default.fallback_reason.is_none());
    }

    #[test]
    fn adopting_unregistered_models_guesses_output_kind() {
        let selector = ModelSelector::default();
        let raster = selector.select_or_adopt("gemini-4-flash-image");
        assert_eq!(raster.model.output, OutputKind::Raster);
        assert_eq!(
            raster.fallback_reason.as_deref(),
            Some("Model 'gemini-4-flash-image' is not registered; assuming raster output.")
        );

        let vector = selector.select_or_adopt("models/gemini-4-pro");
        assert_eq!(vector.model.name, "gemini-4-pro");
        assert_eq!(vector.model.output, OutputKind::Vector);
    }

    #[test]
    fn custom_registry_overrides_defaults() {
        let mut models = IndexMap::new();
        models.insert(
            "house-vector".to_string(),
            ModelSpec {
                name: "house-vector".to_string(),
                provider: "gemini".to_string(),
                output: OutputKind::Vector,
            },
        );
        let selector = ModelSelector {
            registry: ModelRegistry::new(Some(models)),
        };
        assert!(selector
            .select_or_adopt("house-vector")
            .fallback_reason
            .is_none());
        assert!(selector
            .select_or_adopt(DEFAULT_IMAGE_MODEL)
            .fallback_reason
            .is_some());
    }
}
