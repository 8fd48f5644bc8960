//! JSON bodies of `POST /api/generate-logo`.

use serde::{Deserialize, Serialize};

use crate::generation::{GenerationRequest, Mode};
use crate::image::{DataUri, DataUriError};

pub const GENERATE_LOGO_PATH: &str = "/api/generate-logo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateLogoRequest {
    pub mode: Mode,
    #[serde(default)]
    pub user_prompt: String,
    #[serde(default)]
    pub base64_images: Vec<String>,
}

impl From<&GenerationRequest> for GenerateLogoRequest {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            mode: request.mode,
            user_prompt: request.prompt.clone(),
            base64_images: request
                .reference_images
                .iter()
                .map(DataUri::to_string)
                .collect(),
        }
    }
}

/// A reference image the relay could not parse, reported by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedImage {
    pub index: usize,
    pub reason: DataUriError,
}

impl GenerateLogoRequest {
    /// Converts to a domain request. Images that are not data URIs are
    /// dropped and reported rather than failing the whole request.
    pub fn into_generation_request(self) -> (GenerationRequest, Vec<SkippedImage>) {
        let mut images = Vec::with_capacity(self.base64_images.len());
        let mut skipped = Vec::new();
        for (index, raw) in self.base64_images.iter().enumerate() {
            match raw.parse::<DataUri>() {
                Ok(image) => images.push(image),
                Err(reason) => skipped.push(SkippedImage { index, reason }),
            }
        }
        (
            GenerationRequest::new(self.mode, self.user_prompt, images),
            skipped,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateLogoResponse {
    pub image: DataUri,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ErrorBody, GenerateLogoRequest};
    use crate::generation::Mode;
    use crate::image::DataUriError;

    #[test]
    fn request_uses_camel_case_field_names() {
        let body: GenerateLogoRequest = serde_json::from_value(json!({
            "mode": "modernize",
            "userPrompt": "bolder",
            "base64Images": ["data:image/png;base64,AAAA"],
        }))
        .unwrap();
        assert_eq!(body.mode, Mode::Modernize);
        assert_eq!(body.user_prompt, "bolder");
        assert_eq!(body.base64_images.len(), 1);
    }

    #[test]
    fn missing_prompt_and_images_default_to_empty() {
        let body: GenerateLogoRequest =
            serde_json::from_value(json!({ "mode": "create" })).unwrap();
        assert!(body.user_prompt.is_empty());
        assert!(body.base64_images.is_empty());
    }

    #[test]
    fn unparseable_images_are_skipped_and_reported() {
        let body = GenerateLogoRequest {
            mode: Mode::Create,
            user_prompt: "fox".to_string(),
            base64_images: vec![
                "not-a-data-uri".to_string(),
                "data:image/jpeg;base64,/9j/".to_string(),
            ],
        };
        let (request, skipped) = body.into_generation_request();
        assert_eq!(request.reference_images.len(), 1);
        assert_eq!(request.reference_images[0].mime(), "image/jpeg");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].index, 0);
        assert_eq!(skipped[0].reason, DataUriError::MissingScheme);
    }

    #[test]
    fn error_body_omits_empty_details() {
        let body = ErrorBody {
            message: "Error generating logo.".to_string(),
            details: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "message": "Error generating logo." })
        );
    }
}
