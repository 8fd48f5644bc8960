use markforge_contracts::models::OutputKind;
use markforge_contracts::{DataUri, GenerationRequest, Mode};
use serde_json::{json, Map, Value};

const BRANDING_DIRECTIVES: &str = "\
BRANDING DIRECTIVES:
1. SYMBOLISM OVER ILLUSTRATION: create a distinct, iconic mark. No busy illustrations or photorealistic scenes.
2. NO GIBBERISH: do not invent characters or fake words unless specific letters are requested.
3. GEOMETRIC PRECISION: balanced shapes, perfect circles, clean vectors, visual weight centered.
4. FLAT AESTHETIC: solid colors and clean negative space. No fuzzy edges, messy gradients or over-detailed textures.
5. LEGIBILITY: high contrast, recognizable from app icon to billboard.
6. ENVIRONMENT: center the mark on a solid, clean, high-contrast background.";

const RASTER_DIRECTIVES: &str = "\
OUTPUT: render a single square logo in high fidelity with crisp boundaries.";

const VECTOR_DIRECTIVES: &str = "\
OUTPUT: return ONLY valid SVG code. Do not wrap it in markdown code fences.
Start with <svg and end with </svg>.
1. Use a 512x512 viewBox.
2. Use balanced, professional geometry.
3. Keep contrast high and lines clean.";

const MODERNIZE_TASK: &str = "\
TASK: BRAND REVIVAL AND MODERNIZATION.
You are a vectorizer and brand restorer. Analyze the visual DNA of the provided reference logo
and reconstruct it as a modern, premium, timeless mark. Remove noise, blur and dated artifacts
while keeping what makes the brand recognizable.";

const CREATE_TASK: &str = "\
TASK: FORGE A NEW IDENTITY.
You are an expert logo designer. From the creative brief, synthesize an original, symbolic brand
mark built on a strong visual metaphor and professional symmetry. Treat any provided image as a
style reference only.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    InlineImage { mime: String, data: String },
    Text(String),
}

/// Provider-ready request: image parts first, instruction text last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedRequest {
    pub mode: Mode,
    pub output: OutputKind,
    pub parts: Vec<Part>,
}

pub fn compose(request: &GenerationRequest, output: OutputKind) -> ComposedRequest {
    let mut parts: Vec<Part> = request
        .reference_images
        .iter()
        .map(|image: &DataUri| Part::InlineImage {
            mime: image.mime().to_string(),
            data: image.data().to_string(),
        })
        .collect();
    parts.push(Part::Text(instruction_text(
        request.mode,
        output,
        &request.prompt,
    )));
    ComposedRequest {
        mode: request.mode,
        output,
        parts,
    }
}

pub fn instruction_text(mode: Mode, output: OutputKind, user_prompt: &str) -> String {
    let task = match mode {
        Mode::Modernize => MODERNIZE_TASK,
        Mode::Create => CREATE_TASK,
    };
    let output_directives = match output {
        OutputKind::Raster => RASTER_DIRECTIVES,
        OutputKind::Vector => VECTOR_DIRECTIVES,
    };
    let brief = user_prompt.trim();
    let brief = if brief.is_empty() {
        mode.default_prompt_label()
    } else {
        brief
    };
    format!("{task}\n\n{BRANDING_DIRECTIVES}\n\n{output_directives}\n\nBRIEF: {brief}")
}

impl ComposedRequest {
    /// Body for Gemini `generateContent`.
    pub fn to_gemini_payload(&self) -> Value {
        let parts: Vec<Value> = self
            .parts
            .iter()
            .map(|part| match part {
                Part::InlineImage { mime, data } => json!({
                    "inlineData": {
                        "mimeType": mime,
                        "data": data,
                    }
                }),
                Part::Text(text) => json!({ "text": text }),
            })
            .collect();

        let mut generation_config = Map::new();
        generation_config.insert("candidateCount".to_string(), json!(1));
        if self.output == OutputKind::Raster {
            generation_config.insert("responseModalities".to_string(), json!(["IMAGE"]));
            generation_config.insert("imageConfig".to_string(), json!({ "aspectRatio": "1:1" }));
        }

        json!({
            "contents": [{
                "role": "user",
                "parts": parts,
            }],
            "generationConfig": Value::Object(generation_config),
        })
    }
}

#[cfg(test)]
mod tests {
    use markforge_contracts::models::OutputKind;
    use markforge_contracts::{DataUri, GenerationRequest, Mode};
    use serde_json::{json, Value};

    use super::{compose, instruction_text, Part};

    #[test]
    fn images_precede_instruction_text_in_order() {
        let request = GenerationRequest::new(
            Mode::Modernize,
            "bolder text",
            vec![
                DataUri::new("image/png", "AAAA"),
                DataUri::new("image/jpeg", "BBBB"),
            ],
        );
        let composed = compose(&request, OutputKind::Raster);
        assert_eq!(composed.parts.len(), 3);
        assert_eq!(
            composed.parts[0],
            Part::InlineImage {
                mime: "image/png".to_string(),
                data: "AAAA".to_string()
            }
        );
        assert!(matches!(&composed.parts[1], Part::InlineImage { mime, .. } if mime == "image/jpeg"));
        let Part::Text(text) = &composed.parts[2] else {
            panic!("last part should be text");
        };
        assert!(text.contains("BRAND REVIVAL"));
        assert!(text.ends_with("BRIEF: bolder text"));
    }

    #[test]
    fn templates_differ_by_mode_and_output() {
        let modernize = instruction_text(Mode::Modernize, OutputKind::Raster, "x");
        let create = instruction_text(Mode::Create, OutputKind::Raster, "x");
        assert!(modernize.contains("vectorizer"));
        assert!(create.contains("logo designer"));
        assert_ne!(modernize, create);

        let vector = instruction_text(Mode::Create, OutputKind::Vector, "x");
        assert!(vector.contains("512x512 viewBox"));
        assert!(!create.contains("512x512 viewBox"));
    }

    #[test]
    fn blank_prompt_falls_back_to_mode_label() {
        let text = instruction_text(Mode::Create, OutputKind::Vector, "  ");
        assert!(text.ends_with("BRIEF: Forge Identity"));
    }

    #[test]
    fn gemini_payload_requests_images_only_for_raster_models() {
        let request = GenerationRequest::new(Mode::Create, "fox", Vec::new());
        let raster = compose(&request, OutputKind::Raster).to_gemini_payload();
        assert_eq!(
            raster["generationConfig"]["responseModalities"],
            json!(["IMAGE"])
        );
        assert_eq!(
            raster["generationConfig"]["imageConfig"]["aspectRatio"],
            json!("1:1")
        );
        assert_eq!(raster["contents"][0]["role"], json!("user"));

        let vector = compose(&request, OutputKind::Vector).to_gemini_payload();
        assert_eq!(vector["generationConfig"].get("responseModalities"), None::<&Value>);
        let parts = vector["contents"][0]["parts"].as_array().cloned().unwrap_or_default();
        assert_eq!(parts.len(), 1);
        assert!(parts[0]["text"].as_str().unwrap_or_default().contains("SVG"));
    }
}
