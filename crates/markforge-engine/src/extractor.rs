//! Turns a Gemini `generateContent` reply into a displayable image.
//!
//! Inline image parts win. Otherwise the reply text is scanned for the first
//! balanced `<svg>...</svg>` fragment. The scan is a tolerant heuristic over
//! free-form model output, not an XML parser: it only balances `svg` tags and
//! ignores everything around them (prose, markdown fences, later fragments).

use std::sync::OnceLock;

use markforge_contracts::DataUri;
use regex::Regex;
use serde_json::Value;

use crate::error::RelayError;
use crate::truncate_text;

const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "IMAGE_SAFETY",
    "SPII",
];

fn svg_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)<(/?)svg\b[^>]*>").expect("svg tag pattern is valid")
    })
}

pub fn extract_image(response: &Value) -> Result<DataUri, RelayError> {
    let candidates = response
        .get("candidates")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for candidate in candidates {
        for part in candidate_parts(candidate) {
            if let Some(image) = inline_image(part) {
                return Ok(image);
            }
        }
    }

    let text = response_text(candidates);
    if let Some(fragment) = find_svg_fragment(&text) {
        return Ok(DataUri::svg(fragment));
    }

    if let Some(reason) = block_reason(response, candidates) {
        return Err(RelayError::Blocked(reason));
    }

    let preview = text.trim();
    Err(RelayError::ExtractionFailed(if preview.is_empty() {
        "model returned no image and no text".to_string()
    } else {
        format!(
            "model returned no image or SVG markup: {}",
            truncate_text(preview, 200)
        )
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
    SelfClosing,
}

#[derive(Debug, Clone, Copy)]
struct SvgTag {
    kind: TagKind,
    start: usize,
    end: usize,
}

/// Returns the first balanced `<svg ...>...</svg>` fragment, including
/// nested `<svg>` elements, or a self-closing `<svg .../>` at top level.
///
/// An opening tag that never closes (a mention in prose, a cut-off draft)
/// does not hide a complete fragment after it: each opening tag is tried as
/// a start in turn.
pub fn find_svg_fragment(text: &str) -> Option<&str> {
    let tags: Vec<SvgTag> = svg_tag_pattern()
        .captures_iter(text)
        .filter_map(|captures| {
            let tag = captures.get(0)?;
            let kind = if captures.get(1).is_some_and(|slash| slash.as_str() == "/") {
                TagKind::Close
            } else if tag.as_str().ends_with("/>") {
                TagKind::SelfClosing
            } else {
                TagKind::Open
            };
            Some(SvgTag {
                kind,
                start: tag.start(),
                end: tag.end(),
            })
        })
        .collect();

    for (index, tag) in tags.iter().enumerate() {
        match tag.kind {
            TagKind::SelfClosing => return Some(&text[tag.start..tag.end]),
            TagKind::Close => continue,
            TagKind::Open => {
                if let Some(end) = balanced_end(&tags[index + 1..]) {
                    return Some(&text[tag.start..end]);
                }
            }
        }
    }
    None
}

/// End offset of the closing tag that brings an already opened element back
/// to depth zero.
fn balanced_end(rest: &[SvgTag]) -> Option<usize> {
    let mut depth = 1usize;
    for tag in rest {
        match tag.kind {
            TagKind::Open => depth += 1,
            TagKind::Close => {
                depth -= 1;
                if depth == 0 {
                    return Some(tag.end);
                }
            }
            TagKind::SelfClosing => {}
        }
    }
    None
}

fn candidate_parts(candidate: &Value) -> &[Value] {
    candidate
        .get("content")
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn inline_image(part: &Value) -> Option<DataUri> {
    let inline = part
        .get("inlineData")
        .or_else(|| part.get("inline_data"))
        .and_then(Value::as_object)?;
    let data = inline
        .get("data")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())?;
    let mime = inline
        .get("mimeType")
        .or_else(|| inline.get("mime_type"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("image/png");
    Some(DataUri::new(mime, data))
}

fn response_text(candidates: &[Value]) -> String {
    candidates
        .iter()
        .flat_map(candidate_parts)
        .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<&str>>()
        .join("\n")
}

fn block_reason(response: &Value, candidates: &[Value]) -> Option<String> {
    if let Some(reason) = response
        .get("promptFeedback")
        .and_then(|feedback| feedback.get("blockReason"))
        .and_then(Value::as_str)
    {
        return Some(format!("prompt blocked ({reason})"));
    }
    candidates
        .iter()
        .filter_map(|candidate| candidate.get("finishReason").and_then(Value::as_str))
        .find(|reason| BLOCKING_FINISH_REASONS.contains(reason))
        .map(|reason| format!("generation stopped ({reason})"))
}
