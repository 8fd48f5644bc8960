use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use markforge_contracts::{DataUri, SVG_MIME};
use tracing::{debug, warn};

/// Reads an image file into a data URI.
///
/// The mime type is sniffed from the file contents. SVG documents are
/// recognized by their markup since raster sniffing does not cover them.
pub fn encode_image_file(path: &Path) -> Result<DataUri> {
    let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    encode_image_bytes(&bytes, Some(path))
        .with_context(|| format!("{} is not a usable image", path.display()))
}

pub fn encode_image_bytes(bytes: &[u8], hint: Option<&Path>) -> Result<DataUri> {
    if bytes.is_empty() {
        bail!("image is empty");
    }
    let Some(mime) = sniff_mime(bytes, hint) else {
        bail!("unrecognized image format");
    };
    Ok(DataUri::from_bytes(mime, bytes))
}

/// Encodes every readable image, skipping the rest with a warning.
pub fn encode_image_files<P: AsRef<Path>>(paths: &[P]) -> Vec<DataUri> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        match encode_image_file(path) {
            Ok(image) => {
                debug!(path = %path.display(), mime = image.mime(), "encoded reference image");
                images.push(image);
            }
            Err(err) => warn!(path = %path.display(), "skipping reference image: {err:#}"),
        }
    }
    images
}

/// Expands `~/` so paths typed in the studio behave like shell paths.
pub fn expand_user_path(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(raw)
}

fn sniff_mime(bytes: &[u8], hint: Option<&Path>) -> Option<&'static str> {
    if looks_like_svg(bytes, hint) {
        return Some(SVG_MIME);
    }
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
}

fn looks_like_svg(bytes: &[u8], hint: Option<&Path>) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]).to_ascii_lowercase();
    let trimmed = head.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with("<svg") {
        return true;
    }
    let svg_extension = hint
        .and_then(|path| path.extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);
    (svg_extension || trimmed.starts_with("<?xml")) && head.contains("<svg")
}
