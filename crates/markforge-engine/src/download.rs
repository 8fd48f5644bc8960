use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use markforge_contracts::{DataUri, GenerationResult, Mode};
use tracing::info;

/// `markforge-<mode>-<unix millis>.<ext>`, with the extension taken from the
/// image's actual encoding.
pub fn download_filename(mode: Mode, created_at: DateTime<Utc>, image: &DataUri) -> String {
    format!(
        "markforge-{}-{}.{}",
        mode.as_str(),
        created_at.timestamp_millis(),
        image.file_extension()
    )
}

pub fn save_result(dir: &Path, result: &GenerationResult) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed creating {}", dir.display()))?;
    let path = dir.join(download_filename(
        result.mode,
        result.created_at,
        &result.image,
    ));
    let bytes = result
        .image
        .decode()
        .context("generated image is not valid base64")?;
    fs::write(&path, &bytes).with_context(|| format!("failed writing {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "saved logo");
    Ok(path)
}
