//! Shared model cache and download helpers.
//!
//! Models are cached under `COLLOQUY_MODELS_DIR` (default `models/`) and
//! downloaded on first use.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to download model: {0}")]
    Http(String),
}

/// Root directory of the model cache.
pub fn cache_dir() -> PathBuf {
    std::env::var("COLLOQUY_MODELS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("models"))
}

/// Check whether a cached file looks complete (at least half the expected
/// size, guarding against truncated downloads).
pub fn is_downloaded(path: &Path, expected_mb: u64) -> bool {
    if !path.exists() {
        return false;
    }

    if let Ok(metadata) = fs::metadata(path) {
        let expected_bytes = expected_mb * 1024 * 1024;
        return metadata.len() >= expected_bytes / 2;
    }

    false
}

/// Download `url` to `path` unless a plausible copy is already cached.
pub fn ensure_downloaded(url: &str, path: &Path, expected_mb: u64) -> Result<(), DownloadError> {
    if is_downloaded(path, expected_mb) {
        info!("Model already downloaded at {:?}", path);
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    info!("Downloading {} (~{}MB)...", url, expected_mb);

    let response = reqwest::blocking::Client::new()
        .get(url)
        .send()
        .map_err(|e| DownloadError::Http(format!("HTTP request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(DownloadError::Http(format!(
            "HTTP {} from {}",
            response.status(),
            url
        )));
    }

    let total_size = response.content_length().unwrap_or(0);

    let pb = indicatif::ProgressBar::new(total_size);
    pb.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let temp_path = path.with_extension("download");
    let mut file = File::create(&temp_path)?;

    let bytes = response
        .bytes()
        .map_err(|e| DownloadError::Http(format!("Failed to read response: {}", e)))?;

    file.write_all(&bytes)?;
    pb.set_position(bytes.len() as u64);
    pb.finish_with_message("Download complete");

    fs::rename(&temp_path, path)?;

    info!("Model downloaded to {:?}", path);

    Ok(())
}
