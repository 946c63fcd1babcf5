//! Classifier artifact installation.
//!
//! Resolves the configured artifact path and, when the file is missing and
//! a `model.url` is configured, downloads it, verifying its SHA-256.

use crate::config::ModelConfig;
use crate::error::{LafalError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Installation state of the configured artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    Installed { path: PathBuf, size_bytes: u64 },
    Missing { path: PathBuf },
}

impl ModelStatus {
    pub fn is_installed(&self) -> bool {
        matches!(self, ModelStatus::Installed { .. })
    }
}

/// Inspect the configured artifact path without touching the network.
pub fn model_status(config: &ModelConfig) -> ModelStatus {
    match fs::metadata(&config.path) {
        Ok(meta) if meta.is_file() => ModelStatus::Installed {
            path: config.path.clone(),
            size_bytes: meta.len(),
        },
        _ => ModelStatus::Missing {
            path: config.path.clone(),
        },
    }
}

fn unavailable(path: &Path, message: impl Into<String>) -> LafalError {
    LafalError::ModelUnavailable {
        path: path.display().to_string(),
        message: message.into(),
    }
}

/// Make sure the artifact exists locally and return its path.
///
/// # Errors
///
/// Returns `ModelUnavailable` if the file is missing and:
/// - downloading is disabled
/// - no `model.url` is configured
/// - the download or checksum verification fails
pub async fn ensure_model(config: &ModelConfig, allow_download: bool, progress: bool) -> Result<PathBuf> {
    if model_status(config).is_installed() {
        return Ok(config.path.clone());
    }

    if !allow_download {
        return Err(unavailable(&config.path, "file not found (download disabled)"));
    }

    let Some(url) = config.url.as_deref() else {
        return Err(unavailable(
            &config.path,
            "file not found and no model.url configured",
        ));
    };

    fetch(url, config.sha256.as_deref(), &config.path, progress).await?;
    Ok(config.path.clone())
}

#[cfg(feature = "model-download")]
async fn fetch(url: &str, sha256: Option<&str>, path: &Path, progress: bool) -> Result<()> {
    download_model(url, sha256, path, progress).await
}

#[cfg(not(feature = "model-download"))]
async fn fetch(_url: &str, _sha256: Option<&str>, path: &Path, _progress: bool) -> Result<()> {
    Err(unavailable(
        path,
        "file not found (built without model-download support)",
    ))
}

/// Download `url` to `output_path`, verifying the SHA-256 when one is given.
///
/// The body is streamed to `<output_path>.part` and renamed into place only
/// after verification, so an interrupted download never looks installed.
#[cfg(feature = "model-download")]
pub async fn download_model(
    url: &str,
    sha256: Option<&str>,
    output_path: &Path,
    progress: bool,
) -> Result<()> {
    use futures_util::StreamExt;
    use indicatif::{ProgressBar, ProgressStyle};
    use sha2::{Digest, Sha256};
    use std::io::Write;

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| {
            unavailable(output_path, format!("failed to create model directory: {e}"))
        })?;
    }

    if progress {
        eprintln!("Downloading classifier from {url}...");
    }
    tracing::info!(url, path = %output_path.display(), "Downloading classifier artifact");

    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .map_err(|e| unavailable(output_path, format!("failed to start download: {e}")))?;

    if !response.status().is_success() {
        return Err(unavailable(
            output_path,
            format!("download failed with status: {}", response.status()),
        ));
    }

    let total_size = response.content_length().unwrap_or(0);
    let pb = if progress {
        let pb = ProgressBar::new(total_size);
        pb.set_style(
            // SAFETY: hardcoded template string, always valid
            #[allow(clippy::expect_used)]
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .expect("hardcoded progress bar template")
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let part_path = part_path(output_path);
    let mut hasher = Sha256::new();
    let mut stream = response.bytes_stream();
    let mut file = fs::File::create(&part_path)
        .map_err(|e| unavailable(output_path, format!("failed to create output file: {e}")))?;

    while let Some(chunk) = stream.next().await {
        let written = chunk
            .map_err(|e| format!("failed to read download chunk: {e}"))
            .and_then(|chunk| {
                file.write_all(&chunk)
                    .map(|()| chunk)
                    .map_err(|e| format!("failed to write to file: {e}"))
            });
        let chunk = match written {
            Ok(chunk) => chunk,
            Err(message) => {
                discard(&part_path);
                return Err(unavailable(output_path, message));
            }
        };

        hasher.update(&chunk);
        if let Some(ref pb) = pb {
            pb.inc(chunk.len() as u64);
        }
    }
    drop(file);

    if let Some(pb) = pb {
        pb.finish_with_message("Downloaded");
    }

    let calculated = format!("{:x}", hasher.finalize());
    if let Some(expected) = sha256
        && !expected.trim().eq_ignore_ascii_case(&calculated)
    {
        discard(&part_path);
        return Err(unavailable(
            output_path,
            format!("SHA-256 checksum mismatch. Expected: {expected}, got: {calculated}"),
        ));
    }

    fs::rename(&part_path, output_path).map_err(|e| {
        discard(&part_path);
        unavailable(output_path, format!("failed to move download into place: {e}"))
    })?;

    if progress {
        if sha256.is_some() {
            eprintln!("Checksum verified");
        }
        eprintln!("Classifier installed to: {}", output_path.display());
    }
    tracing::info!(sha256 = %calculated, "Classifier artifact installed");
    Ok(())
}

#[cfg(feature = "model-download")]
fn part_path(output_path: &Path) -> PathBuf {
    let mut name = output_path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(feature = "model-download")]
fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), "Failed to remove partial download: {e}");
    }
}
