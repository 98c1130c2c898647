//! Model downloading
//!
//! Fetches the segmentation model into the local cache with progress
//! reporting, optional SHA-256 verification and an atomic rename from a
//! `.part` file.

use crate::config::ModelConfig;
use crate::error::{BgRemovalError, Result};
use crate::tracing_config::spans;
use futures_util::StreamExt;
#[cfg(feature = "cli")]
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn, Instrument};

/// Progress bar abstraction that works with and without CLI features
#[derive(Debug)]
pub enum ProgressIndicator {
    #[cfg(feature = "cli")]
    Indicatif(ProgressBar),
    NoOp,
}

impl ProgressIndicator {
    /// Set message for progress indicator
    pub fn set_message(&self, msg: String) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.set_message(msg),
            Self::NoOp => drop(msg),
        }
    }

    /// Set length for progress indicator
    pub fn set_length(&self, len: u64) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.set_length(len),
            Self::NoOp => {
                let _ = len;
            },
        }
    }

    /// Set position for progress indicator
    pub fn set_position(&self, pos: u64) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.set_position(pos),
            Self::NoOp => {
                let _ = pos;
            },
        }
    }

    /// Finish with a final message
    pub fn finish_with_message(&self, msg: String) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.finish_with_message(msg),
            Self::NoOp => drop(msg),
        }
    }
}

/// Model downloader with progress reporting
#[derive(Debug, Clone)]
pub struct ModelDownloader {
    client: Client,
}

impl ModelDownloader {
    /// Create a new model downloader
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| BgRemovalError::network_error("Failed to create HTTP client", e))?;

        Ok(Self { client })
    }

    /// Make sure the configured model is on disk and return its path
    ///
    /// An explicit `model_path` is never downloaded; it must already exist.
    /// Otherwise the model is fetched from `model_url` into the cache
    /// directory unless it is already there.
    ///
    /// # Errors
    /// - Explicit model path missing
    /// - Invalid model URL
    /// - Network, file system or integrity failures
    pub async fn ensure_model(&self, config: &ModelConfig, show_progress: bool) -> Result<PathBuf> {
        if let Some(path) = &config.model_path {
            if path.is_file() {
                return Ok(path.clone());
            }
            return Err(BgRemovalError::model(format!(
                "Model file '{}' does not exist",
                path.display()
            )));
        }

        let target = config.resolved_model_path();
        if target.is_file() {
            debug!(path = %target.display(), "Model already cached");
            return Ok(target);
        }

        self.download_model(&config.model_url, &target, config.sha256.as_deref(), show_progress)
            .await?;
        Ok(target)
    }

    /// Download a model file to `target`
    ///
    /// # Errors
    /// - Invalid model URL
    /// - Network errors during download
    /// - File system errors
    /// - SHA-256 mismatch
    pub async fn download_model(
        &self,
        url: &str,
        target: &Path,
        expected_sha256: Option<&str>,
        show_progress: bool,
    ) -> Result<()> {
        validate_model_url(url)?;
        info!(url, target = %target.display(), "Downloading model");

        let partial = partial_path(target);
        let progress = if show_progress {
            Self::create_progress_indicator()
        } else {
            ProgressIndicator::NoOp
        };
        progress.set_message(format!("Downloading {}", file_label(target)));

        if let Err(e) = self
            .download_file(url, &partial, &progress)
            .instrument(spans::download(url, target))
            .await
        {
            discard(&partial);
            return Err(e);
        }

        match Self::verify_file_integrity(&partial, expected_sha256) {
            Ok(true) => {},
            Ok(false) => {
                discard(&partial);
                return Err(BgRemovalError::model(format!(
                    "Downloaded model from {url} failed SHA-256 verification"
                )));
            },
            Err(e) => {
                discard(&partial);
                return Err(e);
            },
        }

        std::fs::rename(&partial, target)
            .map_err(|e| BgRemovalError::file_io_error("move downloaded model into", target, &e))?;

        progress.finish_with_message(format!("Downloaded {}", file_label(target)));
        info!(path = %target.display(), "Model downloaded");
        Ok(())
    }

    /// Create a progress indicator for download reporting
    fn create_progress_indicator() -> ProgressIndicator {
        #[cfg(feature = "cli")]
        {
            let pb = ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}",
            ) {
                pb.set_style(style.progress_chars("#>-"));
            }
            ProgressIndicator::Indicatif(pb)
        }
        #[cfg(not(feature = "cli"))]
        {
            ProgressIndicator::NoOp
        }
    }

    /// Stream a single file to disk
    async fn download_file(
        &self,
        url: &str,
        local_path: &Path,
        progress: &ProgressIndicator,
    ) -> Result<()> {
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BgRemovalError::file_io_error("create directory", parent, &e))?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BgRemovalError::network_error(format!("Failed to download {url}"), e))?;

        if !response.status().is_success() {
            return Err(BgRemovalError::network_error(
                format!("Failed to download {url}"),
                format!("HTTP {}", response.status()),
            ));
        }

        let total_size = response.content_length();
        if let Some(total) = total_size {
            progress.set_length(total);
        }

        let mut file = tokio::fs::File::create(local_path)
            .await
            .map_err(|e| BgRemovalError::file_io_error("create file", local_path, &e))?;

        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| BgRemovalError::network_error("Failed to read download stream", e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| BgRemovalError::file_io_error("write to file", local_path, &e))?;

            downloaded += chunk.len() as u64;
            if total_size.is_some() {
                progress.set_position(downloaded);
            } else {
                progress.set_message(format!(
                    "Downloaded {:.1} MB",
                    downloaded as f64 / (1024.0 * 1024.0)
                ));
            }
        }

        file.flush()
            .await
            .map_err(|e| BgRemovalError::file_io_error("flush file", local_path, &e))?;

        debug!(bytes = downloaded, path = %local_path.display(), "Download finished");
        Ok(())
    }

    /// Verify a file against a hex SHA-256 digest
    ///
    /// Returns `true` when no digest is given.
    ///
    /// # Errors
    /// - File cannot be read
    pub fn verify_file_integrity(file_path: &Path, expected_hash: Option<&str>) -> Result<bool> {
        let Some(expected) = expected_hash else {
            return Ok(true);
        };

        let contents = std::fs::read(file_path).map_err(|e| {
            BgRemovalError::file_io_error("read file for verification", file_path, &e)
        })?;

        let actual_hash = format!("{:x}", Sha256::digest(&contents));
        if actual_hash.eq_ignore_ascii_case(expected.trim()) {
            Ok(true)
        } else {
            warn!(
                path = %file_path.display(),
                expected,
                actual = %actual_hash,
                "File integrity check failed"
            );
            Ok(false)
        }
    }
}

/// Validate that a model URL can be fetched
///
/// Only absolute `http` and `https` URLs with a host are accepted.
///
/// # Errors
/// - Empty URL, other schemes, or missing host
pub fn validate_model_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(BgRemovalError::invalid_config("Model URL cannot be empty"));
    }

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| {
            BgRemovalError::invalid_config(format!(
                "Unsupported model URL '{url}': only http and https are supported"
            ))
        })?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(BgRemovalError::invalid_config(format!(
            "Model URL '{url}' has no host"
        )));
    }

    Ok(())
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    target.with_file_name(name)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        debug!(path = %path.display(), error = %e, "Could not remove partial download");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_model_url() {
        assert!(validate_model_url(crate::config::DEFAULT_MODEL_URL).is_ok());
        assert!(validate_model_url("http://localhost:8080/u2net.onnx").is_ok());

        assert!(validate_model_url("").is_err());
        assert!(validate_model_url("ftp://example.com/model.onnx").is_err());
        assert!(validate_model_url("file:///tmp/model.onnx").is_err());
        assert!(validate_model_url("https:///model.onnx").is_err());
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/cache/u2net.onnx")),
            PathBuf::from("/cache/u2net.onnx.part")
        );
    }

    #[test]
    fn test_verify_file_integrity() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("test.txt");
        std::fs::write(&test_file, "test content").unwrap();

        assert!(ModelDownloader::verify_file_integrity(&test_file, None).unwrap());

        let expected = format!("{:x}", Sha256::digest(b"test content"));
        assert!(ModelDownloader::verify_file_integrity(&test_file, Some(&expected)).unwrap());
        assert!(ModelDownloader::verify_file_integrity(
            &test_file,
            Some(&expected.to_uppercase())
        )
        .unwrap());

        let wrong = "0".repeat(64);
        assert!(!ModelDownloader::verify_file_integrity(&test_file, Some(&wrong)).unwrap());

        let missing = temp_dir.path().join("missing.txt");
        let err = ModelDownloader::verify_file_integrity(&missing, Some(&wrong)).unwrap_err();
        assert!(err.to_string().contains("read file for verification"));
    }

    #[test]
    fn test_progress_indicator_no_op() {
        let progress = ProgressIndicator::NoOp;
        progress.set_message("test message".to_string());
        progress.set_length(100);
        progress.set_position(50);
        progress.finish_with_message("finished".to_string());
    }

    #[tokio::test]
    async fn test_ensure_model_uses_cached_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("u2net.onnx"), b"cached").unwrap();

        let config = ModelConfig {
            cache_dir: Some(temp_dir.path().to_path_buf()),
            model_url: "https://unreachable.invalid/u2net.onnx".to_string(),
            ..ModelConfig::default()
        };
        let path = ModelDownloader::new()
            .unwrap()
            .ensure_model(&config, false)
            .await
            .unwrap();
        assert_eq!(path, temp_dir.path().join("u2net.onnx"));
    }

    #[tokio::test]
    async fn test_ensure_model_explicit_path_missing() {
        let config = ModelConfig {
            model_path: Some(PathBuf::from("/nonexistent/model.onnx")),
            ..ModelConfig::default()
        };
        let err = ModelDownloader::new()
            .unwrap()
            .ensure_model(&config, false)
            .await
            .unwrap_err();
        assert!(matches!(err, BgRemovalError::Model(_)));
    }

    #[cfg(feature = "web")]
    async fn serve_bytes(body: &'static [u8]) -> String {
        let app = axum::Router::new().route("/model.onnx", axum::routing::get(move || async move { body }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/model.onnx")
    }

    #[cfg(feature = "web")]
    #[tokio::test]
    async fn test_download_model_from_local_server() {
        let url = serve_bytes(b"onnx model bytes").await;
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("models").join("u2net.onnx");
        let digest = format!("{:x}", Sha256::digest(b"onnx model bytes"));

        ModelDownloader::new()
            .unwrap()
            .download_model(&url, &target, Some(&digest), false)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"onnx model bytes");
        assert!(!partial_path(&target).exists());
    }

    #[cfg(feature = "web")]
    #[tokio::test]
    async fn test_download_model_checksum_mismatch() {
        let url = serve_bytes(b"tampered").await;
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("u2net.onnx");

        let err = ModelDownloader::new()
            .unwrap()
            .download_model(&url, &target, Some(&"0".repeat(64)), false)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("SHA-256"));
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
    }

    #[cfg(feature = "web")]
    #[tokio::test]
    async fn test_download_model_http_error() {
        let url = serve_bytes(b"").await.replace("model.onnx", "missing.onnx");
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("u2net.onnx");

        let err = ModelDownloader::new()
            .unwrap()
            .download_model(&url, &target, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, BgRemovalError::Network(_)));
        assert!(!target.exists());
    }
}
