//! Configuration types for the background remover
//!
//! The whole application is driven by one [`AppConfig`] that is built once at
//! startup (from defaults, an optional JSON file and CLI overrides), validated,
//! and then shared read-only by reference.

use crate::error::{BgRemovalError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default model: U²-Net general purpose salient object segmentation
pub const DEFAULT_MODEL_URL: &str =
    "https://github.com/danielgatis/rembg/releases/download/v0.0.0/u2net.onnx";

/// File name the default model is cached under
pub const DEFAULT_MODEL_FILE: &str = "u2net.onnx";

/// Execution provider options for ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    /// Auto-detect best available provider (CUDA > `CoreML` > CPU)
    #[default]
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon acceleration
    CoreMl,
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

impl FromStr for ExecutionProvider {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            "coreml" => Ok(Self::CoreMl),
            other => Err(BgRemovalError::invalid_config(format!(
                "Unknown execution provider '{other}' (expected auto, cpu, cuda or coreml)"
            ))),
        }
    }
}

/// Inference backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// ONNX Runtime backend (supports GPU acceleration)
    #[default]
    Onnx,
    /// Tract backend (pure Rust, no external dependencies)
    Tract,
    /// Border-color keying, needs no model file
    Mock,
}

impl BackendType {
    /// Whether this backend needs a model file on disk
    #[must_use]
    pub fn requires_model(self) -> bool {
        !matches!(self, Self::Mock)
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Onnx => write!(f, "onnx"),
            Self::Tract => write!(f, "tract"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

impl FromStr for BackendType {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "onnx" => Ok(Self::Onnx),
            "tract" => Ok(Self::Tract),
            "mock" => Ok(Self::Mock),
            other => Err(BgRemovalError::invalid_config(format!(
                "Unknown backend '{other}' (expected onnx, tract or mock)"
            ))),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Advertised upload limit in megabytes; enforced as the request body limit
    pub max_upload_mb: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_upload_mb: 50,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Upload limit in bytes
    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

/// Page theming, read-only for the life of the process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub app_title: String,
    pub tagline: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub footer: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            app_title: "Monk - Background Remover".to_string(),
            tagline: "AI-Powered Background Remover".to_string(),
            primary_color: "#667eea".to_string(),
            secondary_color: "#764ba2".to_string(),
            accent_color: "#84fab0".to_string(),
            footer: "Powered by U²-Net AI • Open Source • Free to Use".to_string(),
        }
    }
}

/// Segmentation model settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub backend: BackendType,
    pub execution_provider: ExecutionProvider,
    /// Explicit model file; overrides the cache location
    pub model_path: Option<PathBuf>,
    pub model_url: String,
    pub file_name: String,
    pub cache_dir: Option<PathBuf>,
    /// Expected SHA-256 of the downloaded model, hex encoded
    pub sha256: Option<String>,
    /// Number of intra-op threads (0 = auto)
    pub intra_threads: usize,
    /// Number of inter-op threads (0 = auto)
    pub inter_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            execution_provider: ExecutionProvider::default(),
            model_path: None,
            model_url: DEFAULT_MODEL_URL.to_string(),
            file_name: DEFAULT_MODEL_FILE.to_string(),
            cache_dir: None,
            sha256: None,
            intra_threads: 0,
            inter_threads: 0,
        }
    }
}

impl ModelConfig {
    /// Directory downloaded models are cached in
    #[must_use]
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("monk")
                .join("models")
        })
    }

    /// Path of the model file the backend loads
    #[must_use]
    pub fn resolved_model_path(&self) -> PathBuf {
        self.model_path
            .clone()
            .unwrap_or_else(|| self.resolved_cache_dir().join(&self.file_name))
    }
}

/// Upload acceptance rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Lowercase file extensions offered by the upload form
    pub accepted_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        #[allow(unused_mut)]
        let mut accepted_extensions =
            vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()];
        #[cfg(feature = "webp-support")]
        accepted_extensions.push("webp".to_string());

        Self {
            accepted_extensions,
        }
    }
}

impl UploadConfig {
    /// Whether the file name carries one of the accepted extensions
    #[must_use]
    pub fn accepts(&self, file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_lowercase();
                self.accepted_extensions.iter().any(|accepted| *accepted == ext)
            })
    }

    /// Value for the HTML `accept` attribute
    #[must_use]
    pub fn accept_attribute(&self) -> String {
        self.accepted_extensions
            .iter()
            .map(|ext| format!(".{ext}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Download naming rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub prefix: String,
    pub suffix: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            prefix: "monk_removed_bg_".to_string(),
            suffix: String::new(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub theme: ThemeConfig,
    pub model: ModelConfig,
    pub upload: UploadConfig,
    pub download: DownloadConfig,
}

impl AppConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::new()
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| BgRemovalError::invalid_config(format!("Malformed configuration: {e}")))
    }

    /// Load a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| BgRemovalError::file_io_error("read configuration file", path, &e))?;
        Self::from_json_str(&content)
    }

    /// Validate every section
    ///
    /// # Errors
    /// - Port 0 or upload limit outside 1-1024 MB
    /// - Theme colors that are not `#rgb` / `#rrggbb`
    /// - Empty accepted extension list
    /// - Path separators inside the download prefix or suffix
    /// - Model URL that is not http(s) for backends that need a model
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(BgRemovalError::config_value_error("port", 0, "1-65535"));
        }
        if !(1..=1024).contains(&self.server.max_upload_mb) {
            return Err(BgRemovalError::config_value_error(
                "max_upload_mb",
                self.server.max_upload_mb,
                "1-1024",
            ));
        }

        for (name, color) in [
            ("primary_color", &self.theme.primary_color),
            ("secondary_color", &self.theme.secondary_color),
            ("accent_color", &self.theme.accent_color),
        ] {
            if !is_hex_color(color) {
                return Err(BgRemovalError::invalid_config(format!(
                    "{name} must be a #rgb or #rrggbb color, got '{color}'"
                )));
            }
        }

        if self.upload.accepted_extensions.is_empty() {
            return Err(BgRemovalError::invalid_config(
                "At least one accepted upload extension is required",
            ));
        }

        for part in [&self.download.prefix, &self.download.suffix] {
            if part.contains(['/', '\\']) {
                return Err(BgRemovalError::invalid_config(format!(
                    "Download prefix/suffix must not contain path separators: '{part}'"
                )));
            }
        }

        if self.model.backend.requires_model() && self.model.model_path.is_none() {
            crate::download::validate_model_url(&self.model.model_url)?;
        }

        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    value.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}

/// Builder for [`AppConfig`]
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration (e.g. loaded from a file)
    #[must_use]
    pub fn from_config(config: AppConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.server.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    #[must_use]
    pub fn max_upload_mb(mut self, megabytes: u64) -> Self {
        self.config.server.max_upload_mb = megabytes;
        self
    }

    #[must_use]
    pub fn backend(mut self, backend: BackendType) -> Self {
        self.config.model.backend = backend;
        self
    }

    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.model.execution_provider = provider;
        self
    }

    #[must_use]
    pub fn model_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.model.model_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn model_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.model.model_url = url.into();
        self
    }

    #[must_use]
    pub fn cache_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.model.cache_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.config.model.intra_threads = threads;
        self
    }

    #[must_use]
    pub fn theme(mut self, theme: ThemeConfig) -> Self {
        self.config.theme = theme;
        self
    }

    #[must_use]
    pub fn download_naming<S: Into<String>>(mut self, prefix: S, suffix: S) -> Self {
        self.config.download.prefix = prefix.into();
        self.config.download.suffix = suffix.into();
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// Returns `BgRemovalError::InvalidConfig` when validation fails
    pub fn build(self) -> Result<AppConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
