//! Model file management
//!
//! Resolves where the segmentation model lives, loads it, and describes the
//! preprocessing it expects.

use crate::config::ModelConfig;
use crate::error::{BgRemovalError, Result};
use std::path::{Path, PathBuf};

/// ImageNet normalization mean used by U²-Net
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet normalization standard deviation used by U²-Net
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// U²-Net input resolution
pub const U2NET_INPUT_SIZE: u32 = 320;

/// Preprocessing parameters a model expects
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingConfig {
    /// Model input size (width, height)
    pub target_size: [u32; 2],
    pub normalization_mean: [f32; 3],
    pub normalization_std: [f32; 3],
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            target_size: [U2NET_INPUT_SIZE, U2NET_INPUT_SIZE],
            normalization_mean: IMAGENET_MEAN,
            normalization_std: IMAGENET_STD,
        }
    }
}

/// Model information and metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub size_bytes: u64,
    pub input_shape: (usize, usize, usize, usize), // NCHW format
    pub output_shape: (usize, usize, usize, usize),
}

/// Locates and loads a model file described by a [`ModelConfig`]
#[derive(Debug, Clone)]
pub struct ModelManager {
    path: PathBuf,
    preprocessing: PreprocessingConfig,
}

impl ModelManager {
    /// Build a manager for the configured model
    #[must_use]
    pub fn from_config(config: &ModelConfig) -> Self {
        Self::from_path(config.resolved_model_path())
    }

    /// Build a manager for an explicit model file
    #[must_use]
    pub fn from_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            preprocessing: PreprocessingConfig::default(),
        }
    }

    /// Location of the model file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the model file is present
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.path.is_file()
    }

    /// Read the model into memory
    ///
    /// # Errors
    /// - Model file missing (suggests running `monk download`)
    /// - File read failures
    pub fn load_model(&self) -> Result<Vec<u8>> {
        if !self.is_available() {
            return Err(BgRemovalError::model(format!(
                "Model file '{}' not found. Run `monk download` or pass --model",
                self.path.display()
            )));
        }
        std::fs::read(&self.path)
            .map_err(|e| BgRemovalError::file_io_error("read model file", &self.path, &e))
    }

    /// Describe the model
    ///
    /// # Errors
    /// - Model file metadata cannot be read
    pub fn get_info(&self) -> Result<ModelInfo> {
        let size_bytes = std::fs::metadata(&self.path)
            .map_err(|e| BgRemovalError::file_io_error("inspect model file", &self.path, &e))?
            .len();
        let name = self
            .path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("model")
            .to_string();
        let [width, height] = self.preprocessing.target_size;

        Ok(ModelInfo {
            name,
            size_bytes,
            input_shape: (1, 3, height as usize, width as usize),
            output_shape: (1, 1, height as usize, width as usize),
        })
    }

    /// Preprocessing parameters for this model
    #[must_use]
    pub fn get_preprocessing_config(&self) -> PreprocessingConfig {
        self.preprocessing.clone()
    }
}
