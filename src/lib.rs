#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! # Monk Background Remover
//!
//! Upload an image, remove its background with a U²-Net salient object
//! segmentation model, download the transparent PNG.
//!
//! The crate is organized in three layers:
//!
//! - **Image codec adapter** ([`remove_background`], [`services::ImageCodec`]):
//!   encodes a raster to PNG, hands it to a [`Segmenter`], decodes the answer
//!   and guarantees an alpha channel.
//! - **Segmentation capability** ([`Segmenter`], [`ModelSegmenter`],
//!   [`InferenceBackend`]): bytes in, PNG bytes out. Backends are ONNX Runtime
//!   (`onnx` feature), Tract (`tract` feature) and a model-free mock.
//! - **Presentation shell** (`web` feature) and the `monk` binary (`cli`
//!   feature).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use monk_bgremove::{config::ModelConfig, BackgroundRemovalProcessor};
//!
//! # fn example() -> anyhow::Result<()> {
//! let processor = BackgroundRemovalProcessor::new(&ModelConfig::default())?;
//! let image = image::open("portrait.jpg")?;
//! let cutout = processor.remove_background(&image)?;
//! cutout.save("portrait.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `onnx` (default): ONNX Runtime backend with CUDA / `CoreML` support
//! - `tract`: pure Rust backend
//! - `web` (default): axum HTTP shell
//! - `cli` (default): the `monk` binary, progress bars and subscriber setup
//! - `tracing-json`: JSON log output
//! - `webp-support`: accept WebP uploads

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod inference;
pub mod models;
pub mod processor;
pub mod segmenter;
pub mod services;
pub mod tracing_config;
pub mod types;
pub mod utils;
#[cfg(feature = "web")]
pub mod web;

pub use backends::MockBackend;
#[cfg(feature = "onnx")]
pub use backends::OnnxBackend;
#[cfg(feature = "tract")]
pub use backends::TractBackend;
pub use config::{AppConfig, AppConfigBuilder, BackendType, ExecutionProvider, ModelConfig};
pub use download::{validate_model_url, ModelDownloader};
pub use error::{BgRemovalError, FailureKind, Result};
pub use inference::InferenceBackend;
pub use models::{ModelInfo, ModelManager, PreprocessingConfig};
pub use processor::{
    remove_background, BackendFactory, BackgroundRemovalProcessor, DefaultBackendFactory,
    ProcessedImage,
};
pub use segmenter::{ModelSegmenter, Segmenter};
pub use services::{DownloadNamer, ImageCodec};
pub use types::SegmentationMask;
