//! Background removal processor
//!
//! Provides the image-level adapter around a byte-level [`Segmenter`] and the
//! `BackgroundRemovalProcessor` shared by the CLI and the web shell.

use crate::{
    backends::MockBackend,
    config::{BackendType, ModelConfig},
    error::{BgRemovalError, Result},
    inference::InferenceBackend,
    models::ModelManager,
    segmenter::{ModelSegmenter, Segmenter},
    services::ImageCodec,
};
use image::{DynamicImage, RgbaImage};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Remove the background from an image using the given segmenter
///
/// Encodes `image` as PNG, hands the bytes to `segmenter`, decodes what comes
/// back and normalizes it to RGBA. The input is never modified and no resizing
/// happens here: the output has whatever dimensions the segmenter returned.
///
/// # Errors
/// - `image` cannot be encoded
/// - The segmenter fails
/// - The segmenter output cannot be decoded
pub fn remove_background(image: &DynamicImage, segmenter: &dyn Segmenter) -> Result<RgbaImage> {
    let encoded = ImageCodec::encode_png(image)?;
    let segmented = segmenter.segment(&encoded)?;
    let decoded = ImageCodec::decode(&segmented)?;
    Ok(ImageCodec::ensure_alpha(&decoded))
}

/// Factory trait for creating inference backends
pub trait BackendFactory: Send + Sync {
    /// Create a backend instance of the specified type with the given model manager
    ///
    /// # Errors
    /// - Backend type not compiled into this build
    fn create_backend(
        &self,
        backend_type: BackendType,
        model_manager: ModelManager,
    ) -> Result<Box<dyn InferenceBackend>>;

    /// List available backend types
    fn available_backends(&self) -> Vec<BackendType>;
}

/// Backend factory for the backends enabled by cargo features
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    fn create_backend(
        &self,
        backend_type: BackendType,
        model_manager: ModelManager,
    ) -> Result<Box<dyn InferenceBackend>> {
        match backend_type {
            #[cfg(feature = "onnx")]
            BackendType::Onnx => Ok(Box::new(crate::backends::OnnxBackend::new(model_manager))),
            #[cfg(feature = "tract")]
            BackendType::Tract => Ok(Box::new(crate::backends::TractBackend::new(model_manager))),
            BackendType::Mock => {
                drop(model_manager);
                Ok(Box::new(MockBackend::new()))
            },
            #[allow(unreachable_patterns)]
            other => {
                drop(model_manager);
                Err(BgRemovalError::invalid_config(format!(
                    "Backend '{other}' is not available in this build (enable the '{other}' feature)"
                )))
            },
        }
    }

    fn available_backends(&self) -> Vec<BackendType> {
        let mut backends = Vec::new();
        #[cfg(feature = "onnx")]
        backends.push(BackendType::Onnx);
        #[cfg(feature = "tract")]
        backends.push(BackendType::Tract);
        backends.push(BackendType::Mock);
        backends
    }
}

/// Outcome of processing one uploaded image
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// The decoded upload, normalized to RGB
    pub original: DynamicImage,
    /// Background-removed image
    pub result: RgbaImage,
    /// `result` encoded as PNG
    pub png: Vec<u8>,
}

/// Background removal processor shared by every frontend
///
/// Cheap to clone; clones share the same segmenter.
#[derive(Clone)]
pub struct BackgroundRemovalProcessor {
    segmenter: Arc<dyn Segmenter>,
}

impl std::fmt::Debug for BackgroundRemovalProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundRemovalProcessor")
            .field("segmenter", &self.segmenter.name())
            .finish()
    }
}

impl BackgroundRemovalProcessor {
    /// Create a processor with the default backend factory
    ///
    /// The model is not loaded until the first image is processed.
    ///
    /// # Errors
    /// - Configured backend not available in this build
    pub fn new(config: &ModelConfig) -> Result<Self> {
        Self::with_factory(config, &DefaultBackendFactory)
    }

    /// Create a processor with a custom backend factory
    ///
    /// # Errors
    /// - Backend creation failures reported by the factory
    pub fn with_factory(config: &ModelConfig, factory: &dyn BackendFactory) -> Result<Self> {
        let model_manager = ModelManager::from_config(config);
        let backend = factory.create_backend(config.backend, model_manager)?;
        let segmenter = ModelSegmenter::new(backend, config.clone());
        info!(segmenter = %segmenter.name(), "Background removal processor created");
        Ok(Self::with_segmenter(Arc::new(segmenter)))
    }

    /// Create a processor around an existing segmenter
    #[must_use]
    pub fn with_segmenter(segmenter: Arc<dyn Segmenter>) -> Self {
        Self { segmenter }
    }

    /// Name of the segmenter in use
    #[must_use]
    pub fn segmenter_name(&self) -> &str {
        self.segmenter.name()
    }

    /// Remove the background from a decoded image
    ///
    /// # Errors
    /// - Segmentation or codec failures, see [`remove_background`]
    #[instrument(
        skip(self, image),
        fields(
            segmenter = %self.segmenter.name(),
            dimensions = %format!("{}x{}", image.width(), image.height())
        )
    )]
    pub fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage> {
        let start = Instant::now();
        let result = remove_background(image, self.segmenter.as_ref())?;
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            output = %format!("{}x{}", result.width(), result.height()),
            "Background removed"
        );
        Ok(result)
    }

    /// Decode an upload, remove its background and encode the result as PNG
    ///
    /// # Errors
    /// - Upload cannot be decoded
    /// - Segmentation or encoding failures
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub fn process_bytes(&self, bytes: &[u8]) -> Result<ProcessedImage> {
        let original = ImageCodec::to_rgb(&ImageCodec::decode(bytes)?);
        let result = self.remove_background(&original)?;
        let png = ImageCodec::encode_png(&DynamicImage::ImageRgba8(result.clone()))?;

        info!(
            width = original.width(),
            height = original.height(),
            png_bytes = png.len(),
            "Image processed"
        );
        Ok(ProcessedImage {
            original,
            result,
            png,
        })
    }

    /// Read an image file and process it
    ///
    /// # Errors
    /// - File read failures
    /// - Everything [`Self::process_bytes`] can fail with
    pub fn process_file<P: AsRef<Path>>(&self, path: P) -> Result<ProcessedImage> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| BgRemovalError::file_io_error("read input image", path, &e))?;
        self.process_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use image::{Rgb, RgbImage};

    /// Returns its input untouched
    struct PassThrough;

    impl Segmenter for PassThrough {
        fn segment(&self, encoded: &[u8]) -> Result<Vec<u8>> {
            Ok(encoded.to_vec())
        }

        fn name(&self) -> &str {
            "pass-through"
        }
    }

    /// Always fails like a crashed model
    struct Failing;

    impl Segmenter for Failing {
        fn segment(&self, _encoded: &[u8]) -> Result<Vec<u8>> {
            Err(BgRemovalError::inference("model exploded"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn mock_config() -> ModelConfig {
        ModelConfig {
            backend: BackendType::Mock,
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_adapter_adds_alpha() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])));
        let result = remove_background(&image, &PassThrough).unwrap();
        assert_eq!(result.dimensions(), (3, 2));
        assert!(result.pixels().all(|p| p.0 == [1, 2, 3, 255]));
    }

    #[test]
    fn test_adapter_propagates_segmenter_failure() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let err = remove_background(&image, &Failing).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Processing);
        assert!(err.to_string().contains("model exploded"));
    }

    #[test]
    fn test_default_factory_backends() {
        let factory = DefaultBackendFactory;
        let available = factory.available_backends();
        assert!(available.contains(&BackendType::Mock));

        let backend = factory
            .create_backend(BackendType::Mock, ModelManager::from_path("unused.onnx"))
            .unwrap();
        assert!(backend.is_initialized());
    }

    #[test]
    fn test_processor_with_mock_backend() {
        let processor = BackgroundRemovalProcessor::new(&mock_config()).unwrap();
        assert_eq!(processor.segmenter_name(), "mock");

        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([40, 40, 40])));
        let bytes = ImageCodec::encode_png(&image).unwrap();
        let processed = processor.process_bytes(&bytes).unwrap();

        assert_eq!(processed.result.dimensions(), (8, 8));
        assert!(processed.result.pixels().all(|p| p[3] == 0));
        assert_eq!(ImageCodec::decode(&processed.png).unwrap().to_rgba8(), processed.result);
    }

    #[test]
    fn test_process_bytes_rejects_garbage() {
        let processor = BackgroundRemovalProcessor::with_segmenter(Arc::new(PassThrough));
        let err = processor.process_bytes(b"nope").unwrap_err();
        assert_eq!(err.kind(), FailureKind::Decode);
    }

    #[test]
    fn test_process_missing_file() {
        let processor = BackgroundRemovalProcessor::with_segmenter(Arc::new(PassThrough));
        let err = processor.process_file("/no/such/input.png").unwrap_err();
        assert!(err.to_string().contains("read input image"));
    }
}
