//! Segmentation capability
//!
//! A [`Segmenter`] takes encoded image bytes and returns PNG bytes with the
//! background made transparent. [`ModelSegmenter`] implements it on top of an
//! [`InferenceBackend`] running a U²-Net style salient object model.

use crate::{
    config::ModelConfig,
    error::{BgRemovalError, Result},
    inference::InferenceBackend,
    services::ImageCodec,
    types::SegmentationMask,
    utils::ImagePreprocessor,
};
use image::{DynamicImage, GenericImageView};
use ndarray::{Array4, Axis};
use parking_lot::Mutex;
use std::time::Instant;
use tracing::{debug, info, span, Level};

/// Byte-in, byte-out background removal
pub trait Segmenter: Send + Sync {
    /// Remove the background from an encoded image
    ///
    /// Returns PNG bytes of an RGBA image whose background pixels are fully
    /// transparent.
    ///
    /// # Errors
    /// - Input bytes are not a decodable image
    /// - Model loading or inference failures
    fn segment(&self, encoded: &[u8]) -> Result<Vec<u8>>;

    /// Short human-readable identifier, e.g. `onnx:u2net`
    fn name(&self) -> &str;
}

/// Segmenter backed by an inference backend
///
/// The backend is serialized behind a mutex and initialized on first use, so
/// the first request pays the model loading cost.
pub struct ModelSegmenter {
    backend: Mutex<Box<dyn InferenceBackend>>,
    config: ModelConfig,
    name: String,
}

impl std::fmt::Debug for ModelSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSegmenter")
            .field("name", &self.name)
            .field("backend", &self.config.backend)
            .finish_non_exhaustive()
    }
}

impl ModelSegmenter {
    /// Wrap a backend; `config` is passed to the backend when it initializes
    #[must_use]
    pub fn new(backend: Box<dyn InferenceBackend>, config: ModelConfig) -> Self {
        let model_name = config
            .resolved_model_path()
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string);
        let name = match (config.backend.requires_model(), model_name) {
            (true, Some(model)) => format!("{}:{model}", config.backend),
            _ => config.backend.to_string(),
        };

        Self {
            backend: Mutex::new(backend),
            config,
            name,
        }
    }

    /// Whether the wrapped backend has loaded its model
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.backend.lock().is_initialized()
    }

    /// Run the full pipeline on a decoded image and return the cut-out
    fn segment_image(&self, image: &DynamicImage) -> Result<image::RgbaImage> {
        let original_dimensions = image.dimensions();

        let output_tensor = {
            let mut backend = self.backend.lock();
            if !backend.is_initialized() {
                if let Some(load_time) = backend.initialize(&self.config)? {
                    info!(
                        segmenter = %self.name,
                        load_ms = load_time.as_millis() as u64,
                        "Model loaded"
                    );
                }
            }

            let input_tensor = {
                let _span = span!(
                    Level::DEBUG,
                    "preprocessing",
                    width = original_dimensions.0,
                    height = original_dimensions.1
                )
                .entered();
                ImagePreprocessor::preprocess_for_inference(
                    image,
                    &backend.get_preprocessing_config(),
                )?
            };

            let _span = span!(Level::INFO, "inference", segmenter = %self.name).entered();
            let inference_start = Instant::now();
            let output = backend.infer(&input_tensor)?;
            debug!(
                inference_ms = inference_start.elapsed().as_millis() as u64,
                "Inference finished"
            );
            output
        };

        let _span = span!(Level::DEBUG, "postprocessing").entered();
        let mask = tensor_to_mask(&output_tensor)?
            .resize(original_dimensions.0, original_dimensions.1)?;
        debug!(foreground_ratio = mask.foreground_ratio(), "Mask ready");

        mask.cutout(&image.to_rgba8())
    }
}

impl Segmenter for ModelSegmenter {
    fn segment(&self, encoded: &[u8]) -> Result<Vec<u8>> {
        let image = ImageCodec::decode(encoded)?;
        let cutout = self.segment_image(&image)?;
        ImageCodec::encode_png(&DynamicImage::ImageRgba8(cutout))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Convert the first output channel into an 8-bit mask
///
/// Values are min-max normalized; a constant prediction is clamped to `0..=1`
/// instead.
fn tensor_to_mask(tensor: &Array4<f32>) -> Result<SegmentationMask> {
    let (batch, channels, height, width) = tensor.dim();
    if batch == 0 || channels == 0 {
        return Err(BgRemovalError::processing(format!(
            "Invalid output tensor shape {:?}",
            tensor.shape()
        )));
    }
    let dimensions = (
        u32::try_from(width).map_err(|_| BgRemovalError::processing("Mask width too large"))?,
        u32::try_from(height).map_err(|_| BgRemovalError::processing("Mask height too large"))?,
    );

    let prediction = tensor.index_axis(Axis(0), 0);
    let prediction = prediction.index_axis(Axis(0), 0);

    let (min, max) = prediction
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;

    let data = prediction
        .iter()
        .map(|&v| {
            let scaled = if range > f32::EPSILON { (v - min) / range } else { v };
            (scaled.clamp(0.0, 1.0) * 255.0) as u8
        })
        .collect();

    Ok(SegmentationMask::new(data, dimensions))
}
