//! Image preprocessing for segmentation models
//!
//! U²-Net-style input preparation: the image is stretched (aspect ratio is not
//! preserved) to the model input size, scaled by its own brightest channel
//! value, then normalized per channel with the model's mean and std.

use crate::{
    error::{BgRemovalError, Result},
    models::PreprocessingConfig,
};
use image::{imageops::FilterType, DynamicImage, RgbImage};
use ndarray::Array4;

/// Lower bound for the max-normalization divisor, keeps all-black images finite
const MIN_DIVISOR: f32 = 1e-6;

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Preprocess an image into an NCHW tensor for model inference
    ///
    /// # Errors
    /// - Zero-sized input image
    /// - Zero-sized target size in the preprocessing config
    pub fn preprocess_for_inference(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
    ) -> Result<Array4<f32>> {
        let [target_width, target_height] = preprocessing_config.target_size;
        if target_width == 0 || target_height == 0 {
            return Err(BgRemovalError::invalid_config(
                "Model target size must be non-zero",
            ));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(BgRemovalError::processing("Cannot preprocess an empty image"));
        }

        let resized = image::imageops::resize(
            &image.to_rgb8(),
            target_width,
            target_height,
            FilterType::Lanczos3,
        );

        Ok(Self::canvas_to_tensor(&resized, preprocessing_config))
    }

    /// Convert a resized RGB canvas to a normalized tensor
    fn canvas_to_tensor(canvas: &RgbImage, preprocessing_config: &PreprocessingConfig) -> Array4<f32> {
        let (width, height) = canvas.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        let max_value = canvas.as_raw().iter().copied().max().unwrap_or(0);
        let divisor = f32::from(max_value).max(MIN_DIVISOR);
        let mean = preprocessing_config.normalization_mean;
        let std = preprocessing_config.normalization_std;

        for (x, y, pixel) in canvas.enumerate_pixels() {
            for c in 0..3 {
                if let Some(elem) = tensor.get_mut([0, c, y as usize, x as usize]) {
                    *elem = (f32::from(pixel[c]) / divisor - mean[c]) / std[c];
                }
            }
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn red_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 0, 0])))
    }

    #[test]
    fn test_stretch_to_target_size() {
        let config = PreprocessingConfig::default();
        let tensor = ImagePreprocessor::preprocess_for_inference(&red_image(100, 40), &config)
            .unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 320, 320]);
    }

    #[test]
    fn test_normalization_values() {
        let config = PreprocessingConfig {
            target_size: [4, 4],
            ..PreprocessingConfig::default()
        };
        let tensor =
            ImagePreprocessor::preprocess_for_inference(&red_image(4, 4), &config).unwrap();

        let expected_r = (1.0 - config.normalization_mean[0]) / config.normalization_std[0];
        let expected_g = (0.0 - config.normalization_mean[1]) / config.normalization_std[1];
        assert!((tensor[[0, 0, 1, 1]] - expected_r).abs() < 1e-4);
        assert!((tensor[[0, 1, 1, 1]] - expected_g).abs() < 1e-4);
    }

    #[test]
    fn test_dark_image_is_scaled_by_its_max() {
        let config = PreprocessingConfig {
            target_size: [2, 2],
            ..PreprocessingConfig::default()
        };
        let dim = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([10, 10, 10])));
        let tensor = ImagePreprocessor::preprocess_for_inference(&dim, &config).unwrap();

        let expected = (1.0 - config.normalization_mean[2]) / config.normalization_std[2];
        assert!((tensor[[0, 2, 0, 0]] - expected).abs() < 1e-4);

        let black = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let tensor = ImagePreprocessor::preprocess_for_inference(&black, &config).unwrap();
        assert!(tensor.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_rejects_empty_inputs() {
        let config = PreprocessingConfig::default();
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(ImagePreprocessor::preprocess_for_inference(&empty, &config).is_err());

        let zero_target = PreprocessingConfig {
            target_size: [0, 320],
            ..PreprocessingConfig::default()
        };
        assert!(ImagePreprocessor::preprocess_for_inference(&red_image(2, 2), &zero_target).is_err());
    }
}
