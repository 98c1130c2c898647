//! Core types shared by the segmentation pipeline

use crate::error::{BgRemovalError, Result};
use image::{GrayImage, RgbaImage};

/// Segmentation mask produced by a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    /// Mask data as grayscale values (0-255), row-major
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a new segmentation mask
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Create mask from a grayscale image
    #[must_use]
    pub fn from_image(image: &GrayImage) -> Self {
        Self::new(image.as_raw().clone(), image.dimensions())
    }

    /// Convert mask to a grayscale image
    pub fn to_image(&self) -> Result<GrayImage> {
        let (width, height) = self.dimensions;
        GrayImage::from_raw(width, height, self.data.clone())
            .ok_or_else(|| BgRemovalError::processing("Failed to create image from mask data"))
    }

    /// Resize the mask to new dimensions
    pub fn resize(&self, new_width: u32, new_height: u32) -> Result<SegmentationMask> {
        if self.dimensions == (new_width, new_height) {
            return Ok(self.clone());
        }
        let current_image = self.to_image()?;
        let resized = image::imageops::resize(
            &current_image,
            new_width,
            new_height,
            image::imageops::FilterType::Lanczos3,
        );

        Ok(SegmentationMask::from_image(&resized))
    }

    /// Composite `image` over a fully transparent canvas using the mask
    ///
    /// Every channel, alpha included, is scaled by `mask / 255`, so background
    /// pixels end up as `[0, 0, 0, 0]`.
    pub fn cutout(&self, image: &RgbaImage) -> Result<RgbaImage> {
        if image.dimensions() != self.dimensions {
            return Err(BgRemovalError::processing(format!(
                "Image and mask dimensions do not match: {:?} vs {:?}",
                image.dimensions(),
                self.dimensions
            )));
        }

        let mut result = image.clone();
        for (pixel, &mask_value) in result.pixels_mut().zip(self.data.iter()) {
            let weight = u16::from(mask_value);
            for channel in &mut pixel.0 {
                *channel = ((u16::from(*channel) * weight + 127) / 255) as u8;
            }
        }

        Ok(result)
    }

    /// Share of pixels classified as foreground (> 127)
    #[must_use]
    pub fn foreground_ratio(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let foreground = self.data.iter().filter(|&&x| x > 127).count();
        foreground as f32 / self.data.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_mask_image_conversion() {
        let mask = SegmentationMask::new(vec![0, 64, 128, 255], (2, 2));
        let image = mask.to_image().unwrap();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(SegmentationMask::from_image(&image), mask);
    }

    #[test]
    fn test_mask_with_wrong_length_fails() {
        let mask = SegmentationMask::new(vec![0; 3], (2, 2));
        assert!(mask.to_image().is_err());
    }

    #[test]
    fn test_resize_keeps_constant_masks_constant() {
        let mask = SegmentationMask::new(vec![255; 16], (4, 4));
        let resized = mask.resize(9, 7).unwrap();
        assert_eq!(resized.dimensions, (9, 7));
        assert!(resized.data.iter().all(|&v| v == 255));

        let empty = SegmentationMask::new(vec![0; 16], (4, 4));
        assert!(empty.resize(3, 3).unwrap().data.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_cutout_scales_all_channels() {
        let image = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([200, 100, 50, 255])
            } else {
                Rgba([10, 20, 30, 255])
            }
        });
        let mask = SegmentationMask::new(vec![255, 0], (2, 1));

        let result = mask.cutout(&image).unwrap();
        assert_eq!(result.get_pixel(0, 0), &Rgba([200, 100, 50, 255]));
        assert_eq!(result.get_pixel(1, 0), &Rgba([0, 0, 0, 0]));

        let half = SegmentationMask::new(vec![128, 128], (2, 1));
        let result = half.cutout(&image).unwrap();
        assert_eq!(result.get_pixel(0, 0)[3], 128);
    }

    #[test]
    fn test_cutout_dimension_mismatch() {
        let image = RgbaImage::new(3, 3);
        let mask = SegmentationMask::new(vec![0; 4], (2, 2));
        assert!(mask.cutout(&image).is_err());
    }

    #[test]
    fn test_foreground_ratio() {
        let mask = SegmentationMask::new(vec![0, 255, 255, 100], (2, 2));
        assert!((mask.foreground_ratio() - 0.5).abs() < f32::EPSILON);
        assert!(SegmentationMask::new(Vec::new(), (0, 0)).foreground_ratio().abs() < f32::EPSILON);
    }
}
