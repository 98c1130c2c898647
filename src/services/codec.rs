//! Image encoding and decoding service
//!
//! Bridges in-memory rasters and the encoded bytes the segmentation capability
//! consumes and produces.

use crate::error::{BgRemovalError, Result};
use image::{DynamicImage, ImageError, ImageFormat, RgbaImage};
use std::borrow::Cow;
use std::io::Cursor;

/// Service for converting between images and encoded bytes
pub struct ImageCodec;

impl ImageCodec {
    /// Encode an image as PNG
    ///
    /// Floating point color models PNG cannot store are converted to 16 bits
    /// per channel first.
    ///
    /// # Errors
    /// - PNG encoder failures
    pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
        let encodable: Cow<'_, DynamicImage> = match image {
            DynamicImage::ImageRgb32F(_) => Cow::Owned(DynamicImage::ImageRgb16(image.to_rgb16())),
            DynamicImage::ImageRgba32F(_) => {
                Cow::Owned(DynamicImage::ImageRgba16(image.to_rgba16()))
            },
            _ => Cow::Borrowed(image),
        };

        let mut buffer = Vec::new();
        encodable
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| BgRemovalError::encode(format!("Failed to encode PNG: {e}")))?;
        Ok(buffer)
    }

    /// Decode an image, sniffing the container format from its content
    ///
    /// # Errors
    /// - Empty input
    /// - Unrecognized or unsupported container
    /// - Corrupt image data
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(BgRemovalError::decode("Image data is empty"));
        }

        image::load_from_memory(bytes).map_err(|e| match e {
            ImageError::Unsupported(inner) => BgRemovalError::unsupported_format(inner.to_string()),
            other => BgRemovalError::decode(other.to_string()),
        })
    }

    /// Guarantee an alpha channel
    ///
    /// Idempotent: an RGBA8 image comes back pixel-for-pixel unchanged.
    #[must_use]
    pub fn ensure_alpha(image: &DynamicImage) -> RgbaImage {
        match image {
            DynamicImage::ImageRgba8(rgba) => rgba.clone(),
            other => other.to_rgba8(),
        }
    }

    /// Normalize to three-channel 8-bit color, dropping any alpha
    #[must_use]
    pub fn to_rgb(image: &DynamicImage) -> DynamicImage {
        DynamicImage::ImageRgb8(image.to_rgb8())
    }

    /// MIME type of encoded image bytes, for inline display
    #[must_use]
    pub fn guess_mime(bytes: &[u8]) -> &'static str {
        image::guess_format(bytes).map_or("application/octet-stream", |format| {
            format.to_mime_type()
        })
    }
}
