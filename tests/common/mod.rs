//! Shared helpers for the integration tests

#![allow(dead_code)]

use image::{DynamicImage, Rgb, RgbImage};
use monk_bgremove::{
    config::{BackendType, ModelConfig},
    BackgroundRemovalProcessor, ImageCodec,
};

pub const RED: Rgb<u8> = Rgb([220, 20, 20]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Processor backed by the model-free mock segmenter
pub fn mock_processor() -> BackgroundRemovalProcessor {
    let config = ModelConfig {
        backend: BackendType::Mock,
        ..ModelConfig::default()
    };
    BackgroundRemovalProcessor::new(&config).expect("mock backend is always available")
}

/// A `square`x`square` red block centered on a white `canvas`x`canvas` image
pub fn red_square_on_white(canvas: u32, square: u32) -> DynamicImage {
    let offset = (canvas - square) / 2;
    let image = RgbImage::from_fn(canvas, canvas, |x, y| {
        let inside = (offset..offset + square).contains(&x) && (offset..offset + square).contains(&y);
        if inside {
            RED
        } else {
            WHITE
        }
    });
    DynamicImage::ImageRgb8(image)
}

/// PNG encoding of `image`
pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    ImageCodec::encode_png(image).expect("PNG encoding of an in-memory image")
}
