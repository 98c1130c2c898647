//! End-to-end behavior of the image codec adapter
//!
//! Runs real images through `remove_background` with the mock segmenter and
//! with small hand-written segmenters that misbehave in specific ways.

mod common;

use common::{mock_processor, png_bytes, red_square_on_white};
use image::{DynamicImage, GenericImageView, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use monk_bgremove::{
    error::{BgRemovalError, FailureKind, Result},
    remove_background, ImageCodec, Segmenter,
};

/// Answers with a fixed byte string regardless of the input
struct Canned(Vec<u8>);

impl Segmenter for Canned {
    fn segment(&self, _encoded: &[u8]) -> Result<Vec<u8>> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "canned"
    }
}

/// Always fails with an inference error
struct Broken;

impl Segmenter for Broken {
    fn segment(&self, _encoded: &[u8]) -> Result<Vec<u8>> {
        Err(BgRemovalError::inference("model exploded"))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Resampling to and from the model input leaves a soft edge around the
/// subject; pixels this close to the square's border are not checked.
const EDGE_TOLERANCE: u32 = 8;

#[test]
fn test_red_square_keeps_foreground_and_drops_background() -> Result<()> {
    let (canvas, square) = (240, 100);
    let input = red_square_on_white(canvas, square);
    let processor = mock_processor();

    let output = processor.remove_background(&input)?;
    assert_eq!(output.dimensions(), (canvas, canvas));

    let start = (canvas - square) / 2;
    let end = start + square;
    // Distance outside (positive) or inside (negative) the square, per axis maximum
    let signed_distance = |x: u32, y: u32| -> i64 {
        let axis = |v: u32| -> i64 {
            let (v, start, end) = (i64::from(v), i64::from(start), i64::from(end) - 1);
            (start - v).max(v - end)
        };
        axis(x).max(axis(y))
    };
    let tolerance = i64::from(EDGE_TOLERANCE);

    let mut background_checked = 0;
    let mut foreground_checked = 0;
    for (x, y, pixel) in output.enumerate_pixels() {
        let distance = signed_distance(x, y);
        if distance > tolerance {
            assert_eq!(pixel[3], 0, "background at ({x}, {y}) should be transparent");
            background_checked += 1;
        } else if distance < -tolerance {
            assert!(pixel[3] > 0, "square at ({x}, {y}) should stay visible");
            foreground_checked += 1;
        }
    }
    assert!(background_checked > 0 && foreground_checked > 0);
    Ok(())
}

#[test]
fn test_single_pixel_image() -> Result<()> {
    let input = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([10, 200, 30])));
    let processor = mock_processor();

    let output = processor.remove_background(&input)?;

    assert_eq!(output.dimensions(), (1, 1));
    assert_eq!(output.as_raw().len(), 4);
    Ok(())
}

#[test]
fn test_same_input_gives_identical_bytes() -> Result<()> {
    let bytes = png_bytes(&red_square_on_white(96, 40));
    let processor = mock_processor();

    let first = processor.process_bytes(&bytes)?;
    let second = processor.process_bytes(&bytes)?;

    assert_eq!(first.png, second.png);
    assert_eq!(first.result, second.result);
    Ok(())
}

#[test]
fn test_input_image_is_not_modified() -> Result<()> {
    let input = red_square_on_white(64, 20);
    let snapshot = input.clone();

    let _ = mock_processor().remove_background(&input)?;

    assert_eq!(input, snapshot);
    Ok(())
}

#[test]
fn test_output_always_has_alpha() -> Result<()> {
    // Segmenter hands back an opaque RGB image
    let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])));
    let output = remove_background(&red_square_on_white(8, 2), &Canned(png_bytes(&rgb)))?;
    assert_eq!(output.dimensions(), (3, 2));
    assert!(output.pixels().all(|p| *p == Rgba([1, 2, 3, 255])));

    // Grayscale output is widened too
    let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([77])));
    let output = remove_background(&red_square_on_white(8, 2), &Canned(png_bytes(&gray)))?;
    assert!(output.pixels().all(|p| *p == Rgba([77, 77, 77, 255])));
    Ok(())
}

#[test]
fn test_segmenter_dimensions_are_not_corrected() -> Result<()> {
    let smaller = DynamicImage::ImageRgba8(RgbaImage::new(5, 7));
    let output = remove_background(&red_square_on_white(50, 10), &Canned(png_bytes(&smaller)))?;
    assert_eq!(output.dimensions(), (5, 7));
    Ok(())
}

#[test]
fn test_ensure_alpha_is_idempotent() {
    let rgba = ImageCodec::ensure_alpha(&red_square_on_white(16, 4));
    let again = ImageCodec::ensure_alpha(&DynamicImage::ImageRgba8(rgba.clone()));
    assert_eq!(rgba, again);
}

#[test]
fn test_png_preserves_pixels() -> Result<()> {
    let rgba = RgbaImage::from_fn(9, 4, |x, y| Rgba([x as u8 * 20, y as u8 * 50, 7, (x * y) as u8]));
    let decoded = ImageCodec::decode(&png_bytes(&DynamicImage::ImageRgba8(rgba.clone())))?;
    assert_eq!(decoded.to_rgba8(), rgba);
    Ok(())
}

#[test]
fn test_undecodable_segmenter_output() {
    let err = remove_background(&red_square_on_white(8, 2), &Canned(b"definitely not an image".to_vec()))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Decode);
}

#[test]
fn test_segmenter_failure_is_propagated() {
    let err = remove_background(&red_square_on_white(8, 2), &Broken).unwrap_err();
    assert!(matches!(err, BgRemovalError::Inference(_)));
    assert_eq!(err.kind(), FailureKind::Processing);
}

#[test]
fn test_garbage_upload_is_a_decode_failure() {
    let err = mock_processor().process_bytes(b"GIF89a? no, just text").unwrap_err();
    assert_eq!(err.kind(), FailureKind::Decode);
}

#[test]
fn test_process_file_reads_from_disk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("square.png");
    red_square_on_white(32, 12).save(&path).map_err(|e| BgRemovalError::encode(e.to_string()))?;

    let processed = mock_processor().process_file(&path)?;

    assert_eq!(processed.original.dimensions(), (32, 32));
    assert_eq!(processed.result.dimensions(), (32, 32));
    assert_eq!(ImageCodec::decode(&processed.png)?.to_rgba8(), processed.result);
    Ok(())
}

#[test]
fn test_missing_file() {
    let err = mock_processor()
        .process_file("/definitely/not/here.png")
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Processing);
}
