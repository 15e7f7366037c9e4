use std::io::Cursor;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use image::{ImageBuffer, ImageFormat, Rgba};
use serde::Serialize;

use crate::error::{Error, Result};

/// The result of [`compare`] (spec.md §4.5).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResult {
    #[serde(rename = "match")]
    pub is_match: bool,
    pub diff_pixels: i64,
    pub total_pixels: u64,
    pub diff_percentage: f64,
    pub diff_image_base64: Option<String>,
}

/// Compare two PNG-encoded images, highlighting pixels whose channels differ
/// by more than `threshold` (0.0-1.0, scaled to a 0-255 per-channel delta).
///
/// A match is exactly zero mismatching pixels; `threshold` only controls how
/// large a per-pixel delta counts as a mismatch, not the overall pass bar.
pub fn compare(actual: &[u8], expected: &[u8], threshold: f64) -> Result<CompareResult> {
    let actual_img = image::load_from_memory(actual)
        .map_err(|err| Error::InvalidInput(format!("actual image: {err}")))?
        .to_rgba8();
    let expected_img = image::load_from_memory(expected)
        .map_err(|err| Error::InvalidInput(format!("expected image: {err}")))?
        .to_rgba8();

    let total_pixels = expected_img.width() as u64 * expected_img.height() as u64;
    if actual_img.dimensions() != expected_img.dimensions() {
        return Ok(CompareResult {
            is_match: false,
            diff_pixels: -1,
            total_pixels,
            diff_percentage: 100.0,
            diff_image_base64: None,
        });
    }

    let (width, height) = actual_img.dimensions();
    let threshold_u8 = (threshold.clamp(0.0, 1.0) * 255.0).round() as i64;
    let mut diff_image = ImageBuffer::new(width, height);
    let mut diff_pixels: i64 = 0;

    for (x, y, actual_pixel) in actual_img.enumerate_pixels() {
        let expected_pixel = expected_img.get_pixel(x, y);
        if max_channel_delta(actual_pixel, expected_pixel) > threshold_u8 {
            diff_pixels += 1;
            diff_image.put_pixel(x, y, Rgba([255, 0, 0, 255]));
        } else {
            diff_image.put_pixel(x, y, Rgba([0, 0, 0, 0]));
        }
    }

    let diff_percentage = if total_pixels == 0 {
        0.0
    } else {
        100.0 * diff_pixels as f64 / total_pixels as f64
    };

    Ok(CompareResult {
        is_match: diff_pixels == 0,
        diff_pixels,
        total_pixels,
        diff_percentage,
        diff_image_base64: Some(encode_png_base64(&diff_image)?),
    })
}

fn max_channel_delta(a: &Rgba<u8>, b: &Rgba<u8>) -> i64 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(x, y)| (*x as i64 - *y as i64).abs())
        .max()
        .unwrap_or(0)
}

fn encode_png_base64(image: &ImageBuffer<Rgba<u8>, Vec<u8>>) -> Result<String> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|err| Error::Storage(err.to_string()))?;
    Ok(BASE64.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_png(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
        let image = ImageBuffer::from_pixel(width, height, Rgba(pixel));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn identical_images_match_regardless_of_threshold() {
        let a = solid_png(4, 4, [10, 20, 30, 255]);
        for threshold in [0.0, 0.1, 1.0] {
            let result = compare(&a, &a, threshold).unwrap();
            assert!(result.is_match);
            assert_eq!(result.diff_pixels, 0);
            assert_eq!(result.diff_percentage, 0.0);
        }
    }

    #[test]
    fn dimension_mismatch_short_circuits() {
        let actual = solid_png(4, 4, [0, 0, 0, 255]);
        let expected = solid_png(8, 8, [0, 0, 0, 255]);
        let result = compare(&actual, &expected, 0.1).unwrap();
        assert!(!result.is_match);
        assert_eq!(result.diff_pixels, -1);
        assert_eq!(result.total_pixels, 64);
        assert_eq!(result.diff_percentage, 100.0);
        assert!(result.diff_image_base64.is_none());
    }

    #[test]
    fn fully_different_images_report_all_pixels() {
        let actual = solid_png(2, 2, [0, 0, 0, 255]);
        let expected = solid_png(2, 2, [255, 255, 255, 255]);
        let result = compare(&actual, &expected, 0.1).unwrap();
        assert!(!result.is_match);
        assert_eq!(result.diff_pixels, 4);
        assert_eq!(result.total_pixels, 4);
        assert_eq!(result.diff_percentage, 100.0);
        assert!(result.diff_image_base64.is_some());
    }

    #[test]
    fn small_delta_within_threshold_is_not_a_mismatch() {
        let actual = solid_png(2, 2, [100, 100, 100, 255]);
        let expected = solid_png(2, 2, [105, 105, 105, 255]);
        let result = compare(&actual, &expected, 0.1).unwrap();
        assert!(result.is_match);
        assert_eq!(result.diff_pixels, 0);
    }

    #[test]
    fn delta_beyond_threshold_is_a_mismatch() {
        let actual = solid_png(2, 2, [0, 0, 0, 255]);
        let expected = solid_png(2, 2, [250, 0, 0, 255]);
        let result = compare(&actual, &expected, 0.1).unwrap();
        assert!(!result.is_match);
        assert_eq!(result.diff_pixels, 4);
    }

    #[test]
    fn malformed_png_is_invalid_input() {
        let err = compare(b"not a png", b"also not a png", 0.1).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
