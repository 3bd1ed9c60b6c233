//! Preview generation for cropped results.
//!
//! Scales a result and encodes it as a base64 JPEG so a presentation layer
//! can show it without touching the full-resolution buffer.

use super::error::ExportError;
use super::types::CroppedResult;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{ImageBuffer, Rgba, RgbaImage};

/// Maximum preview width in pixels.
pub const PREVIEW_MAX_WIDTH: u32 = 400;

/// Maximum preview height in pixels.
pub const PREVIEW_MAX_HEIGHT: u32 = 300;

/// JPEG quality for previews (0-100).
const PREVIEW_JPEG_QUALITY: u8 = 75;

/// Convert BGRA pixel data into an RGBA image buffer.
pub fn bgra_to_rgba_image(data: &[u8], width: u32, height: u32) -> Result<RgbaImage, ExportError> {
    let expected = width as usize * height as usize * 4;
    if data.len() < expected {
        return Err(ExportError::Image(format!(
            "Buffer too small: expected {} bytes, got {}",
            expected,
            data.len()
        )));
    }

    let mut rgba_data = Vec::with_capacity(expected);
    for chunk in data[..expected].chunks_exact(4) {
        rgba_data.extend_from_slice(&[chunk[2], chunk[1], chunk[0], chunk[3]]);
    }

    ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(width, height, rgba_data)
        .ok_or_else(|| ExportError::Image("Failed to create image buffer".to_string()))
}

/// Encode a scaled-down JPEG preview of `result` as base64.
///
/// Returns `(base64, width, height)` of the encoded preview.
pub fn preview_jpeg_base64(
    result: &CroppedResult,
    max_width: u32,
    max_height: u32,
) -> Result<(String, u32, u32), ExportError> {
    let img = bgra_to_rgba_image(&result.data, result.width, result.height)?;
    let (scaled_width, scaled_height) =
        calculate_scaled_dimensions(result.width, result.height, max_width, max_height);

    let resized = image::imageops::resize(
        &img,
        scaled_width,
        scaled_height,
        image::imageops::FilterType::Triangle,
    );
    let rgb_img = image::DynamicImage::ImageRgba8(resized).to_rgb8();

    let mut jpeg_bytes: Vec<u8> = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg_bytes, PREVIEW_JPEG_QUALITY);
    encoder.encode_image(&rgb_img)?;

    Ok((STANDARD.encode(&jpeg_bytes), scaled_width, scaled_height))
}

/// Calculate scaled dimensions that fit within max bounds while preserving aspect ratio.
pub fn calculate_scaled_dimensions(
    width: u32,
    height: u32,
    max_width: u32,
    max_height: u32,
) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (max_width.max(1), max_height.max(1));
    }

    let width_ratio = max_width as f64 / width as f64;
    let height_ratio = max_height as f64 / height as f64;
    let scale = width_ratio.min(height_ratio).min(1.0); // Don't upscale

    let scaled_width = ((width as f64) * scale).round() as u32;
    let scaled_height = ((height as f64) * scale).round() as u32;

    (scaled_width.max(1), scaled_height.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camscan_common::ImageOrientation;

    #[test]
    fn test_calculate_scaled_dimensions_portrait_capture() {
        // 3024x4032 -> max 400x300, limited by height
        let (w, h) = calculate_scaled_dimensions(3024, 4032, 400, 300);
        assert_eq!(w, 225);
        assert_eq!(h, 300);
    }

    #[test]
    fn test_calculate_scaled_dimensions_no_upscale() {
        let (w, h) = calculate_scaled_dimensions(120, 80, 400, 300);
        assert_eq!((w, h), (120, 80));
    }

    #[test]
    fn test_bgra_to_rgba_swaps_channels() {
        let img = bgra_to_rgba_image(&[10, 20, 30, 255], 1, 1).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [30, 20, 10, 255]);
    }

    #[test]
    fn test_bgra_to_rgba_rejects_short_buffer() {
        assert!(bgra_to_rgba_image(&[0, 0, 0], 1, 1).is_err());
    }

    #[test]
    fn test_preview_jpeg_base64() {
        let result = CroppedResult {
            width: 800,
            height: 600,
            data: vec![128u8; 800 * 600 * 4],
            orientation: ImageOrientation::Up,
            crop_rect: None,
        };

        let (encoded, w, h) =
            preview_jpeg_base64(&result, PREVIEW_MAX_WIDTH, PREVIEW_MAX_HEIGHT).unwrap();
        assert!(!encoded.is_empty());
        assert_eq!((w, h), (400, 300));
    }
}
