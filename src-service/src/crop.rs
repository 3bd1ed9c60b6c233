//! Viewport crop calculation.
//!
//! Maps the viewport the user saw in the preview onto a pixel rectangle of
//! the captured photo. Two modes are supported:
//!
//! - **Normalized**: a rectangle in the captured frame's [0, 1] space, scaled
//!   by the image size and clamped to its bounds.
//! - **Aspect fill**: the largest centered rectangle with the viewport's
//!   aspect ratio, trimming the longer dimension of the image.
//!
//! Geometry failures never lose the photo: [`apply_viewport`] falls back to
//! the uncropped image and reports why in [`CropOutcome::fallback`].

use crate::capture::{CropError, CroppedResult, RawCapturedImage, BYTES_PER_PIXEL};
use camscan_common::{AspectSize, CropViewport, NormalizedRect, PixelRect};
use tracing::{debug, warn};

/// Result of applying a viewport to a captured image.
#[derive(Debug)]
pub struct CropOutcome {
    pub image: CroppedResult,
    /// Why the image was returned uncropped, if the viewport could not be applied
    pub fallback: Option<CropError>,
}

/// Compute the pixel rectangle for `viewport` inside a `width` x `height` image.
pub fn compute_crop_rect(
    viewport: &CropViewport,
    width: u32,
    height: u32,
) -> Result<PixelRect, CropError> {
    match viewport {
        CropViewport::Normalized(rect) => normalized_to_pixel_rect(rect, width, height),
        CropViewport::AspectFill(target) => aspect_fill_rect(target, width, height),
    }
}

/// Scale a normalized rectangle to pixels, clamped to the image bounds.
///
/// Edges are clamped to `[0, width] x [0, height]` before rounding to the
/// nearest pixel, so the result always lies inside the image.
pub fn normalized_to_pixel_rect(
    rect: &NormalizedRect,
    width: u32,
    height: u32,
) -> Result<PixelRect, CropError> {
    if width == 0 || height == 0 {
        return Err(CropError::DegenerateCrop(format!(
            "source image is {}x{}",
            width, height
        )));
    }

    let values = [rect.x, rect.y, rect.width, rect.height];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(CropError::DegenerateCrop(format!(
            "non-finite rectangle {:?}",
            rect
        )));
    }

    let w = width as f64;
    let h = height as f64;

    let left = (rect.x * w).clamp(0.0, w).round();
    let top = (rect.y * h).clamp(0.0, h).round();
    let right = ((rect.x + rect.width) * w).clamp(0.0, w).round();
    let bottom = ((rect.y + rect.height) * h).clamp(0.0, h).round();

    if right <= left || bottom <= top {
        return Err(CropError::DegenerateCrop(format!(
            "rectangle {:?} has no area inside {}x{}",
            rect, width, height
        )));
    }

    Ok(PixelRect::new(
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    ))
}

/// Largest centered rectangle with the target's aspect ratio.
///
/// When the target is wider than the source the full width is kept and the
/// height is trimmed evenly top and bottom; otherwise the full height is kept
/// and the width is trimmed evenly left and right.
pub fn aspect_fill_rect(
    target: &AspectSize,
    width: u32,
    height: u32,
) -> Result<PixelRect, CropError> {
    let target_ratio = target.ratio().ok_or_else(|| {
        CropError::InvalidViewport(format!(
            "target size {}x{} must be positive",
            target.width, target.height
        ))
    })?;

    if width == 0 || height == 0 {
        return Err(CropError::DegenerateCrop(format!(
            "source image is {}x{}",
            width, height
        )));
    }

    let source_ratio = width as f64 / height as f64;

    if target_ratio > source_ratio {
        let new_height = ((width as f64 / target_ratio).round() as u32).clamp(1, height);
        let y = (height - new_height) / 2;
        Ok(PixelRect::new(0, y, width, new_height))
    } else {
        let new_width = ((height as f64 * target_ratio).round() as u32).clamp(1, width);
        let x = (width - new_width) / 2;
        Ok(PixelRect::new(x, 0, new_width, height))
    }
}

/// Copy a rectangle out of a BGRA buffer.
///
/// # Arguments
/// * `data` - Source BGRA pixel data
/// * `buffer_stride` - Bytes per row in the source buffer (may include padding)
/// * `rect` - Region to copy; must lie inside the source
pub fn crop_frame(data: &[u8], buffer_stride: usize, rect: PixelRect) -> Vec<u8> {
    let output_row_bytes = rect.width as usize * BYTES_PER_PIXEL;
    let mut output = Vec::with_capacity(output_row_bytes * rect.height as usize);

    for row in 0..rect.height {
        let src_start = (rect.y + row) as usize * buffer_stride + rect.x as usize * BYTES_PER_PIXEL;
        let src_end = src_start + output_row_bytes;

        if src_end <= data.len() {
            output.extend_from_slice(&data[src_start..src_end]);
        } else {
            // Fill with black if out of bounds
            output.extend(std::iter::repeat(0u8).take(output_row_bytes));
        }
    }

    output
}

/// Crop `raw` to `viewport`, falling back to the uncropped image on geometry errors.
///
/// Takes ownership of the raw image; with no viewport it is returned as is.
pub fn apply_viewport(raw: RawCapturedImage, viewport: Option<&CropViewport>) -> CropOutcome {
    let Some(viewport) = viewport else {
        return CropOutcome {
            image: CroppedResult::uncropped(raw),
            fallback: None,
        };
    };

    match compute_crop_rect(viewport, raw.width, raw.height) {
        Ok(rect) => {
            debug!(
                "Cropping {}x{} to {}x{} at ({}, {})",
                raw.width, raw.height, rect.width, rect.height, rect.x, rect.y
            );
            let data = crop_frame(&raw.data, raw.stride(), rect);
            CropOutcome {
                image: CroppedResult {
                    width: rect.width,
                    height: rect.height,
                    data,
                    orientation: raw.orientation,
                    crop_rect: Some(rect),
                },
                fallback: None,
            }
        }
        Err(e) => {
            warn!("{}; using uncropped image", e);
            CropOutcome {
                image: CroppedResult::uncropped(raw),
                fallback: Some(e),
            }
        }
    }
}
