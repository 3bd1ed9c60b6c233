//! Runtime image types for capture operations.
//!
//! These hold pixel data and are not serializable. For the shared geometry
//! and state types, see camscan-common.

use super::error::CaptureError;
use camscan_common::{ImageOrientation, PixelRect};
use tokio::sync::oneshot;

/// Bytes per BGRA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// A full-resolution photo as delivered by the device.
#[derive(Clone)]
pub struct RawCapturedImage {
    pub width: u32,
    pub height: u32,
    /// BGRA pixel data, tightly packed rows
    pub data: Vec<u8>,
    pub orientation: ImageOrientation,
}

impl RawCapturedImage {
    /// Create an image, checking that the buffer covers `width * height` pixels.
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        orientation: ImageOrientation,
    ) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() < expected {
            return Err(CaptureError::Device(format!(
                "Buffer too small: expected {} bytes, got {}",
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            orientation,
        })
    }

    /// Bytes per row in the pixel buffer.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }
}

impl std::fmt::Debug for RawCapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawCapturedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .field("orientation", &self.orientation)
            .finish()
    }
}

/// The final image handed to the presentation layer.
#[derive(Clone)]
pub struct CroppedResult {
    pub width: u32,
    pub height: u32,
    /// BGRA pixel data, tightly packed rows
    pub data: Vec<u8>,
    pub orientation: ImageOrientation,
    /// Rectangle taken from the source image; `None` when the source was returned uncropped
    pub crop_rect: Option<PixelRect>,
}

impl CroppedResult {
    /// Wrap a raw image without cropping it.
    pub fn uncropped(raw: RawCapturedImage) -> Self {
        Self {
            width: raw.width,
            height: raw.height,
            data: raw.data,
            orientation: raw.orientation,
            crop_rect: None,
        }
    }
}

impl std::fmt::Debug for CroppedResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CroppedResult")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("orientation", &self.orientation)
            .field("crop_rect", &self.crop_rect)
            .finish()
    }
}

/// Single-use completion for a photo capture.
///
/// Devices resolve it exactly once; dropping it unresolved is reported to
/// the caller as a device error.
pub type PhotoCompletion = oneshot::Sender<Result<RawCapturedImage, CaptureError>>;
