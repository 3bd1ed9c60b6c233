//! Error types for capture and crop operations.

use std::fmt;

/// Error type for session and capture operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Camera access was refused; terminal for this run
    PermissionDenied,
    /// Hardware or configuration failure reported by the device
    Device(String),
    /// Capture attempted while the session is not running
    NotRunning,
    /// Another capture request is still unresolved
    CaptureInProgress,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::PermissionDenied => write!(f, "Camera permission denied"),
            CaptureError::Device(msg) => write!(f, "Device error: {}", msg),
            CaptureError::NotRunning => write!(f, "Camera session is not running"),
            CaptureError::CaptureInProgress => write!(f, "A capture is already in progress"),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<CaptureError> for String {
    fn from(err: CaptureError) -> Self {
        err.to_string()
    }
}

/// Error type for viewport crop computation.
///
/// These never reach the user: the crop step falls back to the uncropped
/// image and records the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CropError {
    /// Clamped crop rectangle has no area
    DegenerateCrop(String),
    /// Viewport geometry cannot be interpreted
    InvalidViewport(String),
}

impl fmt::Display for CropError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CropError::DegenerateCrop(msg) => write!(f, "Degenerate crop: {}", msg),
            CropError::InvalidViewport(msg) => write!(f, "Invalid viewport: {}", msg),
        }
    }
}

impl std::error::Error for CropError {}

impl From<CropError> for String {
    fn from(err: CropError) -> Self {
        err.to_string()
    }
}

/// Error type for reading and writing still images.
#[derive(Debug)]
pub enum ExportError {
    /// Filesystem failure
    Io(std::io::Error),
    /// Image could not be decoded or encoded
    Image(String),
    /// File extension is not a supported output format
    UnsupportedFormat(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "I/O error: {}", e),
            ExportError::Image(msg) => write!(f, "Image error: {}", msg),
            ExportError::UnsupportedFormat(ext) => write!(f, "Unsupported image format: {}", ext),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err)
    }
}

impl From<image::ImageError> for ExportError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => ExportError::Io(e),
            other => ExportError::Image(other.to_string()),
        }
    }
}

impl From<ExportError> for String {
    fn from(err: ExportError) -> Self {
        err.to_string()
    }
}
