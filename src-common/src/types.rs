//! Shared types for camera session state and crop geometry.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the camera session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing has been configured yet
    #[default]
    Uninitialized,
    /// Waiting for the OS permission prompt to resolve
    PermissionPending,
    /// Camera access was refused; terminal for this run
    PermissionDenied,
    /// Inputs and outputs attached, device not running
    Configured,
    /// Device is delivering frames; capture is allowed
    Running,
    /// Device was running and has been stopped
    Stopped,
}

impl SessionState {
    /// Lowercase name used in CLI output and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::PermissionPending => "permission_pending",
            SessionState::PermissionDenied => "permission_denied",
            SessionState::Configured => "configured",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
        }
    }
}

/// Camera permission status as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Authorized,
    NotDetermined,
    Denied,
}

/// EXIF-style orientation tag attached to a captured image.
///
/// Cropping operates on the stored pixel grid and carries the tag through
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageOrientation {
    #[default]
    Up,
    Down,
    Left,
    Right,
    UpMirrored,
    DownMirrored,
    LeftMirrored,
    RightMirrored,
}

impl ImageOrientation {
    /// Parse from string (case-insensitive, accepts `-` or `_` separators).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "up_mirrored" => Some(Self::UpMirrored),
            "down_mirrored" => Some(Self::DownMirrored),
            "left_mirrored" => Some(Self::LeftMirrored),
            "right_mirrored" => Some(Self::RightMirrored),
            _ => None,
        }
    }
}

/// Rectangle in normalized [0, 1] coordinates of the full captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Parse `x,y,w,h` (comma separated floats).
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        match parts.as_slice() {
            [x, y, w, h] => Some(Self::new(*x, *y, *w, *h)),
            _ => None,
        }
    }
}

/// Size of the on-screen viewport; only its aspect ratio matters for cropping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectSize {
    pub width: f64,
    pub height: f64,
}

impl AspectSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Parse `W:H` or `WxH`.
    pub fn parse(s: &str) -> Option<Self> {
        let (w, h) = s.split_once(':').or_else(|| s.split_once('x'))?;
        Some(Self::new(w.trim().parse().ok()?, h.trim().parse().ok()?))
    }

    /// Width divided by height, or `None` if either side is not a positive finite number.
    pub fn ratio(&self) -> Option<f64> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(self.width) && valid(self.height) {
            Some(self.width / self.height)
        } else {
            None
        }
    }
}

/// Viewport geometry supplied by the preview at the moment of capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CropViewport {
    /// Rectangle already converted into the captured frame's normalized space
    Normalized(NormalizedRect),
    /// Largest centered crop matching the viewport's aspect ratio
    AspectFill(AspectSize),
}

/// Integer pixel rectangle inside a captured image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the rectangle lies entirely inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

/// Category of a user-facing alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    PermissionDenied,
    Device,
}

/// An unresolved error or permission condition shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCondition {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
}

/// Default alert title for camera problems.
pub const CAMERA_ALERT_TITLE: &str = "Camera Error";

impl AlertCondition {
    pub fn permission_denied() -> Self {
        Self {
            kind: AlertKind::PermissionDenied,
            title: CAMERA_ALERT_TITLE.to_string(),
            message: "Permission denied.".to_string(),
        }
    }

    pub fn device(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Device,
            title: CAMERA_ALERT_TITLE.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_parse() {
        assert_eq!(AspectSize::parse("4:3"), Some(AspectSize::new(4.0, 3.0)));
        assert_eq!(
            AspectSize::parse("300x400"),
            Some(AspectSize::new(300.0, 400.0))
        );
        assert_eq!(AspectSize::parse("square"), None);
    }

    #[test]
    fn test_aspect_ratio_rejects_zero() {
        assert_eq!(AspectSize::new(0.0, 10.0).ratio(), None);
        assert_eq!(AspectSize::new(10.0, 0.0).ratio(), None);
        assert_eq!(AspectSize::new(f64::NAN, 1.0).ratio(), None);
        assert_eq!(AspectSize::new(2.0, 1.0).ratio(), Some(2.0));
    }

    #[test]
    fn test_normalized_rect_parse() {
        assert_eq!(
            NormalizedRect::parse("0.25, 0.25, 0.5, 0.5"),
            Some(NormalizedRect::new(0.25, 0.25, 0.5, 0.5))
        );
        assert_eq!(NormalizedRect::parse("0.1,0.2,0.3"), None);
        assert_eq!(NormalizedRect::parse("a,b,c,d"), None);
    }

    #[test]
    fn test_orientation_parse() {
        assert_eq!(
            ImageOrientation::parse("down-mirrored"),
            Some(ImageOrientation::DownMirrored)
        );
        assert_eq!(ImageOrientation::parse("UP"), Some(ImageOrientation::Up));
        assert_eq!(ImageOrientation::parse("sideways"), None);
    }

    #[test]
    fn test_viewport_serialization() {
        let viewport = CropViewport::AspectFill(AspectSize::new(1.0, 1.0));
        let json = serde_json::to_string(&viewport).unwrap();
        assert!(json.contains("\"mode\":\"aspect_fill\""));
        let parsed: CropViewport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, viewport);
    }

    #[test]
    fn test_pixel_rect_fits_within() {
        assert!(PixelRect::new(1008, 756, 2016, 1512).fits_within(4032, 3024));
        assert!(!PixelRect::new(1, 0, 4032, 10).fits_within(4032, 3024));
    }

    #[test]
    fn test_session_state_default() {
        assert_eq!(SessionState::default(), SessionState::Uninitialized);
        assert_eq!(SessionState::Running.as_str(), "running");
    }
}
