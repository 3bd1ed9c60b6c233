//! Capture device abstraction for the CamScan service.
//!
//! The session and coordinator only talk to hardware through the traits in
//! this module. [`still`] provides an implementation backed by an image on
//! disk, used by the CLI and the service demo.

pub mod error;
pub mod still;
pub mod thumbnail;
pub mod types;

pub use camscan_common::{ImageOrientation, PermissionState};

pub use error::{CaptureError, CropError, ExportError};
pub use still::{load_still, ScriptedPermission, StillImageDevice};
pub use types::{CroppedResult, PhotoCompletion, RawCapturedImage, BYTES_PER_PIXEL};

/// Trait for the physical capture device.
///
/// All methods are called from the session's serial worker only, so
/// implementations do not need internal synchronization for configuration.
pub trait CaptureDevice: Send {
    /// Begin configuring the device (resolution preset, session setup).
    fn configure(&mut self) -> Result<(), CaptureError>;

    /// Attach the camera input.
    fn add_video_input(&mut self) -> Result<(), CaptureError>;

    /// Attach the still-photo output.
    fn add_photo_output(&mut self) -> Result<(), CaptureError>;

    /// Start delivering frames.
    fn start_running(&mut self);

    /// Stop delivering frames.
    fn stop_running(&mut self);

    /// Whether the device is currently running.
    fn is_running(&self) -> bool;

    /// Request a full-resolution photo.
    ///
    /// Must return promptly; the photo is delivered later through
    /// `completion`, which the device resolves exactly once.
    fn capture_photo(&mut self, completion: PhotoCompletion);
}

/// Callback invoked when the permission prompt resolves; `true` means granted.
pub type PermissionCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Trait for querying and requesting camera access.
pub trait PermissionProvider: Send + Sync {
    /// Current permission status.
    fn current_status(&self) -> PermissionState;

    /// Show the OS permission prompt. `callback` may be invoked from any thread.
    fn request_access(&self, callback: PermissionCallback);
}
