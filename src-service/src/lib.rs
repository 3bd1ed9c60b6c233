//! CamScan capture service.
//!
//! Camera session lifecycle, photo capture coordination, and the mapping
//! from an on-screen viewport to a crop of the full-resolution photo.

pub mod alert;
pub mod capture;
pub mod config;
pub mod contour;
pub mod coordinator;
pub mod crop;
pub mod export;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;

pub use alert::{AlertChannel, AlertSender};
pub use capture::{CaptureDevice, CaptureError, CroppedResult, PermissionProvider, RawCapturedImage};
pub use state::{CameraService, ServiceConfig};
