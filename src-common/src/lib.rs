//! CamScan Common Library
//!
//! Shared types for the camera session, crop geometry and alerts used by the
//! capture service and the command-line interface.

pub mod logging;
pub mod types;

pub use types::*;
