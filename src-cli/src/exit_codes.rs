//! Exit codes for the CLI.
//!
//! These codes enable scripting integration by providing structured
//! feedback about operation results.

use camscan_service::capture::{CaptureError, ExportError};

/// Exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,
    /// General/unspecified error
    GeneralError = 1,
    /// Invalid command-line arguments
    InvalidArguments = 2,
    /// Camera permission denied
    PermissionDenied = 3,
    /// Session could not start or photo capture failed
    CaptureFailed = 4,
    /// Input image could not be read
    InputUnreadable = 5,
    /// Result could not be written
    ExportFailed = 6,
    /// Interrupted by Ctrl+C
    Interrupted = 130,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<&CaptureError> for ExitCode {
    fn from(err: &CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied => ExitCode::PermissionDenied,
            _ => ExitCode::CaptureFailed,
        }
    }
}

impl From<&ExportError> for ExitCode {
    fn from(err: &ExportError) -> Self {
        match err {
            ExportError::UnsupportedFormat(_) => ExitCode::InvalidArguments,
            _ => ExitCode::ExportFailed,
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitCode::Success => write!(f, "success"),
            ExitCode::GeneralError => write!(f, "general error"),
            ExitCode::InvalidArguments => write!(f, "invalid arguments"),
            ExitCode::PermissionDenied => write!(f, "permission denied"),
            ExitCode::CaptureFailed => write!(f, "capture failed"),
            ExitCode::InputUnreadable => write!(f, "input unreadable"),
            ExitCode::ExportFailed => write!(f, "export failed"),
            ExitCode::Interrupted => write!(f, "interrupted"),
        }
    }
}
