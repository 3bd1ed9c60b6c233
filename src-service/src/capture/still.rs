//! Capture backend that serves a still image from disk.
//!
//! Lets the whole session/capture/crop pipeline run on machines without a
//! camera: the "photo" is the decoded file, delivered asynchronously after
//! an optional simulated shutter latency.

use super::error::{CaptureError, ExportError};
use super::types::{PhotoCompletion, RawCapturedImage};
use super::{CaptureDevice, PermissionCallback, PermissionProvider};
use camscan_common::{ImageOrientation, PermissionState};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// Decode an image file into a BGRA [`RawCapturedImage`].
pub fn load_still(path: &Path, orientation: ImageOrientation) -> Result<RawCapturedImage, ExportError> {
    let rgba = image::open(path)?.to_rgba8();
    let (width, height) = rgba.dimensions();

    // Convert RGBA to BGRA (swap R and B channels)
    let mut data = rgba.into_raw();
    for chunk in data.chunks_exact_mut(4) {
        chunk.swap(0, 2);
    }

    debug!("Loaded still {:?} ({}x{})", path, width, height);
    RawCapturedImage::new(width, height, data, orientation)
        .map_err(|e| ExportError::Image(e.to_string()))
}

/// A [`CaptureDevice`] whose every photo is the same still image.
pub struct StillImageDevice {
    frame: RawCapturedImage,
    latency: Duration,
    configured: bool,
    has_input: bool,
    has_output: bool,
    running: bool,
}

impl StillImageDevice {
    pub fn new(frame: RawCapturedImage) -> Self {
        Self {
            frame,
            latency: Duration::ZERO,
            configured: false,
            has_input: false,
            has_output: false,
            running: false,
        }
    }

    /// Delay between the capture request and delivery of the photo.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl CaptureDevice for StillImageDevice {
    fn configure(&mut self) -> Result<(), CaptureError> {
        self.configured = true;
        Ok(())
    }

    fn add_video_input(&mut self) -> Result<(), CaptureError> {
        if !self.configured {
            return Err(CaptureError::Device("Input added before configuration".to_string()));
        }
        self.has_input = true;
        Ok(())
    }

    fn add_photo_output(&mut self) -> Result<(), CaptureError> {
        if !self.configured {
            return Err(CaptureError::Device("Output added before configuration".to_string()));
        }
        self.has_output = true;
        Ok(())
    }

    fn start_running(&mut self) {
        self.running = self.has_input && self.has_output;
        info!(
            "Still device {} ({}x{})",
            if self.running { "running" } else { "failed to start" },
            self.frame.width,
            self.frame.height
        );
    }

    fn stop_running(&mut self) {
        self.running = false;
        info!("Still device stopped");
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn capture_photo(&mut self, completion: PhotoCompletion) {
        if !self.running {
            let _ = completion.send(Err(CaptureError::Device("Device is not running".to_string())));
            return;
        }

        let frame = self.frame.clone();
        let latency = self.latency;
        tokio::spawn(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            let _ = completion.send(Ok(frame));
        });
    }
}

/// A [`PermissionProvider`] with a fixed status and a scripted prompt answer.
#[derive(Clone)]
pub struct ScriptedPermission {
    status: Arc<Mutex<PermissionState>>,
    grant_on_prompt: bool,
    prompt_delay: Duration,
}

impl ScriptedPermission {
    pub fn new(status: PermissionState, grant_on_prompt: bool) -> Self {
        Self {
            status: Arc::new(Mutex::new(status)),
            grant_on_prompt,
            prompt_delay: Duration::ZERO,
        }
    }

    /// Already authorized; never prompts.
    pub fn authorized() -> Self {
        Self::new(PermissionState::Authorized, true)
    }

    /// How long the simulated prompt stays open before answering.
    pub fn with_prompt_delay(mut self, delay: Duration) -> Self {
        self.prompt_delay = delay;
        self
    }
}

impl PermissionProvider for ScriptedPermission {
    fn current_status(&self) -> PermissionState {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn request_access(&self, callback: PermissionCallback) {
        let status = Arc::clone(&self.status);
        let granted = self.grant_on_prompt;
        let delay = self.prompt_delay;

        // The prompt answers from a foreign thread, like the OS callback would.
        std::thread::spawn(move || {
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            {
                let mut current = status.lock().unwrap_or_else(|e| e.into_inner());
                *current = if granted {
                    PermissionState::Authorized
                } else {
                    PermissionState::Denied
                };
            }
            callback(granted);
        });
    }
}
