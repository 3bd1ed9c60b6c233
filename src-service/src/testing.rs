//! Test doubles for the capture device and permission provider.

use crate::capture::{
    CaptureDevice, CaptureError, PermissionCallback, PermissionProvider, PhotoCompletion,
    RawCapturedImage,
};
use camscan_common::{ImageOrientation, PermissionState};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Counters and switches shared between a test and its [`MockDevice`].
pub struct DeviceStats {
    pub configure_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub capture_calls: AtomicUsize,
    pub running: AtomicBool,
    pub fail_configure: AtomicBool,
    /// `start_running` leaves the device stopped
    pub fail_start: AtomicBool,
    pub fail_capture: AtomicBool,
    /// Keep completions until [`DeviceStats::release_held`] is called
    pub hold_captures: AtomicBool,
    /// Drop completions without answering
    pub drop_captures: AtomicBool,
    held: Mutex<Vec<PhotoCompletion>>,
    frame: RawCapturedImage,
}

impl DeviceStats {
    /// Number of capture completions currently held.
    pub fn held_count(&self) -> usize {
        self.held.lock().unwrap().len()
    }

    /// Deliver the frame to every held completion.
    pub fn release_held(&self) {
        for completion in self.held.lock().unwrap().drain(..) {
            let _ = completion.send(Ok(self.frame.clone()));
        }
    }
}

/// Device that records calls and serves a gradient frame.
pub struct MockDevice {
    stats: Arc<DeviceStats>,
}

impl MockDevice {
    pub fn new(width: u32, height: u32) -> (Self, Arc<DeviceStats>) {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0, 255]);
            }
        }
        let frame = RawCapturedImage::new(width, height, data, ImageOrientation::Right).unwrap();

        let stats = Arc::new(DeviceStats {
            configure_calls: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            capture_calls: AtomicUsize::new(0),
            running: AtomicBool::new(false),
            fail_configure: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
            fail_capture: AtomicBool::new(false),
            hold_captures: AtomicBool::new(false),
            drop_captures: AtomicBool::new(false),
            held: Mutex::new(Vec::new()),
            frame,
        });
        (
            Self {
                stats: Arc::clone(&stats),
            },
            stats,
        )
    }
}

impl CaptureDevice for MockDevice {
    fn configure(&mut self) -> Result<(), CaptureError> {
        self.stats.configure_calls.fetch_add(1, Ordering::SeqCst);
        if self.stats.fail_configure.load(Ordering::SeqCst) {
            return Err(CaptureError::Device("no back camera".to_string()));
        }
        Ok(())
    }

    fn add_video_input(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn add_photo_output(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn start_running(&mut self) {
        self.stats.start_calls.fetch_add(1, Ordering::SeqCst);
        let started = !self.stats.fail_start.load(Ordering::SeqCst);
        self.stats.running.store(started, Ordering::SeqCst);
    }

    fn stop_running(&mut self) {
        self.stats.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.stats.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.stats.running.load(Ordering::SeqCst)
    }

    fn capture_photo(&mut self, completion: PhotoCompletion) {
        self.stats.capture_calls.fetch_add(1, Ordering::SeqCst);
        if self.stats.fail_capture.load(Ordering::SeqCst) {
            let _ = completion.send(Err(CaptureError::Device("sensor fault".to_string())));
        } else if self.stats.drop_captures.load(Ordering::SeqCst) {
            drop(completion);
        } else if self.stats.hold_captures.load(Ordering::SeqCst) {
            self.stats.held.lock().unwrap().push(completion);
        } else {
            let _ = completion.send(Ok(self.stats.frame.clone()));
        }
    }
}

/// Permission provider whose prompt is answered by the test.
#[derive(Clone)]
pub struct ManualPermission {
    pending: Arc<Mutex<Option<PermissionCallback>>>,
    requests: Arc<AtomicUsize>,
}

impl ManualPermission {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(None)),
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Answer the prompt, waiting for it to be shown first.
    pub async fn resolve(&self, granted: bool) {
        loop {
            let callback = self.pending.lock().unwrap().take();
            if let Some(callback) = callback {
                callback(granted);
                return;
            }
            tokio::task::yield_now().await;
        }
    }
}

impl PermissionProvider for ManualPermission {
    fn current_status(&self) -> PermissionState {
        PermissionState::NotDetermined
    }

    fn request_access(&self, callback: PermissionCallback) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.pending.lock().unwrap() = Some(callback);
    }
}
