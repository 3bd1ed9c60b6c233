//! Photo capture coordination.
//!
//! Only one capture may be unresolved at a time; a second request while one
//! is outstanding fails with [`CaptureError::CaptureInProgress`]. Each
//! accepted request resolves exactly once, to a cropped result or an error,
//! even if the caller stops waiting for it.

use crate::alert::AlertSender;
use crate::capture::{CaptureError, CroppedResult, RawCapturedImage};
use crate::crop;
use crate::session::PhotoRequester;
use camscan_common::{AlertCondition, CropViewport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tracing::{error, info};

/// Slot the presentation layer watches for the latest captured image.
pub type CapturedSlot = watch::Receiver<Option<Arc<CroppedResult>>>;

/// Issues capture requests and publishes cropped results.
pub struct CaptureCoordinator {
    requester: PhotoRequester,
    alerts: AlertSender,
    in_flight: Arc<AtomicBool>,
    captured_tx: Arc<watch::Sender<Option<Arc<CroppedResult>>>>,
}

impl CaptureCoordinator {
    pub fn new(requester: PhotoRequester, alerts: AlertSender) -> Self {
        let (captured_tx, _) = watch::channel(None);
        Self {
            requester,
            alerts,
            in_flight: Arc::new(AtomicBool::new(false)),
            captured_tx: Arc::new(captured_tx),
        }
    }

    /// Capture a photo and crop it to `viewport`.
    ///
    /// The viewport is taken by value at call time, so later layout changes
    /// cannot affect this capture. The result is also published to the slot
    /// returned by [`CaptureCoordinator::subscribe`].
    pub async fn capture(
        &self,
        viewport: Option<CropViewport>,
    ) -> Result<Arc<CroppedResult>, CaptureError> {
        let guard = InFlightGuard::acquire(&self.in_flight).ok_or_else(|| {
            info!("Capture rejected: another capture is in progress");
            CaptureError::CaptureInProgress
        })?;

        let (completion, photo_rx) = oneshot::channel();
        self.requester.request_photo(completion);

        let alerts = self.alerts.clone();
        let captured_tx = Arc::clone(&self.captured_tx);

        // Resolution runs detached so it completes even if this future is dropped.
        let resolution = tokio::spawn(async move {
            let _guard = guard;
            let raw = receive_photo(photo_rx, &alerts).await?;
            Ok(finish_capture(raw, viewport.as_ref(), &captured_tx))
        });

        match resolution.await {
            Ok(result) => result,
            Err(e) => Err(CaptureError::Device(format!("Capture task failed: {}", e))),
        }
    }

    /// Whether a capture is currently unresolved.
    pub fn is_capturing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Subscribe to published results.
    pub fn subscribe(&self) -> CapturedSlot {
        self.captured_tx.subscribe()
    }

    /// The most recently published result.
    pub fn latest(&self) -> Option<Arc<CroppedResult>> {
        self.captured_tx.borrow().clone()
    }

    /// Clear the published result (e.g. after the result screen was dismissed).
    pub fn clear(&self) {
        self.captured_tx.send_replace(None);
    }
}

async fn receive_photo(
    photo_rx: oneshot::Receiver<Result<RawCapturedImage, CaptureError>>,
    alerts: &AlertSender,
) -> Result<RawCapturedImage, CaptureError> {
    let err = match photo_rx.await {
        Ok(Ok(raw)) => return Ok(raw),
        Ok(Err(e)) => e,
        Err(_) => CaptureError::Device("capture completion dropped".to_string()),
    };

    if let CaptureError::Device(ref msg) = err {
        error!("Photo capture failed: {}", msg);
        alerts.raise(AlertCondition::device(err.to_string()));
    }
    Err(err)
}

fn finish_capture(
    raw: RawCapturedImage,
    viewport: Option<&CropViewport>,
    captured_tx: &watch::Sender<Option<Arc<CroppedResult>>>,
) -> Arc<CroppedResult> {
    let (source_width, source_height) = (raw.width, raw.height);
    let outcome = crop::apply_viewport(raw, viewport);

    match outcome.fallback {
        Some(reason) => info!(
            "Captured {}x{} photo delivered uncropped ({})",
            source_width, source_height, reason
        ),
        None => info!(
            "Captured {}x{} photo, result {}x{}",
            source_width, source_height, outcome.image.width, outcome.image.height
        ),
    }

    let result = Arc::new(outcome.image);
    captured_tx.send_replace(Some(Arc::clone(&result)));
    result
}

/// Marks a capture as in flight until dropped.
struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
