//! Camera service facade for the presentation layer.
//!
//! This module wires the capture pipeline together:
//! - Session lifecycle (permission, configuration, start/stop)
//! - Photo capture with viewport cropping
//! - Observable session state and captured-result slot
//! - User-facing alerts

use crate::alert::AlertChannel;
use crate::capture::{CaptureDevice, CaptureError, CroppedResult, PermissionProvider};
use crate::config::AppConfig;
use crate::coordinator::{CaptureCoordinator, CapturedSlot};
use crate::session::SessionStateMachine;
use camscan_common::{CropViewport, SessionState};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Runtime options for a [`CameraService`].
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Viewport applied when `capture` is called without one
    pub default_viewport: Option<CropViewport>,
}

impl From<&AppConfig> for ServiceConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            default_viewport: config.capture.default_aspect.map(CropViewport::AspectFill),
        }
    }
}

/// Camera service owned by the presentation layer.
pub struct CameraService {
    session: SessionStateMachine,
    coordinator: CaptureCoordinator,
    config: ServiceConfig,
}

impl CameraService {
    /// Create the service and the alert channel the presentation layer observes.
    ///
    /// Must be called inside a tokio runtime; the session worker is spawned here.
    pub fn new(
        device: Box<dyn CaptureDevice>,
        permission: Arc<dyn PermissionProvider>,
        config: ServiceConfig,
    ) -> (Self, AlertChannel) {
        let (alert_channel, alerts) = AlertChannel::new();
        let session = SessionStateMachine::spawn(device, permission, alerts.clone());
        let coordinator = CaptureCoordinator::new(session.photo_requester(), alerts);

        (
            Self {
                session,
                coordinator,
                config,
            },
            alert_channel,
        )
    }

    /// Start the camera session.
    pub async fn start(&self) -> Result<SessionState, CaptureError> {
        self.session.start().await
    }

    /// Stop the camera session. No-op unless running.
    pub async fn stop(&self) -> SessionState {
        self.session.stop().await
    }

    /// Capture a photo cropped to `viewport`, or to the configured default viewport.
    pub async fn capture(
        &self,
        viewport: Option<CropViewport>,
    ) -> Result<Arc<CroppedResult>, CaptureError> {
        let viewport = viewport.or(self.config.default_viewport);
        self.coordinator.capture(viewport).await
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Subscribe to session state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Subscribe to captured results.
    pub fn subscribe_captured(&self) -> CapturedSlot {
        self.coordinator.subscribe()
    }

    /// Most recent captured result.
    pub fn latest_captured(&self) -> Option<Arc<CroppedResult>> {
        self.coordinator.latest()
    }

    /// Forget the published result.
    pub fn clear_captured(&self) {
        self.coordinator.clear();
    }

    /// Stop the device and wait for the session worker to release it.
    pub async fn shutdown(&self) {
        info!("Camera service shutting down");
        self.session.shutdown().await;
    }

    /// Drive `work` until it finishes or `interrupt` fires, then shut down.
    ///
    /// Returns `None` when interrupted. The device is released before this
    /// returns in both cases.
    pub async fn run_until<W, I>(&self, work: W, interrupt: I) -> Option<W::Output>
    where
        W: Future,
        I: Future<Output = ()>,
    {
        let outcome = tokio::select! {
            output = work => Some(output),
            _ = interrupt => {
                warn!("Scan interrupted");
                None
            }
        };
        self.shutdown().await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ScriptedPermission;
    use crate::testing::MockDevice;
    use camscan_common::{AlertKind, AspectSize, PermissionState, PixelRect};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_full_scan_flow() {
        let (device, stats) = MockDevice::new(40, 30);
        let (service, mut alerts) = CameraService::new(
            Box::new(device),
            Arc::new(ScriptedPermission::authorized()),
            ServiceConfig::default(),
        );

        assert_eq!(service.start().await, Ok(SessionState::Running));
        let viewport = CropViewport::AspectFill(AspectSize::new(1.0, 1.0));
        let result = service.capture(Some(viewport)).await.unwrap();
        assert_eq!(result.crop_rect, Some(PixelRect::new(5, 0, 30, 30)));
        assert!(service.latest_captured().is_some());

        assert_eq!(service.stop().await, SessionState::Stopped);
        service.shutdown().await;
        assert!(alerts.poll().is_none());
        assert_eq!(stats.stop_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_default_viewport_applies() {
        let (device, _stats) = MockDevice::new(40, 30);
        let config = ServiceConfig {
            default_viewport: Some(CropViewport::AspectFill(AspectSize::new(4.0, 1.0))),
        };
        let (service, _alerts) = CameraService::new(
            Box::new(device),
            Arc::new(ScriptedPermission::authorized()),
            config,
        );
        service.start().await.unwrap();

        let result = service.capture(None).await.unwrap();
        assert_eq!((result.width, result.height), (40, 10));
        service.clear_captured();
        assert!(service.latest_captured().is_none());
    }

    #[tokio::test]
    async fn test_denied_service_cannot_capture() {
        let (device, _stats) = MockDevice::new(8, 8);
        let (service, mut alerts) = CameraService::new(
            Box::new(device),
            Arc::new(ScriptedPermission::new(PermissionState::Denied, false)),
            ServiceConfig::default(),
        );

        assert_eq!(service.start().await, Err(CaptureError::PermissionDenied));
        assert_eq!(service.capture(None).await.unwrap_err(), CaptureError::NotRunning);
        assert_eq!(alerts.poll().unwrap().kind, AlertKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_interrupt_releases_device() {
        let (device, stats) = MockDevice::new(8, 8);
        stats.hold_captures.store(true, Ordering::SeqCst);
        let (service, _alerts) = CameraService::new(
            Box::new(device),
            Arc::new(ScriptedPermission::authorized()),
            ServiceConfig::default(),
        );
        service.start().await.unwrap();

        let outcome = service
            .run_until(service.capture(None), std::future::ready(()))
            .await;
        assert!(outcome.is_none());
        assert_eq!(stats.stop_calls.load(Ordering::SeqCst), 1);
        assert!(!stats.running.load(Ordering::SeqCst));
        assert!(service.start().await.is_err());
    }

    #[tokio::test]
    async fn test_run_until_completion_still_shuts_down() {
        let (device, stats) = MockDevice::new(8, 8);
        let (service, _alerts) = CameraService::new(
            Box::new(device),
            Arc::new(ScriptedPermission::authorized()),
            ServiceConfig::default(),
        );

        let outcome = service
            .run_until(service.start(), std::future::pending())
            .await;
        assert_eq!(outcome, Some(Ok(SessionState::Running)));
        assert!(!stats.running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_service_config_from_app_config() {
        let mut app = AppConfig::default();
        app.capture.default_aspect = Some(AspectSize::new(3.0, 4.0));
        let config = ServiceConfig::from(&app);
        assert_eq!(
            config.default_viewport,
            Some(CropViewport::AspectFill(AspectSize::new(3.0, 4.0)))
        );
    }
}
