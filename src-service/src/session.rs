//! Camera session state machine.
//!
//! A single worker task owns the capture device and performs every device
//! mutation (configure, start, stop, photo requests) in the order commands
//! arrive. Callers talk to it through [`SessionStateMachine`] and observe the
//! state through a watch channel.
//!
//! Permission is checked on the first start. While the OS prompt is open the
//! session sits in `PermissionPending` and start/stop commands are deferred,
//! then replayed in order once the prompt resolves.

use crate::alert::AlertSender;
use crate::capture::{CaptureDevice, CaptureError, PermissionProvider, PhotoCompletion};
use camscan_common::{AlertCondition, PermissionState, SessionState};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

/// Commands processed by the session worker.
enum SessionCommand {
    Start {
        reply: oneshot::Sender<Result<SessionState, CaptureError>>,
    },
    Stop {
        reply: oneshot::Sender<SessionState>,
    },
    Capture {
        completion: PhotoCompletion,
    },
    PermissionResolved {
        granted: bool,
    },
    Shutdown {
        done: Option<oneshot::Sender<()>>,
    },
}

/// Handle used by the capture coordinator to route photo requests through
/// the session worker.
#[derive(Clone)]
pub struct PhotoRequester {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl PhotoRequester {
    /// Ask the worker for a photo. The worker answers `NotRunning` through
    /// `completion` unless the session is running.
    pub fn request_photo(&self, completion: PhotoCompletion) {
        if let Err(mpsc::error::SendError(cmd)) =
            self.commands.send(SessionCommand::Capture { completion })
        {
            if let SessionCommand::Capture { completion } = cmd {
                let _ = completion.send(Err(CaptureError::NotRunning));
            }
        }
    }
}

/// Caller-side handle to the session worker.
///
/// Dropping it shuts the worker down; the worker owns the device and stops
/// it if it is still running.
pub struct SessionStateMachine {
    commands: mpsc::UnboundedSender<SessionCommand>,
    state_rx: watch::Receiver<SessionState>,
}

impl SessionStateMachine {
    /// Spawn the session worker on the current tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn spawn(
        device: Box<dyn CaptureDevice>,
        permission: Arc<dyn PermissionProvider>,
        alerts: AlertSender,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Uninitialized);

        let worker = SessionWorker {
            device,
            permission,
            alerts,
            state_tx,
            commands: commands.downgrade(),
            configured: false,
            prompt_answer: None,
            deferred: VecDeque::new(),
        };
        tokio::spawn(worker.run(command_rx));

        Self { commands, state_rx }
    }

    /// Configure (once) and start the device.
    ///
    /// Resolves after the worker handled the request, which includes waiting
    /// for the permission prompt on first use.
    pub async fn start(&self) -> Result<SessionState, CaptureError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Start { reply })?;
        rx.await
            .map_err(|_| CaptureError::Device("Session worker stopped".to_string()))?
    }

    /// Stop the device if it is running. No-op in any other state.
    pub async fn stop(&self) -> SessionState {
        let (reply, rx) = oneshot::channel();
        if self.send(SessionCommand::Stop { reply }).is_err() {
            return self.state();
        }
        rx.await.unwrap_or_else(|_| self.state())
    }

    /// Stop the device and wait until the worker has released it.
    pub async fn shutdown(&self) {
        let (done, rx) = oneshot::channel();
        if self.send(SessionCommand::Shutdown { done: Some(done) }).is_ok() {
            let _ = rx.await;
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Subscribe to session state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Handle for issuing photo requests through this session.
    pub fn photo_requester(&self) -> PhotoRequester {
        PhotoRequester {
            commands: self.commands.clone(),
        }
    }

    fn send(&self, command: SessionCommand) -> Result<(), CaptureError> {
        self.commands
            .send(command)
            .map_err(|_| CaptureError::Device("Session worker stopped".to_string()))
    }
}

impl Drop for SessionStateMachine {
    fn drop(&mut self) {
        // The worker owns the device, so teardown never touches this handle.
        let _ = self.commands.send(SessionCommand::Shutdown { done: None });
    }
}

/// State owned by the worker task.
struct SessionWorker {
    device: Box<dyn CaptureDevice>,
    permission: Arc<dyn PermissionProvider>,
    alerts: AlertSender,
    state_tx: watch::Sender<SessionState>,
    /// Used to route the permission callback back into the queue
    commands: mpsc::WeakUnboundedSender<SessionCommand>,
    configured: bool,
    /// Answer from our own permission prompt, once it resolved
    prompt_answer: Option<bool>,
    /// Start/stop commands received while the permission prompt is open
    deferred: VecDeque<SessionCommand>,
}

impl SessionWorker {
    async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<SessionCommand>) {
        debug!("Session worker started");
        while let Some(command) = command_rx.recv().await {
            if let SessionCommand::Shutdown { done } = command {
                self.teardown();
                if let Some(done) = done {
                    let _ = done.send(());
                }
                return;
            }
            self.handle(command);
        }
        self.teardown();
    }

    fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Start { reply } => {
                if self.state() == SessionState::PermissionPending {
                    self.deferred.push_back(SessionCommand::Start { reply });
                } else if self.effective_permission() == PermissionState::NotDetermined {
                    self.deferred.push_back(SessionCommand::Start { reply });
                    self.request_permission();
                } else {
                    let _ = reply.send(self.start());
                }
            }
            SessionCommand::Stop { reply } => {
                if self.state() == SessionState::PermissionPending {
                    self.deferred.push_back(SessionCommand::Stop { reply });
                } else {
                    let _ = reply.send(self.stop());
                }
            }
            SessionCommand::Capture { completion } => {
                if self.state() == SessionState::Running {
                    debug!("Issuing photo capture");
                    self.device.capture_photo(completion);
                } else {
                    debug!("Capture rejected in state {:?}", self.state());
                    let _ = completion.send(Err(CaptureError::NotRunning));
                }
            }
            SessionCommand::PermissionResolved { granted } => self.permission_resolved(granted),
            SessionCommand::Shutdown { .. } => {}
        }
    }

    fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            info!("Session state: {:?} -> {:?}", previous, state);
        }
    }

    fn effective_permission(&self) -> PermissionState {
        match self.prompt_answer {
            Some(true) => PermissionState::Authorized,
            Some(false) => PermissionState::Denied,
            None => self.permission.current_status(),
        }
    }

    fn request_permission(&mut self) {
        self.set_state(SessionState::PermissionPending);

        let Some(commands) = self.commands.upgrade() else {
            warn!("Session handle gone before permission prompt");
            return;
        };

        info!("Requesting camera permission");
        self.permission.request_access(Box::new(move |granted| {
            let _ = commands.send(SessionCommand::PermissionResolved { granted });
        }));
    }

    fn permission_resolved(&mut self, granted: bool) {
        if self.state() != SessionState::PermissionPending {
            warn!("Ignoring permission answer outside of a pending prompt");
            return;
        }

        self.prompt_answer = Some(granted);
        if granted {
            info!("Camera permission granted");
            self.set_state(SessionState::Uninitialized);
        } else {
            self.deny();
        }

        let deferred = std::mem::take(&mut self.deferred);
        debug!("Replaying {} deferred session command(s)", deferred.len());
        for command in deferred {
            self.handle(command);
        }
    }

    fn deny(&mut self) {
        warn!("Camera permission denied");
        self.set_state(SessionState::PermissionDenied);
        self.alerts.raise(AlertCondition::permission_denied());
    }

    fn start(&mut self) -> Result<SessionState, CaptureError> {
        match self.state() {
            SessionState::Running => {
                debug!("Start ignored: already running");
                return Ok(SessionState::Running);
            }
            SessionState::PermissionDenied => return Err(CaptureError::PermissionDenied),
            _ => {}
        }

        match self.effective_permission() {
            PermissionState::Authorized => {}
            PermissionState::Denied => {
                self.deny();
                return Err(CaptureError::PermissionDenied);
            }
            PermissionState::NotDetermined => {
                // Only reachable if the prompt could not be shown
                return Err(CaptureError::PermissionDenied);
            }
        }

        if !self.configured {
            self.configure()?;
        }

        self.device.start_running();
        if !self.device.is_running() {
            let err = CaptureError::Device("Camera failed to start".to_string());
            error!("{}", err);
            self.alerts.raise(AlertCondition::device(err.to_string()));
            return Err(err);
        }

        self.set_state(SessionState::Running);
        Ok(SessionState::Running)
    }

    fn configure(&mut self) -> Result<(), CaptureError> {
        if let Err(e) = configure_device(self.device.as_mut()) {
            error!("Session configuration failed: {}", e);
            self.alerts.raise(AlertCondition::device(e.to_string()));
            return Err(e);
        }

        self.configured = true;
        self.set_state(SessionState::Configured);
        Ok(())
    }

    fn stop(&mut self) -> SessionState {
        let state = self.state();
        if state != SessionState::Running {
            debug!("Stop ignored in state {:?}", state);
            return state;
        }

        self.device.stop_running();
        self.set_state(SessionState::Stopped);
        SessionState::Stopped
    }

    fn teardown(&mut self) {
        if self.device.is_running() {
            info!("Stopping camera before session teardown");
            self.device.stop_running();
        }
        if self.state() == SessionState::Running {
            self.set_state(SessionState::Stopped);
        }

        // Pending callers learn the session is gone when their reply drops.
        self.deferred.clear();
        debug!("Session worker exited");
    }
}

fn configure_device(device: &mut dyn CaptureDevice) -> Result<(), CaptureError> {
    device.configure()?;
    device.add_video_input()?;
    device.add_photo_output()?;
    Ok(())
}
