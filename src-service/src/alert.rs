//! User-facing alert slot.
//!
//! Workers post conditions through an [`AlertSender`]; the presentation
//! context owns the [`AlertChannel`] and applies posted conditions to its
//! slot when it polls or awaits, so the slot is only ever written on the
//! consumer's side. Latest condition overwrites any unacknowledged one.

use camscan_common::AlertCondition;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Cloneable handle used by workers to raise alerts.
#[derive(Clone)]
pub struct AlertSender {
    tx: mpsc::UnboundedSender<AlertCondition>,
}

impl AlertSender {
    /// Post a condition for the presentation layer.
    pub fn raise(&self, condition: AlertCondition) {
        warn!("Alert raised: {} - {}", condition.title, condition.message);
        // Ignore send errors (presentation layer gone)
        let _ = self.tx.send(condition);
    }
}

/// Observable alert slot owned by the presentation layer.
pub struct AlertChannel {
    rx: mpsc::UnboundedReceiver<AlertCondition>,
    current: Option<AlertCondition>,
}

impl AlertChannel {
    /// Create a channel and the sender workers use to reach it.
    pub fn new() -> (Self, AlertSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx, current: None }, AlertSender { tx })
    }

    /// The latest unacknowledged condition, without applying pending posts.
    pub fn current(&self) -> Option<&AlertCondition> {
        self.current.as_ref()
    }

    /// Apply everything posted so far and return the latest condition.
    pub fn poll(&mut self) -> Option<&AlertCondition> {
        while let Ok(condition) = self.rx.try_recv() {
            self.current = Some(condition);
        }
        self.current.as_ref()
    }

    /// Wait for the next posted condition and apply it.
    ///
    /// Returns `None` once every sender has been dropped and nothing is pending.
    pub async fn changed(&mut self) -> Option<&AlertCondition> {
        let condition = self.rx.recv().await?;
        self.current = Some(condition);
        // Anything posted meanwhile is newer
        self.poll()
    }

    /// Clear the slot after the user dismissed the alert.
    pub fn acknowledge(&mut self) -> Option<AlertCondition> {
        let cleared = self.current.take();
        if let Some(ref condition) = cleared {
            debug!("Alert acknowledged: {}", condition.message);
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camscan_common::AlertKind;

    #[test]
    fn test_poll_applies_latest() {
        let (mut channel, sender) = AlertChannel::new();
        assert!(channel.poll().is_none());

        sender.raise(AlertCondition::device("first"));
        sender.raise(AlertCondition::permission_denied());

        // Not applied until the owner polls
        assert!(channel.current().is_none());
        let current = channel.poll().unwrap();
        assert_eq!(current.kind, AlertKind::PermissionDenied);
        assert_eq!(current.message, "Permission denied.");
    }

    #[test]
    fn test_acknowledge_clears() {
        let (mut channel, sender) = AlertChannel::new();
        sender.raise(AlertCondition::device("lens cap"));
        channel.poll();

        let cleared = channel.acknowledge().unwrap();
        assert_eq!(cleared.message, "lens cap");
        assert!(channel.current().is_none());
        assert!(channel.poll().is_none());
    }

    #[tokio::test]
    async fn test_changed_receives_from_other_task() {
        let (mut channel, sender) = AlertChannel::new();
        tokio::spawn(async move {
            sender.raise(AlertCondition::device("sensor fault"));
        });

        let current = channel.changed().await.unwrap();
        assert_eq!(current.kind, AlertKind::Device);
        assert_eq!(current.title, "Camera Error");
    }

    #[tokio::test]
    async fn test_changed_ends_when_senders_dropped() {
        let (mut channel, sender) = AlertChannel::new();
        drop(sender);
        assert!(channel.changed().await.is_none());
    }
}
