use std::time::Duration;

use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::task::JoinHandle;

use super::service::PlayerCommand;

/// Single-slot restartable countdown that hides the controls when it fires.
///
/// Holds only a weak command sender so a pending countdown never keeps the
/// service loop alive, and the pending task is aborted on drop so a
/// torn-down session can never receive a stale timeout.
pub(crate) struct HideTimer {
    delay: Duration,
    command_tx: WeakUnboundedSender<PlayerCommand>,
    pending: Option<JoinHandle<()>>,
}

impl HideTimer {
    pub(crate) fn new(delay: Duration, command_tx: WeakUnboundedSender<PlayerCommand>) -> Self {
        Self {
            delay,
            command_tx,
            pending: None,
        }
    }

    /// Cancel any pending fire and schedule a new one.
    pub(crate) fn restart(&mut self) {
        self.cancel();
        let command_tx = self.command_tx.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(command_tx) = command_tx.upgrade() {
                let _ = command_tx.send(PlayerCommand::ControlsTimeout);
            }
        }));
    }

    /// Cancel without rescheduling (while a scrub gesture is in progress).
    pub(crate) fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl Drop for HideTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
