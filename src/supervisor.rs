//! Periodic connection check.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::connection::Controller;

/// Background task that reconnects the bridge whenever it is not running.
///
/// The first check happens immediately.
#[derive(Debug)]
pub(crate) struct Supervisor {
    handle: Option<JoinHandle<()>>,
}

impl Supervisor {
    pub(crate) fn spawn(controller: Arc<Controller>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                tracing::debug!(
                    "bridge {}: checking RFXCOM transceiver connection, state = {}",
                    controller.uid(),
                    controller.state()
                );
                controller.tick().await;
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    /// Stops the task. Cancelling twice is a no-op.
    pub(crate) fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub(crate) const fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.cancel();
    }
}
