//! Sequence numbers and transmitter response correlation.
//!
//! The transceiver echoes the sequence number of each transmission request in
//! its response. Only one request is outstanding at a time, so a single slot
//! holds the response for the most recently allocated sequence number.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::protocol::TransmitterAck;

#[derive(Debug, Default)]
struct Slot {
    sequence: u8,
    response: Option<TransmitterAck>,
    cancelled: bool,
}

/// Allocates sequence numbers and hands responses to the waiting sender.
#[derive(Debug, Default)]
pub struct Correlator {
    slot: Mutex<Slot>,
    notify: Notify,
}

impl Correlator {
    /// Creates a correlator whose first allocated sequence number is 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next sequence number. Wraps from 255 to 1.
    pub fn next_sequence(&self) -> u8 {
        let mut slot = self.slot.lock();
        slot.sequence = match slot.sequence {
            u8::MAX => 1,
            n => n + 1,
        };
        slot.sequence
    }

    /// Returns the most recently allocated sequence number.
    #[must_use]
    pub fn current_sequence(&self) -> u8 {
        self.slot.lock().sequence
    }

    /// Empties the response slot and rearms after a cancel.
    pub fn clear(&self) {
        let mut slot = self.slot.lock();
        slot.response = None;
        slot.cancelled = false;
    }

    /// Offers a response. Returns false if it does not answer the current sequence.
    pub fn publish(&self, ack: TransmitterAck) -> bool {
        {
            let mut slot = self.slot.lock();
            if ack.sequence != slot.sequence {
                tracing::warn!(
                    "ignoring response for sequence {}, expected {}",
                    ack.sequence,
                    slot.sequence
                );
                return false;
            }
            slot.response = Some(ack);
        }
        self.notify.notify_one();
        true
    }

    /// Wakes a pending waiter without a response.
    pub fn cancel(&self) {
        self.slot.lock().cancelled = true;
        self.notify.notify_one();
    }

    /// Waits for the response to the current sequence.
    ///
    /// Returns `None` on timeout or cancellation.
    pub async fn wait(&self, timeout: Duration) -> Option<TransmitterAck> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut slot = self.slot.lock();
                if let Some(ack) = slot.response.take() {
                    return Some(ack);
                }
                if slot.cancelled {
                    return None;
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }
}
