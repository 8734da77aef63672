//! Event system for bridge state notifications.
//!
//! Hosts subscribe to follow the connection state machine and the status
//! they should display for the bridge.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::state::{BridgeStatus, ConnectionState};

/// Event types that can be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// The connection state machine moved.
    StateChanged(ConnectionState),
    /// The bridge status changed.
    StatusChanged(BridgeStatus),
}

/// A subscription to events.
pub struct Subscription {
    receiver: broadcast::Receiver<BridgeEvent>,
}

impl Subscription {
    /// Receives the next event.
    ///
    /// Returns `None` once the dispatcher is gone. Lagged events are skipped.
    pub async fn recv(&mut self) -> Option<BridgeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("subscription lagged, skipped {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<BridgeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => return None,
            }
        }
    }

    /// Waits for an event matching the predicate with timeout.
    pub async fn wait_for<P>(&mut self, mut predicate: P, timeout: Duration) -> Option<BridgeEvent>
    where
        P: FnMut(&BridgeEvent) -> bool,
    {
        tokio::select! {
            biased;
            result = async {
                loop {
                    match self.recv().await {
                        Some(event) if predicate(&event) => return Some(event),
                        Some(_) => {}
                        None => return None,
                    }
                }
            } => result,
            () = tokio::time::sleep(timeout) => None,
        }
    }
}

struct EventDispatcherInner {
    sender: broadcast::Sender<BridgeEvent>,
}

/// Dispatches events to subscribers.
#[derive(Clone)]
pub struct EventDispatcher {
    inner: Arc<EventDispatcherInner>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(EventDispatcherInner { sender }),
        }
    }

    /// Dispatches an event to all subscribers.
    pub fn dispatch(&self, event: BridgeEvent) {
        // No receivers is fine
        let _ = self.inner.sender.send(event);
    }

    /// Subscribes to events.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.inner.sender.subscribe(),
        }
    }

    /// Subscribes and waits for an event matching the predicate with timeout.
    ///
    /// Only events dispatched after the call are considered.
    pub async fn wait_for<P>(&self, predicate: P, timeout: Duration) -> Option<BridgeEvent>
    where
        P: FnMut(&BridgeEvent) -> bool,
    {
        self.subscribe().wait_for(predicate, timeout).await
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscribers", &self.inner.sender.receiver_count())
            .finish()
    }
}
