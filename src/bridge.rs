//! Main [`RfxcomBridge`] implementation.
//!
//! This module provides the facade hosts use: lifecycle, transmission with
//! acknowledgement, listener registration and status.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::BridgeConfig;
use crate::connection::Controller;
use crate::error::{Error, Result};
use crate::event::Subscription;
use crate::listener::DeviceMessageListener;
use crate::protocol::{Message, TransmitterResponse};
use crate::state::{BridgeStatus, ConnectionState, StatusDetail};
use crate::supervisor::Supervisor;
use crate::transport::{DefaultTransportFactory, TransportEvent, TransportFactory};

/// Capacity of the inbound packet channel.
const INBOUND_CAPACITY: usize = 256;

/// Outcome of an acknowledged transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReceipt {
    /// Sequence number the message was sent with.
    pub sequence: u8,
    /// Transceiver response.
    pub response: TransmitterResponse,
}

impl SendReceipt {
    /// Returns true if the transceiver refused to transmit.
    #[must_use]
    pub const fn warning(&self) -> bool {
        !self.response.is_ack()
    }
}

#[derive(Default)]
struct Tasks {
    inbound: Option<JoinHandle<()>>,
    supervisor: Option<Supervisor>,
}

/// Bridge to one RFXCOM transceiver.
pub struct RfxcomBridge {
    controller: Arc<Controller>,
    send_lock: tokio::sync::Mutex<()>,
    tasks: Mutex<Tasks>,
}

impl RfxcomBridge {
    /// Creates a bridge using the built-in transports.
    #[must_use]
    pub fn new(uid: impl Into<String>, config: BridgeConfig) -> Self {
        Self::with_transport_factory(uid, config, DefaultTransportFactory)
    }

    /// Creates a bridge whose transports come from `factory`.
    #[must_use]
    pub fn with_transport_factory(
        uid: impl Into<String>,
        config: BridgeConfig,
        factory: impl TransportFactory + 'static,
    ) -> Self {
        Self {
            controller: Arc::new(Controller::new(uid.into(), config, Arc::new(factory))),
            send_lock: tokio::sync::Mutex::new(()),
            tasks: Mutex::new(Tasks::default()),
        }
    }

    /// Returns the bridge identifier.
    #[must_use]
    pub fn uid(&self) -> &str {
        self.controller.uid()
    }

    /// Starts inbound dispatch and the supervisor, which connects right away.
    ///
    /// Must be called from within a Tokio runtime. Starting a started bridge
    /// is a no-op.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if tasks.supervisor.as_ref().is_some_and(Supervisor::is_running) {
            tracing::debug!("bridge {}: already started", self.uid());
            return;
        }

        tracing::info!("bridge {}: starting", self.uid());

        let (tx, mut rx) = mpsc::channel::<TransportEvent>(INBOUND_CAPACITY);
        self.controller.open(tx);

        let controller = Arc::clone(&self.controller);
        tasks.inbound = Some(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                controller.handle_event(event).await;
            }
        }));

        tasks.supervisor = Some(Supervisor::spawn(
            Arc::clone(&self.controller),
            self.controller.config().check_interval,
        ));
    }

    /// Stops the bridge. Same as [`shutdown`](Self::shutdown).
    pub async fn stop(&self) {
        self.shutdown().await;
    }

    /// Unregisters all listeners, stops the background tasks, closes the
    /// transport and marks the bridge offline. Idempotent.
    pub async fn shutdown(&self) {
        tracing::info!("bridge {}: shutting down", self.uid());

        self.controller.listeners.clear();
        {
            let mut tasks = self.tasks.lock();
            if let Some(mut supervisor) = tasks.supervisor.take() {
                supervisor.cancel();
            }
            if let Some(inbound) = tasks.inbound.take() {
                inbound.abort();
            }
        }
        self.controller.shutdown().await;
    }

    /// Transmits a message and waits for the transceiver to acknowledge it.
    ///
    /// Only one transmission is outstanding at a time; concurrent callers
    /// queue. A NAK is returned as a receipt with [`SendReceipt::warning`] set.
    ///
    /// # Errors
    ///
    /// Returns `Error::SendFailed` if the frame cannot be written and
    /// `Error::Timeout` if no response arrives in time. Both take the bridge
    /// offline until the supervisor reconnects it.
    pub async fn send(&self, message: impl Into<Message>) -> Result<SendReceipt> {
        let mut message = message.into();
        let _send = self.send_lock.lock().await;

        let correlator = &self.controller.correlator;
        let sequence = correlator.next_sequence();
        message.set_sequence(sequence);
        let frame = message.encode()?;

        tracing::debug!("bridge {}: transmitting message {:?}", self.uid(), message);
        tracing::trace!("bridge {}: transmitting data {}", self.uid(), hex::encode_upper(&frame));

        correlator.clear();

        if let Err(e) = self.controller.write(frame).await {
            tracing::error!("bridge {}: send failed: {}", self.uid(), e);
            if !self.controller.is_shut_down() {
                self.controller
                    .mark_offline(e.to_string(), StatusDetail::CommunicationError);
            }
            return Err(Error::SendFailed(Box::new(e)));
        }

        let timeout = self.controller.config().response_timeout;
        let Some(ack) = correlator.wait(timeout).await else {
            if self.controller.is_shut_down() {
                return Err(Error::SendFailed(Box::new(Error::NotConnected)));
            }
            let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(
                "bridge {}: no response received from transceiver, timeout {}ms",
                self.uid(),
                timeout_ms
            );
            self.controller
                .mark_offline("no response from transceiver", StatusDetail::CommunicationError);
            return Err(Error::Timeout { timeout_ms });
        };

        if ack.response.is_ack() {
            tracing::debug!(
                "bridge {}: command successfully transmitted, {:?} received",
                self.uid(),
                ack.response
            );
        } else {
            tracing::warn!(
                "bridge {}: transceiver refused message {}, {:?} received",
                self.uid(),
                sequence,
                ack.response
            );
        }

        Ok(SendReceipt {
            sequence,
            response: ack.response,
        })
    }

    /// Adds a device message listener. Returns false if already registered.
    pub fn register_listener(&self, listener: Arc<dyn DeviceMessageListener>) -> bool {
        self.controller.listeners.register(listener)
    }

    /// Removes a device message listener. Returns false if not registered.
    pub fn unregister_listener(&self, listener: &Arc<dyn DeviceMessageListener>) -> bool {
        self.controller.listeners.unregister(listener)
    }

    /// Returns the bridge status.
    #[must_use]
    pub fn status(&self) -> BridgeStatus {
        self.controller.status()
    }

    /// Returns the connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.controller.state()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn configuration(&self) -> &BridgeConfig {
        self.controller.config()
    }

    /// Subscribes to state and status changes.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.controller.events.subscribe()
    }
}

impl Drop for RfxcomBridge {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut();
        if let Some(mut supervisor) = tasks.supervisor.take() {
            supervisor.cancel();
        }
        if let Some(inbound) = tasks.inbound.take() {
            inbound.abort();
        }
    }
}

impl std::fmt::Debug for RfxcomBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RfxcomBridge")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}
