//! Connection state machine.
//!
//! ```text
//! OFFLINE -> CONNECTING -> RESET_SENT -> STATUS_REQUESTED -> CONFIGURED -> RUNNING
//!     ^           |                                                          |
//!     +------ FAILED <------------------ link error -------------------------+
//! ```
//!
//! The first three steps run inside [`Controller::connect`]. The rest is
//! driven by interface messages arriving on the inbound dispatch task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::config::BridgeConfig;
use crate::correlator::Correlator;
use crate::error::{DecodeError, Error, FrameError, Result, TransportError};
use crate::event::{BridgeEvent, EventDispatcher};
use crate::listener::ListenerRegistry;
use crate::protocol::{
    CMD_GET_STATUS, CMD_RESET, CMD_START_RECEIVER, InterfaceCommand, InterfaceControlMessage,
    InterfaceMessage, InterfaceSubType, Message, TransceiverStatus, TransceiverType,
    TransmitterSubType, decode, parse_set_mode,
};
use crate::state::{BridgeStatus, ConnectionState, StatusDetail};
use crate::transport::{PacketSink, Transport, TransportEvent, TransportFactory};

/// Owns the transport and runs the connection state machine of one bridge.
pub(crate) struct Controller {
    uid: String,
    config: BridgeConfig,
    factory: Arc<dyn TransportFactory>,
    transport: Mutex<Option<Box<dyn Transport>>>,
    connecting: Mutex<()>,
    state: RwLock<ConnectionState>,
    status: RwLock<BridgeStatus>,
    sink: RwLock<Option<PacketSink>>,
    shut_down: AtomicBool,
    pub(crate) correlator: Correlator,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) events: EventDispatcher,
}

impl Controller {
    pub(crate) fn new(
        uid: String,
        config: BridgeConfig,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            uid,
            config,
            factory,
            transport: Mutex::new(None),
            connecting: Mutex::new(()),
            state: RwLock::new(ConnectionState::Offline),
            status: RwLock::new(BridgeStatus::default()),
            sink: RwLock::new(None),
            shut_down: AtomicBool::new(false),
            correlator: Correlator::new(),
            listeners: ListenerRegistry::new(),
            events: EventDispatcher::new(64),
        }
    }

    pub(crate) fn uid(&self) -> &str {
        &self.uid
    }

    pub(crate) const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state.read().clone()
    }

    pub(crate) fn status(&self) -> BridgeStatus {
        *self.status.read()
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Arms the controller with the sink of a fresh inbound dispatch task.
    pub(crate) fn open(&self, sink: PacketSink) {
        self.shut_down.store(false, Ordering::SeqCst);
        *self.sink.write() = Some(sink);
    }

    fn set_state(&self, state: ConnectionState) {
        {
            let mut current = self.state.write();
            if *current == state {
                return;
            }
            tracing::debug!("bridge {}: {} -> {}", self.uid, *current, state);
            *current = state.clone();
        }
        self.events.dispatch(BridgeEvent::StateChanged(state));
    }

    fn set_status(&self, status: BridgeStatus) {
        {
            let mut current = self.status.write();
            if *current == status {
                return;
            }
            *current = status;
        }
        tracing::info!("bridge {}: status {}", self.uid, status);
        self.events.dispatch(BridgeEvent::StatusChanged(status));
    }

    /// Records a failure and takes the bridge offline. The transport is left as is.
    pub(crate) fn mark_offline(&self, reason: impl Into<String>, detail: StatusDetail) {
        self.set_state(ConnectionState::Failed(reason.into()));
        self.set_state(ConnectionState::Offline);
        self.set_status(BridgeStatus::Offline(Some(detail)));
    }

    /// Disconnects and releases the transport, then takes the bridge offline.
    async fn go_offline(&self, reason: impl Into<String>, detail: StatusDetail) {
        let transport = self.transport.lock().await.take();
        if let Some(mut transport) = transport {
            if let Err(e) = transport.disconnect().await {
                tracing::debug!("bridge {}: disconnect failed: {}", self.uid, e);
            }
        }
        self.mark_offline(reason, detail);
    }

    /// Reconnects unless the receiver is running.
    pub(crate) async fn tick(&self) {
        let running = *self.state.read() == ConnectionState::Running;
        if running {
            return;
        }
        self.connect().await;
    }

    /// Opens the transport, resets the transceiver and requests its status.
    ///
    /// Concurrent calls are skipped while one is in progress. The link is
    /// opened and reset outside the transport lock, so writers fail fast with
    /// `NotConnected` instead of waiting on a slow connect.
    pub(crate) async fn connect(&self) {
        let Ok(_connecting) = self.connecting.try_lock() else {
            tracing::debug!("bridge {}: connect already in progress", self.uid);
            return;
        };

        self.set_state(ConnectionState::Connecting);

        let Some(selector) = self.config.transport() else {
            let err = TransportError::Unavailable;
            tracing::error!("bridge {}: {}", self.uid, err);
            self.mark_offline(err.to_string(), StatusDetail::ConfigurationError);
            return;
        };

        let previous = self.transport.lock().await.take();
        let mut transport = previous.unwrap_or_else(|| self.factory.create(&selector));

        if let Err(e) = transport.disconnect().await {
            tracing::debug!("bridge {}: disconnect before connect failed: {}", self.uid, e);
        }

        if let Err(e) = transport.connect().await {
            self.log_connect_error(&e);
            self.mark_offline(e.to_string(), StatusDetail::CommunicationError);
            return;
        }

        tracing::debug!("bridge {}: reset controller", self.uid);
        if let Err(e) = transport.write(Bytes::from_static(&CMD_RESET)).await {
            self.abandon(transport, e).await;
            return;
        }
        self.set_state(ConnectionState::ResetSent);

        // the transceiver does not answer right after a reset
        tokio::time::sleep(self.config.reset_delay).await;

        let sink = self.sink.read().clone();
        let Some(sink) = sink else {
            tracing::debug!("bridge {}: shut down while connecting", self.uid);
            if let Err(e) = transport.disconnect().await {
                tracing::debug!("bridge {}: disconnect failed: {}", self.uid, e);
            }
            return;
        };
        transport.subscribe(sink);
        *self.transport.lock().await = Some(transport);

        // set first, the answer may be handled before the write returns
        self.set_state(ConnectionState::StatusRequested);
        tracing::debug!("bridge {}: get status of controller", self.uid);
        if let Err(e) = self.write(Bytes::from_static(&CMD_GET_STATUS)).await {
            tracing::error!("bridge {}: transceiver initialization failed: {}", self.uid, e);
            self.go_offline(e.to_string(), StatusDetail::CommunicationError)
                .await;
        }
    }

    /// Closes a transport that failed during initialization and goes offline.
    async fn abandon(&self, mut transport: Box<dyn Transport>, err: Error) {
        tracing::error!("bridge {}: transceiver initialization failed: {}", self.uid, err);
        if let Err(e) = transport.disconnect().await {
            tracing::debug!("bridge {}: disconnect failed: {}", self.uid, e);
        }
        self.mark_offline(err.to_string(), StatusDetail::CommunicationError);
    }

    fn log_connect_error(&self, err: &Error) {
        match err {
            Error::Transport(TransportError::DeviceBusy { device, hint }) => {
                tracing::error!(
                    "bridge {}: connection to RFXCOM transceiver failed: {}",
                    self.uid,
                    err
                );
                tracing::info!(
                    "bridge {}: {} is held by another driver or process, {}",
                    self.uid,
                    device,
                    hint
                );
            }
            Error::Transport(TransportError::NativeLink { .. }) => {
                tracing::error!(
                    "bridge {}: native USB support failed on OS '{}', arch '{}': {}",
                    self.uid,
                    std::env::consts::OS,
                    std::env::consts::ARCH,
                    err
                );
            }
            _ => {
                tracing::error!(
                    "bridge {}: connection to RFXCOM transceiver failed: {}",
                    self.uid,
                    err
                );
            }
        }
    }

    /// Writes a frame on the current transport.
    pub(crate) async fn write(&self, frame: Bytes) -> Result<()> {
        let mut guard = self.transport.lock().await;
        let transport = guard.as_mut().ok_or(Error::NotConnected)?;
        transport.write(frame).await
    }

    /// Handles one event from the transport.
    pub(crate) async fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Packet(packet) => self.handle_packet(&packet).await,
            TransportEvent::Closed(e) => {
                tracing::error!("bridge {}: link lost: {}", self.uid, e);
                self.go_offline(e.to_string(), StatusDetail::CommunicationError)
                    .await;
            }
        }
    }

    async fn handle_packet(&self, packet: &[u8]) {
        let message = match decode(packet) {
            Ok(message) => message,
            Err(DecodeError::NotImplemented { .. }) => {
                tracing::debug!(
                    "bridge {}: message not supported, data: {}",
                    self.uid,
                    hex::encode_upper(packet)
                );
                return;
            }
            Err(e) => {
                tracing::error!(
                    "bridge {}: error decoding packet {}: {}",
                    self.uid,
                    hex::encode_upper(packet),
                    e
                );
                return;
            }
        };
        tracing::debug!("bridge {}: message received: {:?}", self.uid, message);

        match message {
            Message::Interface(msg) => {
                if let Err(e) = self.handle_interface(&msg).await {
                    tracing::error!("bridge {}: I/O error: {}", self.uid, e);
                    self.go_offline(e.to_string(), StatusDetail::CommunicationError)
                        .await;
                }
            }
            Message::Transmitter(ack) => {
                if ack.sub_type == TransmitterSubType::ErrorReceiverDidNotLock {
                    tracing::warn!("bridge {}: receiver did not lock", self.uid);
                }
                self.correlator.publish(ack);
            }
            Message::Device(msg) => {
                self.listeners.dispatch(&self.uid, &msg);
            }
            Message::InterfaceControl(msg) => {
                tracing::debug!("bridge {}: ignoring interface control {:?}", self.uid, msg);
            }
        }
    }

    async fn handle_interface(&self, msg: &InterfaceMessage) -> Result<()> {
        match msg.sub_type {
            InterfaceSubType::Response => {
                let Some(status) = &msg.status else {
                    return Ok(());
                };
                tracing::info!(
                    "bridge {}: RFXCOM transceiver type: {}, hw version: {}.{}, fw version: {}",
                    self.uid,
                    status.transceiver_type,
                    status.hardware_major,
                    status.hardware_minor,
                    status.firmware_version
                );
                tracing::debug!(
                    "bridge {}: enabled protocols: {:?}",
                    self.uid,
                    status.protocols.iter().collect::<Vec<_>>()
                );

                if msg.command == InterfaceCommand::GetStatus {
                    self.configure(status).await?;
                }
            }
            InterfaceSubType::StartReceiver => {
                if let Some(text) = &msg.text {
                    tracing::debug!("bridge {}: receiver started: {}", self.uid, text);
                }
                self.set_state(ConnectionState::Running);
                self.set_status(BridgeStatus::Online);
            }
            other => {
                tracing::debug!("bridge {}: ignoring interface message {:?}", self.uid, other);
            }
        }
        Ok(())
    }

    /// Applies the receiving modes and starts the receiver.
    ///
    /// SET_MODE is not acknowledged; the transceiver queues it ahead of the
    /// start command.
    async fn configure(&self, status: &TransceiverStatus) -> Result<()> {
        if self.config.ignore_config {
            tracing::debug!("bridge {}: ignoring transceiver configuration", self.uid);
        } else {
            let frame = self.set_mode_frame(status.transceiver_type)?;
            tracing::debug!(
                "bridge {}: setting RFXCOM mode using: {}",
                self.uid,
                hex::encode_upper(&frame)
            );
            self.write(frame).await?;
        }
        self.set_state(ConnectionState::Configured);

        tracing::debug!("bridge {}: start receiver", self.uid);
        self.write(Bytes::from_static(&CMD_START_RECEIVER)).await
    }

    fn set_mode_frame(
        &self,
        transceiver_type: TransceiverType,
    ) -> std::result::Result<Bytes, FrameError> {
        let literal = self.config.set_mode.as_deref().map(str::trim);
        if let Some(literal) = literal.filter(|s| !s.is_empty()) {
            match parse_set_mode(literal) {
                Ok(frame) => return Ok(Bytes::copy_from_slice(&frame)),
                Err(e) => {
                    tracing::warn!(
                        "bridge {}: invalid RFXCOM transceiver mode configuration '{}': {}",
                        self.uid,
                        literal,
                        e
                    );
                }
            }
        }

        Message::InterfaceControl(InterfaceControlMessage::set_mode(
            transceiver_type,
            self.config.protocols,
        ))
        .encode()
    }

    /// Cancels any waiter, closes the transport and marks the bridge offline.
    pub(crate) async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        self.correlator.cancel();
        *self.sink.write() = None;

        let transport = self.transport.lock().await.take();
        if let Some(mut transport) = transport {
            if let Err(e) = transport.disconnect().await {
                tracing::warn!("bridge {}: disconnect failed: {}", self.uid, e);
            }
        }

        self.set_state(ConnectionState::Offline);
        self.set_status(BridgeStatus::Offline(None));
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("uid", &self.uid)
            .field("state", &*self.state.read())
            .field("status", &*self.status.read())
            .finish_non_exhaustive()
    }
}
