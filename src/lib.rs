//! # rfxcom
//!
//! A Rust bridge controller for RFXCOM 433 MHz transceivers.
//!
//! The bridge owns one link to an RFXtrx unit (serial port, USB FTDI device
//! or TCP socket), drives it through reset, status and configuration until the
//! receiver runs, transmits messages one at a time with acknowledgement, and
//! hands received device messages to registered listeners.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Periodic reconnection after link failures
//! - Event-driven state and status notifications
//! - Type-safe protocol implementation
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rfxcom::{BridgeConfig, DeviceMessage, PacketType, Protocol, RfxcomBridge};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rfxcom::Error> {
//!     let config = BridgeConfig::serial("/dev/ttyUSB0")
//!         .enable(Protocol::Ac)
//!         .enable(Protocol::X10);
//!     let bridge = RfxcomBridge::new("rfxcom:usb0", config);
//!
//!     bridge.register_listener(Arc::new(
//!         |bridge: &str, message: &DeviceMessage| -> Result<(), rfxcom::ListenerError> {
//!             println!("{bridge}: {:?}", message);
//!             Ok(())
//!         },
//!     ));
//!
//!     bridge.start();
//!
//!     // Switch X10 device A1 on
//!     let on = DeviceMessage::new(PacketType::Lighting1, 0x00, vec![0x41, 0x01, 0x01, 0x00]);
//!     let receipt = bridge.send(on).await?;
//!     println!("acknowledged: {:?}", receipt.response);
//!
//!     bridge.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Wire framing, packet types, canned commands and the message codec
//! - [`transport`] - Serial, FTDI and TCP transports
//! - [`correlator`] - Sequence numbers and transmitter response rendezvous
//! - [`listener`] - Device message listener registry
//! - [`event`] - State and status notifications
//! - [`bridge`] - High-level [`RfxcomBridge`] facade

pub mod bridge;
pub mod config;
mod connection;
pub mod correlator;
pub mod error;
pub mod event;
pub mod listener;
pub mod protocol;
pub mod state;
mod supervisor;
pub mod transport;

// Re-exports for convenience
pub use bridge::{RfxcomBridge, SendReceipt};
pub use config::{BridgeConfig, TransportConfig};
pub use error::{DecodeError, Error, FrameError, Result, TransportError};
pub use event::{BridgeEvent, EventDispatcher, Subscription};
pub use listener::{DeviceMessageListener, ListenerError, ListenerRegistry};
pub use protocol::{
    DeviceMessage, InterfaceMessage, Message, PacketType, Protocol, ProtocolSet, TransceiverType,
    TransmitterAck, TransmitterResponse,
};
pub use state::{BridgeStatus, ConnectionState, StatusDetail};
pub use transport::{
    DefaultTransportFactory, PacketSink, Transport, TransportEvent, TransportFactory,
};
