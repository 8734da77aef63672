//! Transport layer for RFXCOM communication.
//!
//! A transport is a byte conduit to one transceiver. Outbound frames are
//! written verbatim; inbound bytes are framed by a background reader task and
//! delivered as [`TransportEvent`]s to the single subscribed sink.

pub mod ftdi;
mod link;
pub mod serial;
pub mod tcp;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::config::TransportConfig;
use crate::error::{Error, Result};

pub use ftdi::{FtdiBridge, FtdiTransport, list_bridges};
pub use serial::{SerialConfig, SerialTransport};
pub use tcp::TcpTransport;

/// Something that happened on a transport link.
#[derive(Debug)]
pub enum TransportEvent {
    /// A complete packet payload (without its length byte).
    Packet(Bytes),
    /// The link failed or was closed by the peer.
    Closed(Error),
}

/// Channel receiving transport events.
pub type PacketSink = mpsc::Sender<TransportEvent>;

/// Trait for transport implementations.
pub trait Transport: Send + Sync {
    /// Opens the link.
    fn connect(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Closes the link. Closing a closed link is a no-op.
    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Writes a complete wire frame.
    fn write(&mut self, frame: Bytes) -> BoxFuture<'_, Result<()>>;

    /// Sets the sink for inbound packets, replacing any previous one.
    ///
    /// Packets arriving while no sink is set are dropped.
    fn subscribe(&mut self, sink: PacketSink);

    /// Returns true if connected.
    fn is_connected(&self) -> bool;
}

/// Creates transports for a resolved selector.
pub trait TransportFactory: Send + Sync {
    /// Creates an unconnected transport.
    fn create(&self, config: &TransportConfig) -> Box<dyn Transport>;
}

impl<F> TransportFactory for F
where
    F: Fn(&TransportConfig) -> Box<dyn Transport> + Send + Sync,
{
    fn create(&self, config: &TransportConfig) -> Box<dyn Transport> {
        self(config)
    }
}

/// Factory for the built-in serial, FTDI and TCP transports.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    fn create(&self, config: &TransportConfig) -> Box<dyn Transport> {
        match config {
            TransportConfig::Serial { port } => Box::new(SerialTransport::with_port(port.clone())),
            TransportConfig::Ftdi { bridge_id } => Box::new(FtdiTransport::new(bridge_id.clone())),
            TransportConfig::Tcp { host, port } => Box::new(TcpTransport::new(host.clone(), *port)),
        }
    }
}
