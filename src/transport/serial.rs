//! Serial port transport.
//!
//! RFXtrx units enumerate as USB serial devices and talk 38400-8N1 without
//! flow control.

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tokio_serial::{
    DataBits, ErrorKind, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits,
};

use crate::error::{Error, Result, TransportError};
use crate::transport::link::{Link, SharedSink};
use crate::transport::{PacketSink, Transport};

/// Baud rate of RFXtrx transceivers.
pub const DEFAULT_BAUD_RATE: u32 = 38_400;

/// Configuration for serial transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM3").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
}

impl SerialConfig {
    /// Creates a new serial configuration with default settings.
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }
}

/// Serial transport for RFXCOM communication.
pub struct SerialTransport {
    config: SerialConfig,
    link: Option<Link>,
    sink: SharedSink,
}

impl SerialTransport {
    /// Creates a new serial transport with the given configuration.
    #[must_use]
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            link: None,
            sink: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a new serial transport for the given port with default settings.
    #[must_use]
    pub fn with_port(port: impl Into<String>) -> Self {
        Self::new(SerialConfig::new(port))
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SerialConfig {
        &self.config
    }
}

/// Opens and prepares a serial port: 8N1, no flow control, DTR and RTS asserted.
pub(crate) fn open_port(
    config: &SerialConfig,
) -> std::result::Result<SerialStream, TransportError> {
    tracing::info!("opening serial port {} at {} baud", config.port, config.baud_rate);

    let mut stream = tokio_serial::new(&config.port, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|e| classify_open_error(&config.port, &e))?;

    if let Err(e) = tokio_serial::SerialPort::write_data_terminal_ready(&mut stream, true) {
        tracing::warn!("failed to set DTR: {}", e);
    }
    if let Err(e) = tokio_serial::SerialPort::write_request_to_send(&mut stream, true) {
        tracing::warn!("failed to set RTS: {}", e);
    }
    lock_exclusive(&mut stream);

    Ok(stream)
}

#[cfg(unix)]
fn lock_exclusive(stream: &mut SerialStream) {
    if let Err(e) = stream.set_exclusive(true) {
        tracing::warn!("failed to lock serial port: {}", e);
    }
}

#[cfg(not(unix))]
fn lock_exclusive(_stream: &mut SerialStream) {}

/// Maps a port open failure onto the transport error taxonomy.
pub(crate) fn classify_open_error(port: &str, err: &tokio_serial::Error) -> TransportError {
    match err.kind {
        ErrorKind::NoDevice | ErrorKind::Io(io::ErrorKind::NotFound) => TransportError::NoSuchPort {
            port: port.to_owned(),
        },
        _ if is_busy(&err.description) => TransportError::DeviceBusy {
            device: port.to_owned(),
            hint: "close the other application using the port".to_owned(),
        },
        _ => TransportError::ConnectFailed {
            target: port.to_owned(),
            reason: err.description.clone(),
        },
    }
}

fn is_busy(description: &str) -> bool {
    let description = description.to_ascii_lowercase();
    description.contains("busy")
        || description.contains("in use")
        || description.contains("access is denied")
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.link.is_some() {
                return Ok(());
            }

            let stream = open_port(&self.config)?;
            let (reader, writer) = tokio::io::split(stream);
            self.link = Some(Link::spawn(reader, writer, Arc::clone(&self.sink)));

            tracing::info!("connected to serial port {}", self.config.port);
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if let Some(link) = self.link.take() {
                tracing::info!("disconnecting from serial port {}", self.config.port);
                link.close().await;
            }
            Ok(())
        })
    }

    fn write(&mut self, frame: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let link = self.link.as_mut().ok_or(Error::NotConnected)?;
            link.write(&frame).await.map_err(Error::Io)
        })
    }

    fn subscribe(&mut self, sink: PacketSink) {
        *self.sink.write() = Some(sink);
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}
