//! USB FTDI transport.
//!
//! RFXtrx units are built around an FTDI USB UART. A bridge is addressed by
//! the FTDI serial number, resolved to its port through USB enumeration and
//! then opened with the usual serial line settings.

use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tokio_serial::SerialPortType;

use crate::error::{Error, Result, TransportError};
use crate::transport::link::{Link, SharedSink};
use crate::transport::serial::{SerialConfig, open_port};
use crate::transport::{PacketSink, Transport};

/// USB vendor id of Future Technology Devices International.
pub const FTDI_VENDOR_ID: u16 = 0x0403;

/// An FTDI device found on the USB bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtdiBridge {
    /// FTDI serial number, used as the bridge id.
    pub serial_number: String,
    /// Port the device is reachable through.
    pub port: String,
    /// USB product string.
    pub product: Option<String>,
}

/// Lists attached FTDI devices.
///
/// # Errors
///
/// Returns `TransportError::NativeLink` if the platform's USB enumeration fails.
pub fn list_bridges() -> std::result::Result<Vec<FtdiBridge>, TransportError> {
    let ports = tokio_serial::available_ports().map_err(|e| TransportError::NativeLink {
        reason: e.description,
    })?;

    Ok(ports
        .into_iter()
        .filter_map(|port| match port.port_type {
            SerialPortType::UsbPort(info) if info.vid == FTDI_VENDOR_ID => Some(FtdiBridge {
                serial_number: info.serial_number?,
                port: port.port_name,
                product: info.product,
            }),
            _ => None,
        })
        .collect())
}

/// Transport for an RFXtrx addressed by its FTDI serial number.
pub struct FtdiTransport {
    bridge_id: String,
    link: Option<Link>,
    sink: SharedSink,
}

impl FtdiTransport {
    /// Creates a transport for the given bridge id.
    #[must_use]
    pub fn new(bridge_id: impl Into<String>) -> Self {
        Self {
            bridge_id: bridge_id.into(),
            link: None,
            sink: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the bridge id.
    #[must_use]
    pub fn bridge_id(&self) -> &str {
        &self.bridge_id
    }

    fn resolve(&self) -> std::result::Result<FtdiBridge, TransportError> {
        let bridges = list_bridges()?;
        tracing::debug!("found {} FTDI device(s)", bridges.len());

        bridges
            .into_iter()
            .find(|b| b.serial_number == self.bridge_id)
            .ok_or_else(|| TransportError::NoSuchPort {
                port: self.bridge_id.clone(),
            })
    }
}

impl Transport for FtdiTransport {
    fn connect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.link.is_some() {
                return Ok(());
            }

            let bridge = self.resolve()?;
            tracing::info!("FTDI bridge {} is at {}", bridge.serial_number, bridge.port);

            let stream = open_port(&SerialConfig::new(&bridge.port)).map_err(|e| match e {
                TransportError::DeviceBusy { .. } => TransportError::DeviceBusy {
                    device: self.bridge_id.clone(),
                    hint: format!(
                        "release the device from the process holding it, \
                         or configure serial port {} to use the generic serial transport",
                        bridge.port
                    ),
                },
                other => other,
            })?;

            let (reader, writer) = tokio::io::split(stream);
            self.link = Some(Link::spawn(reader, writer, Arc::clone(&self.sink)));
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if let Some(link) = self.link.take() {
                tracing::info!("disconnecting from FTDI bridge {}", self.bridge_id);
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
