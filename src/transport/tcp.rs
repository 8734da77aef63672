//! TCP transport for RFXCOM LAN interfaces.

use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tokio::net::TcpStream;

use crate::error::{Error, Result, TransportError};
use crate::transport::link::{Link, SharedSink};
use crate::transport::{PacketSink, Transport};

/// TCP transport.
pub struct TcpTransport {
    host: String,
    port: u16,
    link: Option<Link>,
    sink: SharedSink,
}

impl TcpTransport {
    /// Creates a transport for `host:port`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            link: None,
            sink: Arc::new(RwLock::new(None)),
        }
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.link.is_some() {
                return Ok(());
            }

            tracing::info!("connecting to {}", self.target());
            let stream = TcpStream::connect((self.host.as_str(), self.port))
                .await
                .map_err(|e| TransportError::ConnectFailed {
                    target: self.target(),
                    reason: e.to_string(),
                })?;

            if let Err(e) = stream.set_nodelay(true) {
                tracing::warn!("failed to set TCP_NODELAY: {}", e);
            }

            let (reader, writer) = stream.into_split();
            self.link = Some(Link::spawn(reader, writer, Arc::clone(&self.sink)));

            tracing::info!("connected to {}", self.target());
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if let Some(link) = self.link.take() {
                tracing::info!("disconnecting from {}", self.target());
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
