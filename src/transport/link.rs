//! An open byte link with its background reader.

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

use crate::error::Error;
use crate::protocol::FrameDecoder;
use crate::transport::{PacketSink, TransportEvent};

/// Sink slot shared between a transport and its reader task.
pub(crate) type SharedSink = Arc<RwLock<Option<PacketSink>>>;

/// Write half of an open link plus the task reading the other half.
pub(crate) struct Link {
    writer: Box<dyn AsyncWrite + Send + Sync + Unpin>,
    reader: JoinHandle<()>,
}

impl Link {
    /// Spawns the reader task and keeps the writer.
    pub(crate) fn spawn<R, W>(reader: R, writer: W, sink: SharedSink) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Sync + Unpin + 'static,
    {
        let reader = tokio::spawn(run_read_loop(reader, FrameDecoder::new(), sink));
        Self {
            writer: Box::new(writer),
            reader,
        }
    }

    /// Writes and flushes a frame.
    pub(crate) async fn write(&mut self, frame: &[u8]) -> io::Result<()> {
        tracing::trace!("writing frame: {}", hex::encode_upper(frame));
        self.writer.write_all(frame).await?;
        self.writer.flush().await
    }

    /// Shuts the writer down and stops the reader.
    pub(crate) async fn close(mut self) {
        if let Err(e) = self.writer.shutdown().await {
            tracing::debug!("link shutdown: {}", e);
        }
        self.reader.abort();
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Reads from the link until it fails, delivering each packet to the current sink.
async fn run_read_loop<R>(mut reader: R, mut decoder: FrameDecoder, sink: SharedSink)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 1024];

    let err = loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                break io::Error::new(io::ErrorKind::UnexpectedEof, "link closed by peer");
            }
            Ok(n) => n,
            Err(e) => break e,
        };

        tracing::trace!("received {} bytes", n);
        decoder.feed(&buf[..n]);

        while let Some(packet) = decoder.decode() {
            deliver(&sink, packet).await;
        }
    };

    if decoder.buffered() > 0 {
        tracing::debug!("discarding {} bytes of partial packet", decoder.buffered());
    }
    tracing::warn!("read loop ended: {}", err);

    let current = sink.read().clone();
    if let Some(tx) = current {
        let _ = tx.send(TransportEvent::Closed(Error::Io(err))).await;
    }
}

async fn deliver(sink: &SharedSink, packet: Bytes) {
    let current = sink.read().clone();
    match current {
        Some(tx) => {
            if tx.send(TransportEvent::Packet(packet)).await.is_err() {
                tracing::debug!("packet receiver dropped");
            }
        }
        None => {
            tracing::debug!("no subscriber, dropping packet {}", hex::encode_upper(&packet));
        }
    }
}
