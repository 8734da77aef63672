//! Frame encoding and decoding for the RFXCOM link.
//!
//! Every packet on the wire is prefixed by a single length byte:
//! ```text
//! ┌──────────┬─────────────────┐
//! │  length  │    payload      │
//! │  1 byte  │  length bytes   │
//! └──────────┴─────────────────┘
//! ```
//! The length counts the payload only. There is no header marker and no checksum.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FrameError;

/// Maximum frame payload size.
pub const MAX_FRAME_SIZE: usize = 255;

/// Encodes a payload into a length-prefixed frame.
///
/// # Errors
///
/// Returns a `FrameError` if the payload is empty or longer than `MAX_FRAME_SIZE`.
pub fn encode(payload: &[u8]) -> Result<Bytes, FrameError> {
    if payload.is_empty() {
        return Err(FrameError::Empty);
    }
    let len = u8::try_from(payload.len()).map_err(|_| FrameError::TooLarge {
        size: payload.len(),
        max: MAX_FRAME_SIZE,
    })?;

    let mut buf = BytesMut::with_capacity(1 + payload.len());
    buf.put_u8(len);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Frame decoder that handles partial data.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Creates a new frame decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Feeds data into the decoder.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next complete packet.
    ///
    /// Returns the payload without its length byte, or `None` if more data
    /// is needed. Zero length bytes never start a packet and are skipped.
    pub fn decode(&mut self) -> Option<Bytes> {
        loop {
            let &len = self.buffer.first()?;
            if len == 0 {
                tracing::debug!("skipping zero length byte");
                self.buffer.advance(1);
                continue;
            }

            let len = usize::from(len);
            if self.buffer.len() < 1 + len {
                return None;
            }

            self.buffer.advance(1);
            return Some(self.buffer.split_to(len).freeze());
        }
    }

    /// Returns the number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
