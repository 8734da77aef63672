//! Error types for the rfxcom library.

use thiserror::Error;

/// The main error type for rfxcom operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame encoding error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Packet could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Transport could not be selected or connected.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Writing a transmission request to the transceiver failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] Box<Error>),

    /// The transceiver did not acknowledge a transmission in time.
    #[error("no response from transceiver after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,
}

/// Frame-specific errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Zero-length payloads cannot be framed.
    #[error("empty frame payload")]
    Empty,

    /// Frame payload exceeds maximum size.
    #[error("frame too large: {size} bytes exceeds maximum {max}")]
    TooLarge { size: usize, max: usize },
}

/// Packet decoding errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The packet type or subtype has no decoder.
    #[error("message not implemented: packet type 0x{packet_type:02X}, subtype 0x{sub_type:02X}")]
    NotImplemented { packet_type: u8, sub_type: u8 },

    /// Packet shorter than its type requires.
    #[error("{kind} packet too short: need {expected} bytes, got {got}")]
    TooShort {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    /// A field holds a value the protocol does not define.
    #[error("invalid {field} value 0x{value:02X}")]
    InvalidValue { field: &'static str, value: u8 },
}

/// Transport selection and connection errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// None of the transport selectors is configured.
    #[error("no transport configured: set a serial port, bridge id or host")]
    Unavailable,

    /// The named port or device does not exist.
    #[error("no such port: {port}")]
    NoSuchPort { port: String },

    /// The device is claimed by another driver or process.
    #[error("device {device} is busy: {hint}")]
    DeviceBusy { device: String, hint: String },

    /// Opening the link failed.
    #[error("connection to {target} failed: {reason}")]
    ConnectFailed { target: String, reason: String },

    /// A platform library the transport relies on is unavailable.
    #[error("native link error: {reason}")]
    NativeLink { reason: String },
}

/// Result type alias for rfxcom operations.
pub type Result<T> = std::result::Result<T, Error>;
