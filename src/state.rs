//! Connection state and bridge status.

use std::fmt;

/// Where the bridge is in its connect, reset, configure, run cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No link.
    #[default]
    Offline,
    /// Opening the transport.
    Connecting,
    /// Reset written, waiting for the transceiver to settle.
    ResetSent,
    /// Status requested, waiting for the interface response.
    StatusRequested,
    /// Receiving modes applied, waiting for the receiver to start.
    Configured,
    /// Receiver started.
    Running,
    /// The last connection attempt or the running link failed.
    Failed(String),
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => f.write_str("OFFLINE"),
            Self::Connecting => f.write_str("CONNECTING"),
            Self::ResetSent => f.write_str("RESET_SENT"),
            Self::StatusRequested => f.write_str("STATUS_REQUESTED"),
            Self::Configured => f.write_str("CONFIGURED"),
            Self::Running => f.write_str("RUNNING"),
            Self::Failed(reason) => write!(f, "FAILED({reason})"),
        }
    }
}

/// Why a bridge is offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusDetail {
    /// The link failed or the transceiver stopped answering.
    CommunicationError,
    /// The configuration does not select a transport.
    ConfigurationError,
}

/// Status reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeStatus {
    /// Receiver running.
    Online,
    /// Not usable.
    Offline(Option<StatusDetail>),
}

impl Default for BridgeStatus {
    fn default() -> Self {
        Self::Offline(None)
    }
}

impl BridgeStatus {
    /// Returns true if the bridge is online.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => f.write_str("ONLINE"),
            Self::Offline(None) => f.write_str("OFFLINE"),
            Self::Offline(Some(StatusDetail::CommunicationError)) => {
                f.write_str("OFFLINE (COMMUNICATION_ERROR)")
            }
            Self::Offline(Some(StatusDetail::ConfigurationError)) => {
                f.write_str("OFFLINE (CONFIGURATION_ERROR)")
            }
        }
    }
}
