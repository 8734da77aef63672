//! Bridge configuration.
//!
//! Exactly one transport selector is used. When several are set the serial
//! port wins over the FTDI bridge id, which wins over the TCP host.

use std::time::Duration;

use crate::protocol::{Protocol, ProtocolSet};

/// Default TCP port of RFXCOM LAN interfaces.
pub const DEFAULT_TCP_PORT: u16 = 10001;

/// Default time to wait for a transmitter response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default pause between the reset command and the status request.
pub const DEFAULT_RESET_DELAY: Duration = Duration::from_millis(300);

/// Default supervisor period.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Resolved transport selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    /// Serial port by name (e.g. "/dev/ttyUSB0" or "COM3").
    Serial { port: String },
    /// USB FTDI bridge by serial number.
    Ftdi { bridge_id: String },
    /// TCP socket.
    Tcp { host: String, port: u16 },
}

/// Configuration of one RFXCOM bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Serial port name.
    pub serial_port: Option<String>,
    /// FTDI bridge identifier (USB serial number).
    pub bridge_id: Option<String>,
    /// Host of a LAN interface.
    pub host: Option<String>,
    /// TCP port of a LAN interface. Defaults to [`DEFAULT_TCP_PORT`].
    pub port: Option<u16>,
    /// Leave the transceiver's receiving modes untouched.
    pub ignore_config: bool,
    /// Raw SET_MODE frame as a 14-byte hex literal.
    pub set_mode: Option<String>,
    /// Receiving protocols to enable when SET_MODE is synthesized.
    pub protocols: ProtocolSet,
    /// Time to wait for a transmitter response.
    pub response_timeout: Duration,
    /// Pause between reset and status request.
    pub reset_delay: Duration,
    /// Supervisor period.
    pub check_interval: Duration,
}

impl BridgeConfig {
    /// Creates an empty configuration with default timings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            reset_delay: DEFAULT_RESET_DELAY,
            check_interval: DEFAULT_CHECK_INTERVAL,
            ..Self::default()
        }
    }

    /// Creates a configuration for a serial port.
    #[must_use]
    pub fn serial(port: impl Into<String>) -> Self {
        Self {
            serial_port: Some(port.into()),
            ..Self::new()
        }
    }

    /// Creates a configuration for an FTDI bridge.
    #[must_use]
    pub fn ftdi(bridge_id: impl Into<String>) -> Self {
        Self {
            bridge_id: Some(bridge_id.into()),
            ..Self::new()
        }
    }

    /// Creates a configuration for a LAN interface.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
            ..Self::new()
        }
    }

    /// Keeps the receiving modes stored in the transceiver.
    #[must_use]
    pub const fn ignore_config(mut self) -> Self {
        self.ignore_config = true;
        self
    }

    /// Sets a raw SET_MODE hex literal.
    #[must_use]
    pub fn set_mode(mut self, literal: impl Into<String>) -> Self {
        self.set_mode = Some(literal.into());
        self
    }

    /// Enables a receiving protocol.
    #[must_use]
    pub fn enable(mut self, protocol: Protocol) -> Self {
        self.protocols.insert(protocol);
        self
    }

    /// Replaces the receiving protocol set.
    #[must_use]
    pub const fn protocols(mut self, protocols: ProtocolSet) -> Self {
        self.protocols = protocols;
        self
    }

    /// Sets the transmitter response timeout.
    #[must_use]
    pub const fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Sets the delay after reset.
    #[must_use]
    pub const fn reset_delay(mut self, delay: Duration) -> Self {
        self.reset_delay = delay;
        self
    }

    /// Sets the supervisor period.
    #[must_use]
    pub const fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Selects the transport, or `None` if no selector is set.
    #[must_use]
    pub fn transport(&self) -> Option<TransportConfig> {
        let non_empty = |s: &Option<String>| {
            s.as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(str::to_owned)
        };

        if let Some(port) = non_empty(&self.serial_port) {
            return Some(TransportConfig::Serial { port });
        }
        if let Some(bridge_id) = non_empty(&self.bridge_id) {
            return Some(TransportConfig::Ftdi { bridge_id });
        }
        non_empty(&self.host).map(|host| TransportConfig::Tcp {
            host,
            port: self.port.unwrap_or(DEFAULT_TCP_PORT),
        })
    }
}
