//! Receiving protocol flags and SET_MODE literals.
//!
//! The transceiver reports and accepts its enabled receiving protocols as four
//! bit fields (msg3 to msg6). [`ProtocolSet`] keeps them in that wire shape.

use thiserror::Error;

use crate::protocol::command::CONTROL_FRAME_LEN;

/// A receiving protocol the transceiver can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Undecoded messages, passed through as raw RF data.
    Undecoded,
    /// Imagintronix and Opus sensors.
    ImagintronixOpus,
    /// Byron SX chimes.
    ByronSx,
    /// RSL switches.
    Rsl,
    /// PT2262 compatible Lighting4 devices.
    Lighting4,
    /// Fine Offset and Viking weather sensors.
    FineOffsetViking,
    /// Rubicson sensors.
    Rubicson,
    /// AE Blyss switches.
    AeBlyss,
    /// Blinds types T1 to T4.
    BlindsT1T2T3T4,
    /// Blinds type T0.
    BlindsT0,
    /// ProGuard security.
    ProGuard,
    /// FS20 devices.
    Fs20,
    /// La Crosse sensors.
    LaCrosse,
    /// Hideki and UPM sensors.
    HidekiUpm,
    /// AD LightwaveRF.
    AdLightwaveRf,
    /// Mertik fireplaces.
    Mertik,
    /// Visonic security.
    Visonic,
    /// ATI remotes.
    Ati,
    /// Oregon Scientific sensors.
    OregonScientific,
    /// Meiantech security.
    Meiantech,
    /// HomeEasy EU.
    HomeEasyEu,
    /// AC (KlikAanKlikUit, Chacon, HomeEasy UK).
    Ac,
    /// ARC (KlikAanKlikUit code wheel, Elro and others).
    Arc,
    /// X10.
    X10,
    /// Home Confort.
    HomeConfort,
    /// KeeLoq.
    Keeloq,
}

impl Protocol {
    /// All protocols, in wire order.
    pub const ALL: [Self; 26] = [
        Self::Undecoded,
        Self::ImagintronixOpus,
        Self::ByronSx,
        Self::Rsl,
        Self::Lighting4,
        Self::FineOffsetViking,
        Self::Rubicson,
        Self::AeBlyss,
        Self::BlindsT1T2T3T4,
        Self::BlindsT0,
        Self::ProGuard,
        Self::Fs20,
        Self::LaCrosse,
        Self::HidekiUpm,
        Self::AdLightwaveRf,
        Self::Mertik,
        Self::Visonic,
        Self::Ati,
        Self::OregonScientific,
        Self::Meiantech,
        Self::HomeEasyEu,
        Self::Ac,
        Self::Arc,
        Self::X10,
        Self::HomeConfort,
        Self::Keeloq,
    ];

    /// Returns the field index (0 = msg3) and bit mask of this protocol.
    #[must_use]
    pub const fn position(self) -> (usize, u8) {
        match self {
            Self::Undecoded => (0, 0x80),
            Self::ImagintronixOpus => (0, 0x40),
            Self::ByronSx => (0, 0x20),
            Self::Rsl => (0, 0x10),
            Self::Lighting4 => (0, 0x08),
            Self::FineOffsetViking => (0, 0x04),
            Self::Rubicson => (0, 0x02),
            Self::AeBlyss => (0, 0x01),
            Self::BlindsT1T2T3T4 => (1, 0x80),
            Self::BlindsT0 => (1, 0x40),
            Self::ProGuard => (1, 0x20),
            Self::Fs20 => (1, 0x10),
            Self::LaCrosse => (1, 0x08),
            Self::HidekiUpm => (1, 0x04),
            Self::AdLightwaveRf => (1, 0x02),
            Self::Mertik => (1, 0x01),
            Self::Visonic => (2, 0x80),
            Self::Ati => (2, 0x40),
            Self::OregonScientific => (2, 0x20),
            Self::Meiantech => (2, 0x10),
            Self::HomeEasyEu => (2, 0x08),
            Self::Ac => (2, 0x04),
            Self::Arc => (2, 0x02),
            Self::X10 => (2, 0x01),
            Self::HomeConfort => (3, 0x02),
            Self::Keeloq => (3, 0x01),
        }
    }
}

/// Set of enabled receiving protocols, stored as the msg3..msg6 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProtocolSet {
    bytes: [u8; 4],
}

impl ProtocolSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: [0; 4] }
    }

    /// Builds a set from the raw msg3..msg6 bytes. Undefined bits are kept.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self { bytes }
    }

    /// Returns the raw msg3..msg6 bytes.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 4] {
        self.bytes
    }

    /// Enables a protocol.
    pub fn insert(&mut self, protocol: Protocol) {
        let (index, mask) = protocol.position();
        self.bytes[index] |= mask;
    }

    /// Disables a protocol.
    pub fn remove(&mut self, protocol: Protocol) {
        let (index, mask) = protocol.position();
        self.bytes[index] &= !mask;
    }

    /// Returns true if the protocol is enabled.
    #[must_use]
    pub const fn contains(&self, protocol: Protocol) -> bool {
        let (index, mask) = protocol.position();
        self.bytes[index] & mask != 0
    }

    /// Returns true if no protocol is enabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    /// Iterates the enabled protocols in wire order.
    pub fn iter(&self) -> impl Iterator<Item = Protocol> + '_ {
        Protocol::ALL.into_iter().filter(|p| self.contains(*p))
    }
}

impl FromIterator<Protocol> for ProtocolSet {
    fn from_iter<I: IntoIterator<Item = Protocol>>(iter: I) -> Self {
        let mut set = Self::new();
        for protocol in iter {
            set.insert(protocol);
        }
        set
    }
}

/// A configured SET_MODE literal that cannot be used.
#[derive(Debug, Error, PartialEq)]
pub enum SetModeError {
    /// The literal is not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// The literal does not decode to a full control frame.
    #[error("expected {CONTROL_FRAME_LEN} bytes, got {0}")]
    WrongLength(usize),
}

/// Parses a configured SET_MODE hex literal into a control frame.
///
/// # Errors
///
/// Returns a `SetModeError` unless the literal is exactly 14 bytes of hex.
pub fn parse_set_mode(literal: &str) -> Result<[u8; CONTROL_FRAME_LEN], SetModeError> {
    let bytes = hex::decode(literal.trim())?;
    <[u8; CONTROL_FRAME_LEN]>::try_from(bytes.as_slice())
        .map_err(|_| SetModeError::WrongLength(bytes.len()))
}
