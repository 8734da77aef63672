//! Interface commands, subtypes and canned control frames.
//!
//! The control frames are complete 14-byte wire frames (length byte included)
//! and are written to the transceiver verbatim.

use std::fmt;

/// Length of an interface control frame, length byte included.
pub const CONTROL_FRAME_LEN: usize = 14;

/// Resets the transceiver. The transceiver sends no answer.
pub const CMD_RESET: [u8; CONTROL_FRAME_LEN] = [
    0x0D, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Requests firmware versions and the receiving configuration.
pub const CMD_GET_STATUS: [u8; CONTROL_FRAME_LEN] = [
    0x0D, 0x00, 0x00, 0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Saves the receiving modes in non-volatile memory.
pub const CMD_SAVE: [u8; CONTROL_FRAME_LEN] = [
    0x0D, 0x00, 0x00, 0x02, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Starts the receiver.
pub const CMD_START_RECEIVER: [u8; CONTROL_FRAME_LEN] = [
    0x0D, 0x00, 0x00, 0x03, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Interface commands carried by control frames and echoed in interface messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InterfaceCommand {
    /// Reset the receiver/transceiver.
    Reset = 0x00,
    /// Get firmware versions and configuration.
    GetStatus = 0x02,
    /// Set receiving modes.
    SetMode = 0x03,
    /// Enable all receiving modes.
    EnableAll = 0x04,
    /// Enable reporting of undecoded packets.
    EnableUndecodedPackets = 0x05,
    /// Save receiving modes in non-volatile memory.
    SaveReceivingModes = 0x06,
    /// Start the receiver.
    StartReceiver = 0x07,
    /// Reserved for RFXCOM.
    T1 = 0x08,
    /// Reserved for RFXCOM.
    T2 = 0x09,
}

impl InterfaceCommand {
    /// Attempts to parse a command from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Reset),
            0x02 => Some(Self::GetStatus),
            0x03 => Some(Self::SetMode),
            0x04 => Some(Self::EnableAll),
            0x05 => Some(Self::EnableUndecodedPackets),
            0x06 => Some(Self::SaveReceivingModes),
            0x07 => Some(Self::StartReceiver),
            0x08 => Some(Self::T1),
            0x09 => Some(Self::T2),
            _ => None,
        }
    }
}

impl From<InterfaceCommand> for u8 {
    fn from(cmd: InterfaceCommand) -> Self {
        cmd as Self
    }
}

/// Interface message subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InterfaceSubType {
    /// Response to a status or mode command.
    Response = 0x00,
    /// Unknown RTS remote.
    UnknownRtsRemote = 0x01,
    /// No extended hardware present.
    NoExtendedHwPresent = 0x02,
    /// List of RFY remotes.
    ListRfyRemotes = 0x03,
    /// List of ASA remotes.
    ListAsaRemotes = 0x04,
    /// Receiver started.
    StartReceiver = 0x07,
}

impl InterfaceSubType {
    /// Attempts to parse a subtype from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Response),
            0x01 => Some(Self::UnknownRtsRemote),
            0x02 => Some(Self::NoExtendedHwPresent),
            0x03 => Some(Self::ListRfyRemotes),
            0x04 => Some(Self::ListAsaRemotes),
            0x07 => Some(Self::StartReceiver),
            _ => None,
        }
    }
}

/// Transmitter message subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransmitterSubType {
    /// The receiver did not lock before transmitting.
    ErrorReceiverDidNotLock = 0x00,
    /// Transmission response.
    Response = 0x01,
}

impl TransmitterSubType {
    /// Attempts to parse a subtype from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::ErrorReceiverDidNotLock),
            0x01 => Some(Self::Response),
            _ => None,
        }
    }
}

/// Transceiver response to a transmission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransmitterResponse {
    /// Transmitted.
    Ack = 0x00,
    /// Transmitted after a delay.
    AckDelayed = 0x01,
    /// Not transmitted.
    Nak = 0x02,
    /// Not transmitted, invalid AC address.
    NakInvalidAcAddress = 0x03,
}

impl TransmitterResponse {
    /// Attempts to parse a response code from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Ack),
            0x01 => Some(Self::AckDelayed),
            0x02 => Some(Self::Nak),
            0x03 => Some(Self::NakInvalidAcAddress),
            _ => None,
        }
    }

    /// Returns true if the transceiver transmitted the request.
    #[must_use]
    pub const fn is_ack(&self) -> bool {
        matches!(self, Self::Ack | Self::AckDelayed)
    }
}

/// Transceiver hardware type reported in the status response.
///
/// Kept as the raw byte so unknown hardware still round-trips into SET_MODE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransceiverType(pub u8);

impl TransceiverType {
    /// 310 MHz.
    pub const MHZ_310: Self = Self(0x50);
    /// 315 MHz.
    pub const MHZ_315: Self = Self(0x51);
    /// 433.92 MHz, receive only.
    pub const MHZ_433_92_RECEIVER_ONLY: Self = Self(0x52);
    /// 433.92 MHz transceiver.
    pub const MHZ_433_92_TRANSCEIVER: Self = Self(0x53);
    /// 868.00 MHz.
    pub const MHZ_868_00: Self = Self(0x55);
    /// 868.00 MHz FSK.
    pub const MHZ_868_00_FSK: Self = Self(0x56);
    /// 868.30 MHz.
    pub const MHZ_868_30: Self = Self(0x57);
    /// 868.30 MHz FSK.
    pub const MHZ_868_30_FSK: Self = Self(0x58);
    /// 868.35 MHz.
    pub const MHZ_868_35: Self = Self(0x59);
    /// 868.35 MHz FSK.
    pub const MHZ_868_35_FSK: Self = Self(0x5A);
    /// 868.95 MHz FSK.
    pub const MHZ_868_95_FSK: Self = Self(0x5B);

    /// Returns a human readable name, if the type is known.
    #[must_use]
    pub const fn name(&self) -> Option<&'static str> {
        match self.0 {
            0x50 => Some("310MHz"),
            0x51 => Some("315MHz"),
            0x52 => Some("433.92MHz receiver only"),
            0x53 => Some("433.92MHz transceiver"),
            0x55 => Some("868.00MHz"),
            0x56 => Some("868.00MHz FSK"),
            0x57 => Some("868.30MHz"),
            0x58 => Some("868.30MHz FSK"),
            0x59 => Some("868.35MHz"),
            0x5A => Some("868.35MHz FSK"),
            0x5B => Some("868.95MHz FSK"),
            _ => None,
        }
    }
}

impl fmt::Display for TransceiverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "unknown (0x{:02X})", self.0),
        }
    }
}

/// Firmware flavour reported by newer transceivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FirmwareType {
    /// Type 1, receive only.
    Type1RxOnly = 0x00,
    /// Type 1.
    Type1 = 0x01,
    /// Type 2.
    Type2 = 0x02,
    /// Extended.
    Ext = 0x03,
    /// Extended 2.
    Ext2 = 0x04,
}

impl FirmwareType {
    /// Attempts to parse a firmware type from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Type1RxOnly),
            0x01 => Some(Self::Type1),
            0x02 => Some(Self::Type2),
            0x03 => Some(Self::Ext),
            0x04 => Some(Self::Ext2),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_frames_select_commands() {
        assert_eq!(usize::from(CMD_RESET[0]) + 1, CONTROL_FRAME_LEN);
        assert_eq!(CMD_RESET[4], u8::from(InterfaceCommand::Reset));
        assert_eq!(CMD_GET_STATUS[4], u8::from(InterfaceCommand::GetStatus));
        assert_eq!(CMD_SAVE[4], u8::from(InterfaceCommand::SaveReceivingModes));
        assert_eq!(CMD_START_RECEIVER[4], u8::from(InterfaceCommand::StartReceiver));
    }

    #[test]
    fn test_transmitter_response_values() {
        assert_eq!(TransmitterResponse::from_byte(0x01), Some(TransmitterResponse::AckDelayed));
        assert_eq!(TransmitterResponse::from_byte(0x04), None);
        assert!(TransmitterResponse::Ack.is_ack());
        assert!(TransmitterResponse::AckDelayed.is_ack());
        assert!(!TransmitterResponse::Nak.is_ack());
        assert!(!TransmitterResponse::NakInvalidAcAddress.is_ack());
    }

    #[test]
    fn test_transceiver_type_display() {
        assert_eq!(
            TransceiverType::MHZ_433_92_TRANSCEIVER.to_string(),
            "433.92MHz transceiver"
        );
        assert_eq!(TransceiverType(0x99).to_string(), "unknown (0x99)");
    }

    #[test]
    fn test_interface_subtype_from_byte() {
        assert_eq!(InterfaceSubType::from_byte(0x07), Some(InterfaceSubType::StartReceiver));
        assert_eq!(InterfaceSubType::from_byte(0x05), None);
    }
}
