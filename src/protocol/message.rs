//! Typed messages and the packet codec.
//!
//! Every packet payload starts with the same three bytes:
//! ```text
//! [packet_type:1] [sub_type:1] [seq:1] [body...]
//! ```
//! The bridge only looks inside interface, interface control and transmitter
//! packets. Device packets are carried as opaque [`DeviceMessage`]s.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, FrameError};
use crate::protocol::command::{
    FirmwareType, InterfaceCommand, InterfaceSubType, TransceiverType, TransmitterResponse,
    TransmitterSubType,
};
use crate::protocol::frame;
use crate::protocol::mode::ProtocolSet;
use crate::protocol::packet::PacketType;

/// Minimum payload of any packet: type, subtype and sequence number.
const HEADER_LEN: usize = 3;

/// Transceiver status carried by an interface response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransceiverStatus {
    /// Hardware type (frequency band).
    pub transceiver_type: TransceiverType,
    /// Firmware version.
    pub firmware_version: u8,
    /// Enabled receiving protocols.
    pub protocols: ProtocolSet,
    /// Hardware version, major part.
    pub hardware_major: u8,
    /// Hardware version, minor part.
    pub hardware_minor: u8,
    /// RF output power, if reported.
    pub output_power: Option<u8>,
    /// Firmware type, if reported.
    pub firmware_type: Option<FirmwareType>,
}

/// Interface message sent by the transceiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceMessage {
    /// Message subtype.
    pub sub_type: InterfaceSubType,
    /// Sequence number echoed from the command.
    pub sequence: u8,
    /// Command this message answers.
    pub command: InterfaceCommand,
    /// Transceiver status (response subtype only).
    pub status: Option<TransceiverStatus>,
    /// Trailing text (e.g. the copyright banner after start receiver).
    pub text: Option<String>,
}

/// SET_MODE interface control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceControlMessage {
    /// Sequence number.
    pub sequence: u8,
    /// Hardware type the mode applies to.
    pub transceiver_type: TransceiverType,
    /// Receiving protocols to enable.
    pub protocols: ProtocolSet,
}

impl InterfaceControlMessage {
    /// Creates a SET_MODE message.
    #[must_use]
    pub const fn set_mode(transceiver_type: TransceiverType, protocols: ProtocolSet) -> Self {
        Self {
            sequence: 0,
            transceiver_type,
            protocols,
        }
    }
}

/// Transceiver answer to a transmission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmitterAck {
    /// Message subtype.
    pub sub_type: TransmitterSubType,
    /// Sequence number of the request this answers.
    pub sequence: u8,
    /// Response code.
    pub response: TransmitterResponse,
}

/// Device packet, opaque to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMessage {
    /// Packet type.
    pub packet_type: PacketType,
    /// Device specific subtype.
    pub sub_type: u8,
    /// Sequence number.
    pub sequence: u8,
    /// Bytes after the sequence number.
    pub data: Bytes,
}

impl DeviceMessage {
    /// Creates a device message with sequence number 0.
    #[must_use]
    pub fn new(packet_type: PacketType, sub_type: u8, data: impl Into<Bytes>) -> Self {
        Self {
            packet_type,
            sub_type,
            sequence: 0,
            data: data.into(),
        }
    }
}

/// Any message on the RFXCOM link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Interface control command.
    InterfaceControl(InterfaceControlMessage),
    /// Interface message.
    Interface(InterfaceMessage),
    /// Transmitter response.
    Transmitter(TransmitterAck),
    /// Device message.
    Device(DeviceMessage),
}

impl Message {
    /// Returns the packet type of this message.
    #[must_use]
    pub const fn packet_type(&self) -> PacketType {
        match self {
            Self::InterfaceControl(_) => PacketType::InterfaceControl,
            Self::Interface(_) => PacketType::InterfaceMessage,
            Self::Transmitter(_) => PacketType::TransmitterMessage,
            Self::Device(msg) => msg.packet_type,
        }
    }

    /// Stamps a sequence number into the message.
    pub fn set_sequence(&mut self, sequence: u8) {
        match self {
            Self::InterfaceControl(msg) => msg.sequence = sequence,
            Self::Interface(msg) => msg.sequence = sequence,
            Self::Transmitter(msg) => msg.sequence = sequence,
            Self::Device(msg) => msg.sequence = sequence,
        }
    }

    /// Encodes the message into a length-prefixed wire frame.
    pub fn encode(&self) -> Result<Bytes, FrameError> {
        encode(self)
    }
}

impl From<DeviceMessage> for Message {
    fn from(msg: DeviceMessage) -> Self {
        Self::Device(msg)
    }
}

/// Decodes a packet payload (without its length byte).
///
/// # Errors
///
/// Returns `DecodeError::NotImplemented` for packet types or subtypes without
/// a decoder, and other `DecodeError`s for malformed packets.
pub fn decode(packet: &[u8]) -> Result<Message, DecodeError> {
    if packet.len() < HEADER_LEN {
        return Err(DecodeError::TooShort {
            kind: "RFXCOM",
            expected: HEADER_LEN,
            got: packet.len(),
        });
    }

    let sub_type = packet[1];
    let Some(packet_type) = PacketType::from_byte(packet[0]) else {
        return Err(DecodeError::NotImplemented {
            packet_type: packet[0],
            sub_type,
        });
    };

    match packet_type {
        PacketType::InterfaceControl => {
            decode_interface_control(packet).map(Message::InterfaceControl)
        }
        PacketType::InterfaceMessage => decode_interface(packet).map(Message::Interface),
        PacketType::TransmitterMessage => decode_transmitter(packet).map(Message::Transmitter),
        _ => Ok(Message::Device(DeviceMessage {
            packet_type,
            sub_type,
            sequence: packet[2],
            data: Bytes::copy_from_slice(&packet[HEADER_LEN..]),
        })),
    }
}

/// Encodes a message into a length-prefixed wire frame.
///
/// # Errors
///
/// Returns a `FrameError` if the encoded payload does not fit in a frame.
pub fn encode(message: &Message) -> Result<Bytes, FrameError> {
    let mut buf = BytesMut::with_capacity(32);
    buf.put_u8(message.packet_type().into());

    match message {
        Message::InterfaceControl(msg) => {
            buf.put_u8(0x00);
            buf.put_u8(msg.sequence);
            buf.put_u8(InterfaceCommand::SetMode.into());
            buf.put_u8(msg.transceiver_type.0);
            buf.put_u8(0x00);
            buf.put_slice(&msg.protocols.to_bytes());
            buf.put_bytes(0x00, 3);
        }
        Message::Interface(msg) => {
            buf.put_u8(msg.sub_type as u8);
            buf.put_u8(msg.sequence);
            buf.put_u8(msg.command.into());
            if let Some(status) = &msg.status {
                buf.put_u8(status.transceiver_type.0);
                buf.put_u8(status.firmware_version);
                buf.put_slice(&status.protocols.to_bytes());
                buf.put_u8(status.hardware_major);
                buf.put_u8(status.hardware_minor);
                if let Some(power) = status.output_power {
                    buf.put_u8(power);
                    if let Some(firmware_type) = status.firmware_type {
                        buf.put_u8(firmware_type as u8);
                    }
                }
            }
            if let Some(text) = &msg.text {
                buf.put_slice(text.as_bytes());
            }
        }
        Message::Transmitter(msg) => {
            buf.put_u8(msg.sub_type as u8);
            buf.put_u8(msg.sequence);
            buf.put_u8(msg.response as u8);
        }
        Message::Device(msg) => {
            buf.put_u8(msg.sub_type);
            buf.put_u8(msg.sequence);
            buf.put_slice(&msg.data);
        }
    }

    frame::encode(&buf)
}

/// Parses an interface control packet.
///
/// Format:
/// ```text
/// [0x00] [0x00] [seq:1] [cmd:1] [type:1] [0x00] [msg3..msg6:4] [0x00:3]
/// ```
fn decode_interface_control(packet: &[u8]) -> Result<InterfaceControlMessage, DecodeError> {
    require(packet, 10, "interface control")?;

    let command = packet[3];
    if command != u8::from(InterfaceCommand::SetMode) {
        return Err(DecodeError::NotImplemented {
            packet_type: packet[0],
            sub_type: command,
        });
    }

    Ok(InterfaceControlMessage {
        sequence: packet[2],
        transceiver_type: TransceiverType(packet[4]),
        protocols: ProtocolSet::from_bytes([packet[6], packet[7], packet[8], packet[9]]),
    })
}

/// Parses an interface message.
///
/// Response format:
/// ```text
/// [0x01] [0x00] [seq:1] [cmd:1] [type:1] [fw:1] [msg3..msg6:4] [hw1:1] [hw2:1]
/// ([power:1] ([fw_type:1]))
/// ```
///
/// Start receiver format:
/// ```text
/// [0x01] [0x07] [seq:1] [cmd:1] [text...]
/// ```
fn decode_interface(packet: &[u8]) -> Result<InterfaceMessage, DecodeError> {
    let sub_type = InterfaceSubType::from_byte(packet[1]).ok_or(DecodeError::NotImplemented {
        packet_type: packet[0],
        sub_type: packet[1],
    })?;
    require(packet, 4, "interface")?;

    let command = InterfaceCommand::from_byte(packet[3]).ok_or(DecodeError::InvalidValue {
        field: "interface command",
        value: packet[3],
    })?;

    let mut msg = InterfaceMessage {
        sub_type,
        sequence: packet[2],
        command,
        status: None,
        text: None,
    };

    match sub_type {
        InterfaceSubType::Response => {
            require(packet, 12, "interface response")?;
            msg.status = Some(TransceiverStatus {
                transceiver_type: TransceiverType(packet[4]),
                firmware_version: packet[5],
                protocols: ProtocolSet::from_bytes([packet[6], packet[7], packet[8], packet[9]]),
                hardware_major: packet[10],
                hardware_minor: packet[11],
                output_power: packet.get(12).copied(),
                firmware_type: packet.get(13).and_then(|&b| FirmwareType::from_byte(b)),
            });
        }
        InterfaceSubType::StartReceiver => {
            let text = String::from_utf8_lossy(&packet[4..])
                .trim_end_matches('\0')
                .to_owned();
            if !text.is_empty() {
                msg.text = Some(text);
            }
        }
        _ => {}
    }

    Ok(msg)
}

/// Parses a transmitter message.
///
/// Format:
/// ```text
/// [0x02] [subtype:1] [seq:1] [response:1]
/// ```
fn decode_transmitter(packet: &[u8]) -> Result<TransmitterAck, DecodeError> {
    let sub_type = TransmitterSubType::from_byte(packet[1]).ok_or(DecodeError::NotImplemented {
        packet_type: packet[0],
        sub_type: packet[1],
    })?;
    require(packet, 4, "transmitter")?;

    let response = TransmitterResponse::from_byte(packet[3]).ok_or(DecodeError::InvalidValue {
        field: "transmitter response",
        value: packet[3],
    })?;

    Ok(TransmitterAck {
        sub_type,
        sequence: packet[2],
        response,
    })
}

fn require(packet: &[u8], expected: usize, kind: &'static str) -> Result<(), DecodeError> {
    if packet.len() < expected {
        return Err(DecodeError::TooShort {
            kind,
            expected,
            got: packet.len(),
        });
    }
    Ok(())
}
