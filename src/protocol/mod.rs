//! Protocol definitions for RFXCOM communication.
//!
//! This module contains the low-level protocol types including:
//! - Frame encoding/decoding
//! - Packet type definitions
//! - Interface commands and canned control frames
//! - Receiving protocol flags
//! - The message codec

pub mod command;
pub mod frame;
pub mod message;
pub mod mode;
pub mod packet;

pub use command::{
    CMD_GET_STATUS, CMD_RESET, CMD_SAVE, CMD_START_RECEIVER, CONTROL_FRAME_LEN, FirmwareType,
    InterfaceCommand, InterfaceSubType, TransceiverType, TransmitterResponse, TransmitterSubType,
};
pub use frame::{FrameDecoder, MAX_FRAME_SIZE, encode as encode_frame};
pub use message::{
    DeviceMessage, InterfaceControlMessage, InterfaceMessage, Message, TransceiverStatus,
    TransmitterAck, decode,
};
pub use mode::{Protocol, ProtocolSet, SetModeError, parse_set_mode};
pub use packet::PacketType;
