//! Universal MIDI Packet codec.
//!
//! Based on the UMP Format and MIDI 2.0 Protocol Specification v1.1.2.
//! A UMP is 1-4 32-bit words; the size is fully determined by the Message
//! Type nibble (bits 31-28 of the first word).

pub mod data64;
pub mod midi2;
mod packet;

pub use data64::{sysex7_packet, sysex7_payload, Sysex7Format, SYSEX7_MAX_PAYLOAD};
pub use midi2::{opcode, Midi2Message};
pub use packet::{system_packet, UmpPacket};

use crate::error::{Error, Result};

/// Message Type field values (bits 31-28 of the first word).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Utility messages: NOOP, JR clock/timestamp (32-bit).
    Utility = 0x0,
    /// System Real-Time and System Common (32-bit).
    System = 0x1,
    /// MIDI 1.0 Channel Voice carried in UMP (32-bit).
    Midi1ChannelVoice = 0x2,
    /// Data messages including SysEx 7 (64-bit).
    Data64 = 0x3,
    /// MIDI 2.0 Channel Voice (64-bit).
    Midi2ChannelVoice = 0x4,
    /// SysEx 8 and Mixed Data Set (128-bit).
    Data128 = 0x5,
    Reserved6 = 0x6,
    Reserved7 = 0x7,
    Reserved8 = 0x8,
    Reserved9 = 0x9,
    ReservedA = 0xA,
    ReservedB = 0xB,
    ReservedC = 0xC,
    /// Flex Data messages (128-bit).
    FlexData = 0xD,
    ReservedE = 0xE,
    /// UMP Stream messages: endpoint discovery/info (128-bit).
    UmpStream = 0xF,
}

impl MessageType {
    /// Classify the upper nibble of word 0.
    pub fn from_nibble(nibble: u8) -> Result<Self> {
        Ok(match nibble {
            0x0 => MessageType::Utility,
            0x1 => MessageType::System,
            0x2 => MessageType::Midi1ChannelVoice,
            0x3 => MessageType::Data64,
            0x4 => MessageType::Midi2ChannelVoice,
            0x5 => MessageType::Data128,
            0x6 => MessageType::Reserved6,
            0x7 => MessageType::Reserved7,
            0x8 => MessageType::Reserved8,
            0x9 => MessageType::Reserved9,
            0xA => MessageType::ReservedA,
            0xB => MessageType::ReservedB,
            0xC => MessageType::ReservedC,
            0xD => MessageType::FlexData,
            0xE => MessageType::ReservedE,
            0xF => MessageType::UmpStream,
            other => return Err(Error::UnsupportedMessageType(other)),
        })
    }

    /// Packet size in 32-bit words mandated by this Message Type.
    pub fn word_count(self) -> usize {
        match self {
            MessageType::Utility
            | MessageType::System
            | MessageType::Midi1ChannelVoice
            | MessageType::Reserved6
            | MessageType::Reserved7 => 1,
            MessageType::Data64
            | MessageType::Midi2ChannelVoice
            | MessageType::Reserved8
            | MessageType::Reserved9
            | MessageType::ReservedA => 2,
            MessageType::ReservedB | MessageType::ReservedC => 3,
            MessageType::Data128
            | MessageType::FlexData
            | MessageType::ReservedE
            | MessageType::UmpStream => 4,
        }
    }

    #[inline]
    pub fn as_nibble(self) -> u8 {
        self as u8
    }
}

/// Maximum words in a UMP.
pub const MAX_WORDS: usize = 4;
