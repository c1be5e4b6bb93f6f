//! UMP packet container: decode, encode, validation.

use crate::error::{Error, Result};
use crate::message::DATA_BYTE_MAX;

use super::{midi2, MessageType, MAX_WORDS};

/// A Universal MIDI Packet.
///
/// Always stored as four words with the unused tail zeroed; `num_words` is
/// the size mandated by the Message Type. The Message Type and Group are
/// denormalized out of word 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UmpPacket {
    pub words: [u32; MAX_WORDS],
    pub num_words: u8,
    pub message_type: MessageType,
    pub group: u8,
}

impl UmpPacket {
    /// Assemble a packet from pre-built words. `words` beyond the Message
    /// Type's size must not be present.
    pub(crate) fn from_built(words: &[u32]) -> Self {
        let mt = MessageType::from_nibble((words[0] >> 28) as u8 & 0x0F)
            .expect("nibble is always 0x0-0xF");
        debug_assert_eq!(words.len(), mt.word_count());
        let mut all = [0u32; MAX_WORDS];
        all[..words.len()].copy_from_slice(words);
        Self {
            words: all,
            num_words: words.len() as u8,
            message_type: mt,
            group: (words[0] >> 24) as u8 & 0x0F,
        }
    }

    /// Decode a packet from a word stream.
    ///
    /// Reads word 0, derives the size from the Message Type and copies
    /// exactly that many words. Fails with `InsufficientCapacity` when the
    /// slice is shorter than the packet it starts.
    pub fn decode(words: &[u32]) -> Result<Self> {
        let first = *words.first().ok_or(Error::InsufficientCapacity {
            needed: 1,
            available: 0,
        })?;
        let mt = MessageType::from_nibble((first >> 28) as u8 & 0x0F)?;
        let needed = mt.word_count();
        if words.len() < needed {
            return Err(Error::InsufficientCapacity {
                needed,
                available: words.len(),
            });
        }
        let mut all = [0u32; MAX_WORDS];
        all[..needed].copy_from_slice(&words[..needed]);
        Ok(Self {
            words: all,
            num_words: needed as u8,
            message_type: mt,
            group: (first >> 24) as u8 & 0x0F,
        })
    }

    /// Write `num_words` words into `out`, returning the count written.
    pub fn encode(&self, out: &mut [u32]) -> Result<usize> {
        let n = self.num_words as usize;
        if out.len() < n {
            return Err(Error::InsufficientCapacity {
                needed: n,
                available: out.len(),
            });
        }
        out[..n].copy_from_slice(&self.words[..n]);
        Ok(n)
    }

    /// The populated words.
    #[inline]
    pub fn as_words(&self) -> &[u32] {
        &self.words[..self.num_words as usize]
    }

    /// Status byte field of word 0 (bits 23-16). Meaning depends on the
    /// Message Type.
    #[inline]
    pub fn status_byte(&self) -> u8 {
        (self.words[0] >> 16) as u8
    }

    /// Channel (low nibble of the status byte) for channel-voice types.
    #[inline]
    pub fn channel(&self) -> u8 {
        (self.words[0] >> 16) as u8 & 0x0F
    }

    /// Structural validity: word count matches the Message Type's size,
    /// group fits in 4 bits, and 7-bit subfields are in range where the
    /// Message Type defines them.
    pub fn is_valid(&self) -> bool {
        if self.num_words as usize != self.message_type.word_count() {
            return false;
        }
        if self.group > 15 {
            return false;
        }
        match self.message_type {
            MessageType::Midi2ChannelVoice => {
                let op = (self.words[0] >> 20) as u8 & 0x0F;
                let index = (self.words[0] >> 8) as u8;
                match op {
                    // Note number / controller / program live in a 7-bit field.
                    midi2::opcode::NOTE_OFF
                    | midi2::opcode::NOTE_ON
                    | midi2::opcode::POLY_PRESSURE
                    | midi2::opcode::PER_NOTE_PITCH_BEND
                    | midi2::opcode::CONTROL_CHANGE => index <= DATA_BYTE_MAX,
                    midi2::opcode::PROGRAM_CHANGE => {
                        (self.words[1] >> 24) as u8 <= DATA_BYTE_MAX
                    }
                    _ => true,
                }
            }
            MessageType::Midi1ChannelVoice => {
                let d0 = (self.words[0] >> 8) as u8;
                let d1 = self.words[0] as u8;
                d0 <= DATA_BYTE_MAX && d1 <= DATA_BYTE_MAX
            }
            _ => true,
        }
    }
}

/// Single-word System packet (MT 0x1): System Real-Time and System Common
/// carried over UMP. Data bytes go in bits 15-8 and 7-0.
pub fn system_packet(group: u8, status: u8, data1: u8, data2: u8) -> Result<UmpPacket> {
    if group > 15 {
        return Err(Error::InvalidArgument("group out of range"));
    }
    if data1 > DATA_BYTE_MAX || data2 > DATA_BYTE_MAX {
        return Err(Error::InvalidArgument("data byte out of range"));
    }
    let word0 = (u32::from(MessageType::System.as_nibble()) << 28)
        | (u32::from(group) << 24)
        | (u32::from(status) << 16)
        | (u32::from(data1) << 8)
        | u32::from(data2);
    Ok(UmpPacket::from_built(&[word0]))
}
