//! Data 64 packets (MT 0x3): System Exclusive 7-bit.
//!
//! Word 0 layout: `[MT:4 | Group:4 | Format:4 | NumBytes:4 | Data:8 | Data:8]`,
//! word 1 carries four more data bytes. A packet holds at most six 7-bit
//! payload bytes; multi-packet messages are marked Start/Continue/End.

use crate::error::{Error, Result};
use crate::message::DATA_BYTE_MAX;

use super::{MessageType, UmpPacket};

/// Maximum payload bytes per SysEx-7 packet.
pub const SYSEX7_MAX_PAYLOAD: usize = 6;

/// Multi-packet framing marker (word 0 bits 23-20).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Sysex7Format {
    /// Complete message in a single packet.
    Complete = 0x0,
    /// First packet of a multi-packet message.
    Start = 0x1,
    /// Middle packet.
    Continue = 0x2,
    /// Final packet.
    End = 0x3,
}

impl Sysex7Format {
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            0x0 => Some(Sysex7Format::Complete),
            0x1 => Some(Sysex7Format::Start),
            0x2 => Some(Sysex7Format::Continue),
            0x3 => Some(Sysex7Format::End),
            _ => None,
        }
    }
}

/// Build one SysEx-7 packet from up to six payload bytes (0xF0/0xF7 frame
/// bytes excluded).
pub fn sysex7_packet(group: u8, format: Sysex7Format, payload: &[u8]) -> Result<UmpPacket> {
    if group > 15 {
        return Err(Error::InvalidArgument("group out of range"));
    }
    if payload.len() > SYSEX7_MAX_PAYLOAD {
        return Err(Error::InvalidArgument("sysex7 payload exceeds 6 bytes"));
    }
    if payload.iter().any(|&b| b > DATA_BYTE_MAX) {
        return Err(Error::InvalidArgument("sysex7 payload byte out of range"));
    }

    let mut bytes = [0u8; SYSEX7_MAX_PAYLOAD];
    bytes[..payload.len()].copy_from_slice(payload);

    let w0 = (u32::from(MessageType::Data64.as_nibble()) << 28)
        | (u32::from(group) << 24)
        | (u32::from(format as u8) << 20)
        | ((payload.len() as u32) << 16)
        | (u32::from(bytes[0]) << 8)
        | u32::from(bytes[1]);
    let w1 = (u32::from(bytes[2]) << 24)
        | (u32::from(bytes[3]) << 16)
        | (u32::from(bytes[4]) << 8)
        | u32::from(bytes[5]);
    Ok(UmpPacket::from_built(&[w0, w1]))
}

/// Extract the framing marker and payload of a SysEx-7 packet.
/// Returns `None` for other Message Types or a malformed byte count.
pub fn sysex7_payload(packet: &UmpPacket) -> Option<(Sysex7Format, [u8; SYSEX7_MAX_PAYLOAD], usize)> {
    if packet.message_type != MessageType::Data64 {
        return None;
    }
    let w0 = packet.words[0];
    let w1 = packet.words[1];
    let format = Sysex7Format::from_nibble((w0 >> 20) as u8 & 0x0F)?;
    let count = (w0 >> 16) as usize & 0x0F;
    if count > SYSEX7_MAX_PAYLOAD {
        return None;
    }
    let bytes = [
        (w0 >> 8) as u8 & DATA_BYTE_MAX,
        w0 as u8 & DATA_BYTE_MAX,
        (w1 >> 24) as u8 & DATA_BYTE_MAX,
        (w1 >> 16) as u8 & DATA_BYTE_MAX,
        (w1 >> 8) as u8 & DATA_BYTE_MAX,
        w1 as u8 & DATA_BYTE_MAX,
    ];
    Some((format, bytes, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_packet() {
        let packet = sysex7_packet(0, Sysex7Format::Complete, &[0x7E, 0x7F, 0x09]).unwrap();
        assert_eq!(packet.message_type, MessageType::Data64);
        assert_eq!(packet.num_words, 2);

        let (format, bytes, count) = sysex7_payload(&packet).unwrap();
        assert_eq!(format, Sysex7Format::Complete);
        assert_eq!(count, 3);
        assert_eq!(&bytes[..count], &[0x7E, 0x7F, 0x09]);
    }

    #[test]
    fn test_full_six_bytes() {
        let payload = [1, 2, 3, 4, 5, 6];
        let packet = sysex7_packet(3, Sysex7Format::Start, &payload).unwrap();
        assert_eq!(packet.group, 3);
        let (format, bytes, count) = sysex7_payload(&packet).unwrap();
        assert_eq!(format, Sysex7Format::Start);
        assert_eq!(count, 6);
        assert_eq!(&bytes[..], &payload);
    }

    #[test]
    fn test_empty_end_packet() {
        let packet = sysex7_packet(0, Sysex7Format::End, &[]).unwrap();
        let (format, _, count) = sysex7_payload(&packet).unwrap();
        assert_eq!(format, Sysex7Format::End);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_rejects_oversize_and_8bit() {
        assert!(sysex7_packet(0, Sysex7Format::Complete, &[0; 7]).is_err());
        assert!(sysex7_packet(0, Sysex7Format::Complete, &[0x80]).is_err());
        assert!(sysex7_packet(16, Sysex7Format::Complete, &[]).is_err());
    }

    #[test]
    fn test_payload_rejects_other_types() {
        let packet = UmpPacket::decode(&[0x10F8_0000]).unwrap();
        assert!(sysex7_payload(&packet).is_none());
    }
}
