//! USB-MIDI 1.0 Event Packet codec.
//!
//! Every event is a 4-byte packet: `[Cable(4)|CIN(4)] [byte0] [byte1]
//! [byte2]`, where the Code Index Number is derived from the MIDI status
//! byte (USB Device Class Definition for MIDI Devices 1.0, table 4-1).

use smallvec::SmallVec;

use ponte_core::message::Midi1Message;
use ponte_core::Midi1Packet;

/// Code Index Numbers used by this codec.
pub mod cin {
    pub const SYSTEM_COMMON_2BYTE: u8 = 0x2;
    pub const SYSTEM_COMMON_3BYTE: u8 = 0x3;
    pub const SYSEX_START_CONTINUE: u8 = 0x4;
    pub const SYSEX_END_1BYTE: u8 = 0x5;
    pub const SYSEX_END_2BYTE: u8 = 0x6;
    pub const SYSEX_END_3BYTE: u8 = 0x7;
    pub const NOTE_OFF: u8 = 0x8;
    pub const NOTE_ON: u8 = 0x9;
    pub const POLY_PRESSURE: u8 = 0xA;
    pub const CONTROL_CHANGE: u8 = 0xB;
    pub const PROGRAM_CHANGE: u8 = 0xC;
    pub const CHANNEL_PRESSURE: u8 = 0xD;
    pub const PITCH_BEND: u8 = 0xE;
    pub const SINGLE_BYTE: u8 = 0xF;
}

/// CIN for a MIDI status byte.
pub fn cin_for_status(status: u8) -> u8 {
    if status >= 0xF8 {
        return cin::SINGLE_BYTE;
    }
    if status >= 0xF0 {
        return match status {
            0xF0 => cin::SYSEX_START_CONTINUE,
            0xF1 | 0xF3 => cin::SYSTEM_COMMON_2BYTE,
            0xF2 => cin::SYSTEM_COMMON_3BYTE,
            0xF7 => cin::SYSEX_END_1BYTE,
            _ => cin::SINGLE_BYTE,
        };
    }
    match (status >> 4) & 0x0F {
        0x8 => cin::NOTE_OFF,
        0x9 => cin::NOTE_ON,
        0xA => cin::POLY_PRESSURE,
        0xB => cin::CONTROL_CHANGE,
        0xC => cin::PROGRAM_CHANGE,
        0xD => cin::CHANNEL_PRESSURE,
        0xE => cin::PITCH_BEND,
        _ => cin::SINGLE_BYTE,
    }
}

/// Meaningful MIDI bytes in a packet with the given CIN.
pub fn payload_len(cin_value: u8) -> usize {
    match cin_value {
        cin::SYSTEM_COMMON_2BYTE => 2,
        cin::SYSTEM_COMMON_3BYTE => 3,
        cin::SYSEX_START_CONTINUE => 3,
        cin::SYSEX_END_1BYTE => 1,
        cin::SYSEX_END_2BYTE => 2,
        cin::SYSEX_END_3BYTE => 3,
        cin::NOTE_OFF
        | cin::NOTE_ON
        | cin::POLY_PRESSURE
        | cin::CONTROL_CHANGE
        | cin::PITCH_BEND => 3,
        cin::PROGRAM_CHANGE | cin::CHANNEL_PRESSURE => 2,
        cin::SINGLE_BYTE => 1,
        _ => 0,
    }
}

/// One USB-MIDI 1.0 Event Packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UsbEventPacket {
    pub cable: u8,
    pub cin: u8,
    pub midi: [u8; 3],
}

impl UsbEventPacket {
    /// 4-byte wire image.
    #[inline]
    pub fn to_bytes(&self) -> [u8; 4] {
        [
            (self.cable << 4) | (self.cin & 0x0F),
            self.midi[0],
            self.midi[1],
            self.midi[2],
        ]
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            cable: bytes[0] >> 4,
            cin: bytes[0] & 0x0F,
            midi: [bytes[1], bytes[2], bytes[3]],
        }
    }

    /// The meaningful MIDI bytes of this event.
    #[inline]
    pub fn midi_bytes(&self) -> &[u8] {
        &self.midi[..payload_len(self.cin)]
    }

    /// Pack a non-SysEx message. SysEx spans several packets; use
    /// [`sysex_event_packets`].
    pub fn from_message(msg: &Midi1Message<'_>, cable: u8) -> Option<Self> {
        let packet = Midi1Packet::from_message(msg)?;
        Some(Self::from_packet(&packet, cable))
    }

    pub fn from_packet(packet: &Midi1Packet, cable: u8) -> Self {
        Self {
            cable,
            cin: cin_for_status(packet.status),
            midi: [packet.status, packet.data[0], packet.data[1]],
        }
    }
}

/// Fragment a SysEx payload (0xF0/0xF7 excluded) into event packets:
/// CIN 0x4 start/continue triples, then a CIN 0x5/0x6/0x7 terminator
/// carrying the closing 0xF7.
pub fn sysex_event_packets(payload: &[u8], cable: u8) -> SmallVec<[UsbEventPacket; 4]> {
    let mut wire = SmallVec::<[u8; 16]>::new();
    wire.push(0xF0);
    wire.extend_from_slice(payload);
    wire.push(0xF7);

    let mut out = SmallVec::new();
    let mut chunks = wire.chunks(3).peekable();
    while let Some(chunk) = chunks.next() {
        let last = chunks.peek().is_none();
        let cin_value = if last {
            match chunk.len() {
                1 => cin::SYSEX_END_1BYTE,
                2 => cin::SYSEX_END_2BYTE,
                _ => cin::SYSEX_END_3BYTE,
            }
        } else {
            cin::SYSEX_START_CONTINUE
        };
        let mut midi = [0u8; 3];
        midi[..chunk.len()].copy_from_slice(chunk);
        out.push(UsbEventPacket {
            cable,
            cin: cin_value,
            midi,
        });
    }
    out
}
