//! MIDI 2.0 Channel Voice messages (MT 0x4): builders and field extraction.
//!
//! Word 0 layout: `[MT:4 | Group:4 | Opcode:4 | Channel:4 | Index:8 | Index:8]`.
//! Word 1 carries the payload; its layout depends on the opcode. Note On/Off
//! pack `[Velocity:16 | AttributeData:16]` with the attribute type in word 0
//! bits 7-0, per the MIDI Association UMP specification.

use crate::error::{Error, Result};
use crate::message::DATA_BYTE_MAX;

use super::{MessageType, UmpPacket};

/// MIDI 2.0 Channel Voice opcodes (word 0 bits 23-20).
pub mod opcode {
    pub const REGISTERED_PER_NOTE_CONTROLLER: u8 = 0x0;
    pub const ASSIGNABLE_PER_NOTE_CONTROLLER: u8 = 0x1;
    pub const REGISTERED_CONTROLLER: u8 = 0x2;
    pub const ASSIGNABLE_CONTROLLER: u8 = 0x3;
    pub const RELATIVE_REGISTERED_CONTROLLER: u8 = 0x4;
    pub const RELATIVE_ASSIGNABLE_CONTROLLER: u8 = 0x5;
    pub const PER_NOTE_PITCH_BEND: u8 = 0x6;
    pub const NOTE_OFF: u8 = 0x8;
    pub const NOTE_ON: u8 = 0x9;
    pub const POLY_PRESSURE: u8 = 0xA;
    pub const CONTROL_CHANGE: u8 = 0xB;
    pub const PROGRAM_CHANGE: u8 = 0xC;
    pub const CHANNEL_PRESSURE: u8 = 0xD;
    pub const PITCH_BEND: u8 = 0xE;
    pub const PER_NOTE_MANAGEMENT: u8 = 0xF;
}

/// Program Change option flag (word 0 bit 0): bank select fields are valid.
const PROGRAM_CHANGE_BANK_VALID: u32 = 0x01;

fn check_group_channel(group: u8, channel: u8) -> Result<()> {
    if group > 15 {
        return Err(Error::InvalidArgument("group out of range"));
    }
    if channel > 15 {
        return Err(Error::InvalidArgument("channel out of range"));
    }
    Ok(())
}

fn check_7bit(value: u8, what: &'static str) -> Result<()> {
    if value > DATA_BYTE_MAX {
        return Err(Error::InvalidArgument(what));
    }
    Ok(())
}

fn word0(group: u8, op: u8, channel: u8, index1: u8, index2: u8) -> u32 {
    (u32::from(MessageType::Midi2ChannelVoice.as_nibble()) << 28)
        | (u32::from(group) << 24)
        | (u32::from(op) << 20)
        | (u32::from(channel) << 16)
        | (u32::from(index1) << 8)
        | u32::from(index2)
}

/// MIDI 2.0 Note On with 16-bit velocity and optional attribute.
pub fn note_on(
    group: u8,
    channel: u8,
    note: u8,
    velocity: u16,
    attr_type: u8,
    attr_data: u16,
) -> Result<UmpPacket> {
    check_group_channel(group, channel)?;
    check_7bit(note, "note out of range")?;
    let w0 = word0(group, opcode::NOTE_ON, channel, note, attr_type);
    let w1 = (u32::from(velocity) << 16) | u32::from(attr_data);
    Ok(UmpPacket::from_built(&[w0, w1]))
}

/// MIDI 2.0 Note Off with 16-bit release velocity.
pub fn note_off(
    group: u8,
    channel: u8,
    note: u8,
    velocity: u16,
    attr_type: u8,
    attr_data: u16,
) -> Result<UmpPacket> {
    check_group_channel(group, channel)?;
    check_7bit(note, "note out of range")?;
    let w0 = word0(group, opcode::NOTE_OFF, channel, note, attr_type);
    let w1 = (u32::from(velocity) << 16) | u32::from(attr_data);
    Ok(UmpPacket::from_built(&[w0, w1]))
}

/// Poly Pressure with a 32-bit pressure value.
pub fn poly_pressure(group: u8, channel: u8, note: u8, pressure: u32) -> Result<UmpPacket> {
    check_group_channel(group, channel)?;
    check_7bit(note, "note out of range")?;
    let w0 = word0(group, opcode::POLY_PRESSURE, channel, note, 0);
    Ok(UmpPacket::from_built(&[w0, pressure]))
}

/// Control Change with a full 32-bit value.
pub fn control_change(group: u8, channel: u8, controller: u8, value: u32) -> Result<UmpPacket> {
    check_group_channel(group, channel)?;
    check_7bit(controller, "controller out of range")?;
    let w0 = word0(group, opcode::CONTROL_CHANGE, channel, controller, 0);
    Ok(UmpPacket::from_built(&[w0, value]))
}

/// Program Change with an optional bank select.
pub fn program_change(
    group: u8,
    channel: u8,
    program: u8,
    bank: Option<(u8, u8)>,
) -> Result<UmpPacket> {
    check_group_channel(group, channel)?;
    check_7bit(program, "program out of range")?;
    let mut w0 = word0(group, opcode::PROGRAM_CHANGE, channel, 0, 0);
    let mut w1 = u32::from(program) << 24;
    if let Some((msb, lsb)) = bank {
        check_7bit(msb, "bank MSB out of range")?;
        check_7bit(lsb, "bank LSB out of range")?;
        w0 |= PROGRAM_CHANGE_BANK_VALID;
        w1 |= (u32::from(msb) << 8) | u32::from(lsb);
    }
    Ok(UmpPacket::from_built(&[w0, w1]))
}

/// Channel Pressure with a 32-bit value.
pub fn channel_pressure(group: u8, channel: u8, pressure: u32) -> Result<UmpPacket> {
    check_group_channel(group, channel)?;
    let w0 = word0(group, opcode::CHANNEL_PRESSURE, channel, 0, 0);
    Ok(UmpPacket::from_built(&[w0, pressure]))
}

/// Pitch Bend, 32-bit unsigned, center `0x8000_0000`.
pub fn pitch_bend(group: u8, channel: u8, value: u32) -> Result<UmpPacket> {
    check_group_channel(group, channel)?;
    let w0 = word0(group, opcode::PITCH_BEND, channel, 0, 0);
    Ok(UmpPacket::from_built(&[w0, value]))
}

/// Decoded MIDI 2.0 Channel Voice message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Midi2Message {
    NoteOn {
        note: u8,
        velocity: u16,
        attr_type: u8,
        attr_data: u16,
    },
    NoteOff {
        note: u8,
        velocity: u16,
        attr_type: u8,
        attr_data: u16,
    },
    PolyPressure {
        note: u8,
        pressure: u32,
    },
    ControlChange {
        controller: u8,
        value: u32,
    },
    ProgramChange {
        program: u8,
        bank: Option<(u8, u8)>,
    },
    ChannelPressure {
        pressure: u32,
    },
    PitchBend {
        value: u32,
    },
    PerNotePitchBend {
        note: u8,
        value: u32,
    },
    RegisteredPerNoteController {
        note: u8,
        index: u8,
        value: u32,
    },
    AssignablePerNoteController {
        note: u8,
        index: u8,
        value: u32,
    },
    RegisteredController {
        bank: u8,
        index: u8,
        value: u32,
    },
    AssignableController {
        bank: u8,
        index: u8,
        value: u32,
    },
    PerNoteManagement {
        note: u8,
        detach: bool,
        reset: bool,
    },
    Unknown {
        op: u8,
    },
}

impl Midi2Message {
    /// Extract the channel-voice fields of an MT 0x4 packet.
    /// Returns `None` for any other Message Type.
    pub fn from_packet(packet: &UmpPacket) -> Option<Self> {
        if packet.message_type != MessageType::Midi2ChannelVoice {
            return None;
        }
        let w0 = packet.words[0];
        let w1 = packet.words[1];
        let op = (w0 >> 20) as u8 & 0x0F;
        let index1 = (w0 >> 8) as u8 & DATA_BYTE_MAX;
        let index2 = w0 as u8;

        Some(match op {
            opcode::NOTE_ON => Midi2Message::NoteOn {
                note: index1,
                velocity: (w1 >> 16) as u16,
                attr_type: index2,
                attr_data: w1 as u16,
            },
            opcode::NOTE_OFF => Midi2Message::NoteOff {
                note: index1,
                velocity: (w1 >> 16) as u16,
                attr_type: index2,
                attr_data: w1 as u16,
            },
            opcode::POLY_PRESSURE => Midi2Message::PolyPressure {
                note: index1,
                pressure: w1,
            },
            opcode::CONTROL_CHANGE => Midi2Message::ControlChange {
                controller: index1,
                value: w1,
            },
            opcode::PROGRAM_CHANGE => {
                let bank = if w0 & PROGRAM_CHANGE_BANK_VALID != 0 {
                    Some(((w1 >> 8) as u8 & DATA_BYTE_MAX, w1 as u8 & DATA_BYTE_MAX))
                } else {
                    None
                };
                Midi2Message::ProgramChange {
                    program: (w1 >> 24) as u8 & DATA_BYTE_MAX,
                    bank,
                }
            }
            opcode::CHANNEL_PRESSURE => Midi2Message::ChannelPressure { pressure: w1 },
            opcode::PITCH_BEND => Midi2Message::PitchBend { value: w1 },
            opcode::PER_NOTE_PITCH_BEND => Midi2Message::PerNotePitchBend {
                note: index1,
                value: w1,
            },
            opcode::REGISTERED_PER_NOTE_CONTROLLER => Midi2Message::RegisteredPerNoteController {
                note: index1,
                index: index2,
                value: w1,
            },
            opcode::ASSIGNABLE_PER_NOTE_CONTROLLER => Midi2Message::AssignablePerNoteController {
                note: index1,
                index: index2,
                value: w1,
            },
            opcode::REGISTERED_CONTROLLER => Midi2Message::RegisteredController {
                bank: index1,
                index: index2 & DATA_BYTE_MAX,
                value: w1,
            },
            opcode::ASSIGNABLE_CONTROLLER => Midi2Message::AssignableController {
                bank: index1,
                index: index2 & DATA_BYTE_MAX,
                value: w1,
            },
            opcode::PER_NOTE_MANAGEMENT => Midi2Message::PerNoteManagement {
                note: index1,
                detach: w0 & 0x02 != 0,
                reset: w0 & 0x01 != 0,
            },
            op => Midi2Message::Unknown { op },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_roundtrip() {
        let packet = note_on(0, 0, 60, 32768, 0, 0).unwrap();
        assert_eq!(packet.num_words, 2);
        assert_eq!(packet.group, 0);
        assert_eq!(packet.channel(), 0);
        assert!(packet.is_valid());

        let decoded = UmpPacket::decode(packet.as_words()).unwrap();
        match Midi2Message::from_packet(&decoded).unwrap() {
            Midi2Message::NoteOn { note, velocity, .. } => {
                assert_eq!(note, 60);
                assert_eq!(velocity, 32768);
            }
            other => panic!("expected NoteOn, got {other:?}"),
        }
    }

    #[test]
    fn test_note_on_word_layout() {
        let packet = note_on(1, 3, 0x3C, 0xABCD, 0x03, 0x1234).unwrap();
        assert_eq!(packet.words[0], 0x4193_3C03);
        assert_eq!(packet.words[1], 0xABCD_1234);
    }

    #[test]
    fn test_builder_validation() {
        assert!(note_on(16, 0, 60, 0, 0, 0).is_err());
        assert!(note_on(0, 16, 60, 0, 0, 0).is_err());
        assert!(note_on(0, 0, 128, 0, 0, 0).is_err());
        assert!(control_change(0, 0, 128, 0).is_err());
        assert!(program_change(0, 0, 128, None).is_err());
        assert!(program_change(0, 0, 0, Some((128, 0))).is_err());
    }

    #[test]
    fn test_control_change_full_value() {
        let packet = control_change(0, 5, 7, 0xFFFF_FFFF).unwrap();
        match Midi2Message::from_packet(&packet).unwrap() {
            Midi2Message::ControlChange { controller, value } => {
                assert_eq!(controller, 7);
                assert_eq!(value, 0xFFFF_FFFF);
            }
            other => panic!("expected ControlChange, got {other:?}"),
        }
        assert_eq!(packet.channel(), 5);
    }

    #[test]
    fn test_program_change_bank() {
        let packet = program_change(0, 2, 42, Some((1, 2))).unwrap();
        match Midi2Message::from_packet(&packet).unwrap() {
            Midi2Message::ProgramChange { program, bank } => {
                assert_eq!(program, 42);
                assert_eq!(bank, Some((1, 2)));
            }
            other => panic!("expected ProgramChange, got {other:?}"),
        }

        let packet = program_change(0, 2, 42, None).unwrap();
        match Midi2Message::from_packet(&packet).unwrap() {
            Midi2Message::ProgramChange { bank, .. } => assert_eq!(bank, None),
            other => panic!("expected ProgramChange, got {other:?}"),
        }
    }

    #[test]
    fn test_pitch_bend_center() {
        let packet = pitch_bend(0, 0, 0x8000_0000).unwrap();
        match Midi2Message::from_packet(&packet).unwrap() {
            Midi2Message::PitchBend { value } => assert_eq!(value, 0x8000_0000),
            other => panic!("expected PitchBend, got {other:?}"),
        }
    }

    #[test]
    fn test_from_packet_rejects_other_types() {
        let packet = UmpPacket::decode(&[0x10F8_0000]).unwrap();
        assert!(Midi2Message::from_packet(&packet).is_none());
    }

    #[test]
    fn test_per_note_management_flags() {
        let w0 = 0x40F0_3C03; // op 0xF, note 0x3C, detach + reset
        let packet = UmpPacket::decode(&[w0, 0]).unwrap();
        match Midi2Message::from_packet(&packet).unwrap() {
            Midi2Message::PerNoteManagement { note, detach, reset } => {
                assert_eq!(note, 0x3C);
                assert!(detach);
                assert!(reset);
            }
            other => panic!("expected PerNoteManagement, got {other:?}"),
        }
    }
}
