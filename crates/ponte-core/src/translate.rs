//! MIDI 1.0 <-> MIDI 2.0 protocol translation.
//!
//! Resolution conversion uses the canonical Min-Center-Max upscaling: 0, the
//! center point and the maximum map exactly, with linear segments between.
//! Downscaling is the canonical lossy reverse (right shift), chosen so that
//! `downscale(upscale(v)) == v` over the whole source range.

use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::message::{
    data_byte_count, is_realtime, is_system_common, status, Midi1Message, Midi1Packet,
    STATUS_TYPE_MASK,
};
use crate::ump::{
    self, midi2, system_packet, MessageType, Midi2Message, Sysex7Format, UmpPacket,
    SYSEX7_MAX_PAYLOAD,
};

/// 7-bit to 16-bit Min-Center-Max upscaling (velocity).
pub fn upscale_7to16(value: u8) -> u16 {
    if value == 0 {
        0
    } else if value == 64 {
        32768
    } else if value >= 127 {
        65535
    } else if value < 64 {
        ((u32::from(value) * 32767) / 63) as u16
    } else {
        (32768 + (u32::from(value - 64) * 32767) / 63) as u16
    }
}

/// 7-bit to 32-bit Min-Center-Max upscaling (controllers, pressure).
pub fn upscale_7to32(value: u8) -> u32 {
    if value == 0 {
        0
    } else if value == 64 {
        0x8000_0000
    } else if value >= 127 {
        0xFFFF_FFFF
    } else if value < 64 {
        ((u64::from(value) * 0x7FFF_FFFF) / 63) as u32
    } else {
        (0x8000_0000 + (u64::from(value - 64) * 0x7FFF_FFFF) / 63) as u32
    }
}

/// 14-bit to 32-bit Min-Center-Max upscaling (pitch bend, center 8192).
pub fn upscale_14to32(value: u16) -> u32 {
    if value == 0 {
        0
    } else if value == 8192 {
        0x8000_0000
    } else if value >= 16383 {
        0xFFFF_FFFF
    } else if value < 8192 {
        ((u64::from(value) * 0x7FFF_FFFF) / 8191) as u32
    } else {
        (0x8000_0000 + (u64::from(value - 8192) * 0x7FFF_FFFF) / 8191) as u32
    }
}

#[inline]
pub fn downscale_16to7(value: u16) -> u8 {
    (value >> 9) as u8
}

#[inline]
pub fn downscale_32to7(value: u32) -> u8 {
    (value >> 25) as u8
}

#[inline]
pub fn downscale_32to14(value: u32) -> u16 {
    (value >> 18) as u16
}

/// Translation behavior selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TranslationMode {
    #[default]
    Default,
    /// MPE-aware channel handling.
    Mpe,
    Custom,
}

/// Translator options.
#[derive(Clone, Copy, Debug)]
pub struct TranslatorConfig {
    pub mode: TranslationMode,
    /// UMP group stamped on translated packets (0-15).
    pub default_group: u8,
    pub preserve_timing: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            mode: TranslationMode::Default,
            default_group: 0,
            preserve_timing: true,
        }
    }
}

/// Translation fan-out: one packet for most messages, several for
/// fragmented SysEx.
pub type UmpBurst = SmallVec<[UmpPacket; 4]>;

/// Stateless bidirectional MIDI 1.0 <-> UMP translator.
pub struct Translator {
    config: TranslatorConfig,
}

impl Translator {
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        if config.default_group > 15 {
            return Err(Error::InvalidArgument("default group out of range"));
        }
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Translate a MIDI 1.0 message to UMP.
    ///
    /// Channel Voice becomes MT 0x4 with upscaled payloads; System Real-Time
    /// and System Common become single-word MT 0x1; System Exclusive is
    /// fragmented into MT 0x3 SysEx-7 packets of up to six bytes each.
    pub fn to_ump(&self, msg: &Midi1Message<'_>) -> Result<UmpBurst> {
        let group = self.config.default_group;
        let mut out = UmpBurst::new();
        match *msg {
            Midi1Message::ChannelVoice {
                status: st, data, ..
            } => {
                let channel = st & 0x0F;
                let packet = match st & STATUS_TYPE_MASK {
                    status::NOTE_ON => {
                        midi2::note_on(group, channel, data[0], upscale_7to16(data[1]), 0, 0)?
                    }
                    status::NOTE_OFF => {
                        midi2::note_off(group, channel, data[0], upscale_7to16(data[1]), 0, 0)?
                    }
                    status::POLY_PRESSURE => {
                        midi2::poly_pressure(group, channel, data[0], upscale_7to32(data[1]))?
                    }
                    status::CONTROL_CHANGE => {
                        midi2::control_change(group, channel, data[0], upscale_7to32(data[1]))?
                    }
                    status::PROGRAM_CHANGE => {
                        midi2::program_change(group, channel, data[0], None)?
                    }
                    status::CHANNEL_PRESSURE => {
                        midi2::channel_pressure(group, channel, upscale_7to32(data[0]))?
                    }
                    status::PITCH_BEND => {
                        let bend14 = u16::from(data[0]) | (u16::from(data[1]) << 7);
                        midi2::pitch_bend(group, channel, upscale_14to32(bend14))?
                    }
                    _ => return Err(Error::NotSupported),
                };
                out.push(packet);
            }
            Midi1Message::RealTime(st) => {
                out.push(system_packet(group, st, 0, 0)?);
            }
            Midi1Message::SystemCommon {
                status: st, data, ..
            } => {
                let n = data_byte_count(st);
                let d1 = if n >= 1 { data[0] } else { 0 };
                let d2 = if n >= 2 { data[1] } else { 0 };
                out.push(system_packet(group, st, d1, d2)?);
            }
            Midi1Message::SysEx(data) => {
                self.fragment_sysex(data, &mut out)?;
            }
        }
        Ok(out)
    }

    fn fragment_sysex(&self, data: &[u8], out: &mut UmpBurst) -> Result<()> {
        let group = self.config.default_group;
        if data.len() <= SYSEX7_MAX_PAYLOAD {
            out.push(ump::sysex7_packet(group, Sysex7Format::Complete, data)?);
            return Ok(());
        }
        let mut chunks = data.chunks(SYSEX7_MAX_PAYLOAD).peekable();
        let mut first = true;
        while let Some(chunk) = chunks.next() {
            let format = if first {
                Sysex7Format::Start
            } else if chunks.peek().is_some() {
                Sysex7Format::Continue
            } else {
                Sysex7Format::End
            };
            first = false;
            out.push(ump::sysex7_packet(group, format, chunk)?);
        }
        Ok(())
    }

    /// Translate a UMP packet to a MIDI 1.0 message image.
    ///
    /// MT 0x4 Channel Voice downscales to its MIDI 1.0 equivalent; messages
    /// with no equivalent (per-note pitch bend, per-note controllers,
    /// registered/assignable controllers, per-note management) are declined
    /// with `NotSupported`. MT 0x1 and MT 0x2 map directly. Data packets are
    /// an egress concern and are declined here.
    pub fn to_midi1(&self, packet: &UmpPacket) -> Result<Midi1Packet> {
        match packet.message_type {
            MessageType::System => {
                let st = packet.status_byte();
                if is_realtime(st) {
                    return Ok(Midi1Packet::new(st, [0; 2], 1));
                }
                if is_system_common(st) {
                    let n = data_byte_count(st);
                    let data = [
                        (packet.words[0] >> 8) as u8 & 0x7F,
                        packet.words[0] as u8 & 0x7F,
                    ];
                    return Ok(Midi1Packet::new(st, data, 1 + n));
                }
                Err(Error::NotSupported)
            }
            MessageType::Midi1ChannelVoice => {
                // Legacy channel voice carried in UMP: bytes pass through.
                let st = packet.status_byte();
                let data = [
                    (packet.words[0] >> 8) as u8 & 0x7F,
                    packet.words[0] as u8 & 0x7F,
                ];
                Ok(Midi1Packet::new(st, data, 1 + data_byte_count(st)))
            }
            MessageType::Midi2ChannelVoice => self.midi2_to_midi1(packet),
            _ => Err(Error::NotSupported),
        }
    }

    fn midi2_to_midi1(&self, packet: &UmpPacket) -> Result<Midi1Packet> {
        let channel = packet.channel();
        let msg = Midi2Message::from_packet(packet).ok_or(Error::NotSupported)?;
        let packet = match msg {
            Midi2Message::NoteOn { note, velocity, .. } => Midi1Packet::new(
                status::NOTE_ON | channel,
                [note, downscale_16to7(velocity)],
                3,
            ),
            Midi2Message::NoteOff { note, velocity, .. } => Midi1Packet::new(
                status::NOTE_OFF | channel,
                [note, downscale_16to7(velocity)],
                3,
            ),
            Midi2Message::PolyPressure { note, pressure } => Midi1Packet::new(
                status::POLY_PRESSURE | channel,
                [note, downscale_32to7(pressure)],
                3,
            ),
            Midi2Message::ControlChange { controller, value } => Midi1Packet::new(
                status::CONTROL_CHANGE | channel,
                [controller, downscale_32to7(value)],
                3,
            ),
            // Bank select would need a CC 0/32 pair ahead of the program
            // change; the single-message translation drops it.
            Midi2Message::ProgramChange { program, .. } => {
                Midi1Packet::new(status::PROGRAM_CHANGE | channel, [program, 0], 2)
            }
            Midi2Message::ChannelPressure { pressure } => Midi1Packet::new(
                status::CHANNEL_PRESSURE | channel,
                [downscale_32to7(pressure), 0],
                2,
            ),
            Midi2Message::PitchBend { value } => {
                let bend14 = downscale_32to14(value);
                Midi1Packet::new(
                    status::PITCH_BEND | channel,
                    [(bend14 & 0x7F) as u8, (bend14 >> 7) as u8],
                    3,
                )
            }
            Midi2Message::PerNotePitchBend { .. }
            | Midi2Message::RegisteredPerNoteController { .. }
            | Midi2Message::AssignablePerNoteController { .. }
            | Midi2Message::RegisteredController { .. }
            | Midi2Message::AssignableController { .. }
            | Midi2Message::PerNoteManagement { .. }
            | Midi2Message::Unknown { .. } => return Err(Error::NotSupported),
        };
        Ok(packet)
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self {
            config: TranslatorConfig::default(),
        }
    }
}
