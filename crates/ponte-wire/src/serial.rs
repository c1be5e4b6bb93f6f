//! MIDI 1.0 byte-stream serialization for the serial DIN transport.
//!
//! The serializer always writes explicit status bytes; running-status
//! compaction is a sender-side optimization the DIN link does not require.

use ponte_core::message::Midi1Message;
use ponte_core::ump::{sysex7_payload, Sysex7Format};
use ponte_core::{Midi1Packet, UmpPacket};

/// Serialize a message to raw MIDI 1.0 bytes, including 0xF0/0xF7 framing
/// for System Exclusive.
pub fn encode_message(msg: &Midi1Message<'_>, out: &mut Vec<u8>) {
    match *msg {
        Midi1Message::ChannelVoice { status, data, len }
        | Midi1Message::SystemCommon { status, data, len } => {
            out.push(status);
            for i in 0..usize::from(len).saturating_sub(1) {
                out.push(data[i]);
            }
        }
        Midi1Message::RealTime(status) => out.push(status),
        Midi1Message::SysEx(data) => {
            out.push(0xF0);
            out.extend_from_slice(data);
            out.push(0xF7);
        }
    }
}

/// Serialize a queue image.
pub fn encode_packet(packet: &Midi1Packet, out: &mut Vec<u8>) {
    encode_message(&packet.message(), out);
}

/// Serialize one Data-64 SysEx-7 fragment to the byte stream.
///
/// Start/Complete fragments open the 0xF0 frame; End/Complete fragments
/// close it with 0xF7. Stateless per fragment, so an ordered fragment
/// sequence reproduces the original `F0 .. F7` run. Returns `false` when
/// the packet is not a SysEx-7 fragment.
pub fn encode_sysex7_fragment(packet: &UmpPacket, out: &mut Vec<u8>) -> bool {
    let Some((format, bytes, count)) = sysex7_payload(packet) else {
        return false;
    };
    if matches!(format, Sysex7Format::Complete | Sysex7Format::Start) {
        out.push(0xF0);
    }
    out.extend_from_slice(&bytes[..count]);
    if matches!(format, Sysex7Format::Complete | Sysex7Format::End) {
        out.push(0xF7);
    }
    true
}
