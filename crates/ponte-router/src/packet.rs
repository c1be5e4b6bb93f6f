//! Normalized router packet and transport identity.

use serde::{Deserialize, Serialize};

use ponte_core::{MessageType, Midi1Packet, UmpPacket};

/// Number of transports; fixed at configuration.
pub const TRANSPORT_COUNT: usize = 4;

/// The four transports of the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportId {
    /// Serial DIN link (MIDI 1.0).
    Serial,
    /// USB MIDI, device or host role (MIDI 1.0 / 2.0).
    Usb,
    /// Network-MIDI 2.0 over UDP, wired.
    Ethernet,
    /// Network-MIDI 2.0 over UDP, wireless.
    Wifi,
}

impl TransportId {
    pub const ALL: [TransportId; TRANSPORT_COUNT] = [
        TransportId::Serial,
        TransportId::Usb,
        TransportId::Ethernet,
        TransportId::Wifi,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            TransportId::Serial => 0,
            TransportId::Usb => 1,
            TransportId::Ethernet => 2,
            TransportId::Wifi => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            TransportId::Serial => "Serial",
            TransportId::Usb => "USB",
            TransportId::Ethernet => "Ethernet",
            TransportId::Wifi => "WiFi",
        }
    }

    /// Protocol family this destination speaks.
    pub fn preferred_format(self) -> FormatPreference {
        match self {
            TransportId::Serial => FormatPreference::Midi1Only,
            TransportId::Usb => FormatPreference::Either,
            TransportId::Ethernet | TransportId::Wifi => FormatPreference::Midi2Only,
        }
    }
}

/// Payload protocol family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketFormat {
    Midi1,
    Midi2,
}

/// What a destination accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatPreference {
    Midi1Only,
    Midi2Only,
    Either,
}

impl FormatPreference {
    #[inline]
    pub fn accepts(self, format: PacketFormat) -> bool {
        match self {
            FormatPreference::Either => true,
            FormatPreference::Midi1Only => format == PacketFormat::Midi1,
            FormatPreference::Midi2Only => format == PacketFormat::Midi2,
        }
    }
}

/// Tagged payload of a normalized packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Payload {
    Midi1(Midi1Packet),
    Ump(UmpPacket),
}

impl Payload {
    #[inline]
    pub fn format(&self) -> PacketFormat {
        match self {
            Payload::Midi1(_) => PacketFormat::Midi1,
            Payload::Ump(_) => PacketFormat::Midi2,
        }
    }

    /// Channel for channel-bearing payloads (MIDI 1.0 channel voice, UMP
    /// MT 0x2/0x4).
    pub fn channel(&self) -> Option<u8> {
        match self {
            Payload::Midi1(packet) => packet.is_channel_voice().then(|| packet.channel()),
            Payload::Ump(packet) => matches!(
                packet.message_type,
                MessageType::Midi1ChannelVoice | MessageType::Midi2ChannelVoice
            )
            .then(|| packet.channel()),
        }
    }

    /// Status byte for payloads that carry one (MIDI 1.0, UMP System and
    /// MT 0x2). Used by the block filters.
    pub fn status(&self) -> Option<u8> {
        match self {
            Payload::Midi1(packet) => Some(packet.status),
            Payload::Ump(packet) => matches!(
                packet.message_type,
                MessageType::System | MessageType::Midi1ChannelVoice
            )
            .then(|| packet.status_byte()),
        }
    }
}

/// Normalized packet flowing through the router queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouterPacket {
    pub source: TransportId,
    /// Destination annotation; `None` is the broadcast sentinel. Dispatch
    /// fan-out is governed by the routing matrix alone and never reads
    /// this field.
    pub destination: Option<TransportId>,
    /// Monotonic microsecond timestamp stamped at ingress.
    pub timestamp_us: u64,
    pub payload: Payload,
}

impl RouterPacket {
    pub fn broadcast(source: TransportId, timestamp_us: u64, payload: Payload) -> Self {
        Self {
            source,
            destination: None,
            timestamp_us,
            payload,
        }
    }
}
