//! # Ponte - Multi-transport MIDI router/bridge
//!
//! Ponte ingests MIDI from four transports (serial DIN, USB, and two UDP
//! Network-MIDI 2.0 links), normalizes everything into a common packet,
//! routes it through a configurable matrix with optional MIDI 1.0 <-> 2.0
//! translation and per-source filtering, and emits it on the selected
//! destinations.
//!
//! ## Architecture
//!
//! The umbrella crate coordinates:
//! - **ponte-core** - message model, byte-stream parser, UMP codec,
//!   protocol translator
//! - **ponte-router** - routing matrix, filters, statistics, the dispatcher
//!   thread and configuration persistence
//! - **ponte-wire** - wire framings: serial byte streams, USB-MIDI event
//!   packets, UMP word streams and the Network-MIDI session protocol
//!
//! ## Quick start
//!
//! ```ignore
//! use ponte::{MidiBridge, TransportId};
//!
//! let bridge = MidiBridge::builder().build()?;
//! bridge.register_tx(TransportId::Usb, usb_sink);
//!
//! // In the serial receive thread:
//! let mut input = bridge.input(TransportId::Serial)?;
//! input.feed_bytes(&uart_bytes);
//! ```

/// Re-export of ponte-core for direct access.
pub use ponte_core as core;
/// Re-export of ponte-router for direct access.
pub use ponte_router as router;
/// Re-export of ponte-wire for direct access.
pub use ponte_wire as wire;

pub use ponte_core::{
    MessageType, Midi1Message, Midi1Packet, Midi1Parser, Midi2Message, TranslationMode,
    Translator, TranslatorConfig, UmpPacket,
};

pub use ponte_router::{
    ConfigStore, FormatPreference, InputFilter, MemoryStore, MidiRouter, PacketFormat, Payload,
    RouterConfig, RouterPacket, StatsSnapshot, TransportId, TransportSink, TRANSPORT_COUNT,
};

pub use ponte_wire::{SessionConfig, SessionManager, UmpStreamDecoder, UsbEventPacket};

mod error;
pub use error::{Error, Result};

mod bridge;
pub use bridge::{InputHandle, MidiBridge};

mod builder;
pub use builder::MidiBridgeBuilder;
