//! Core MIDI protocol machinery for the ponte router.
//!
//! Four pieces, in dependency order: the MIDI 1.0 message model
//! ([`message`]), the stateful byte-stream parser ([`parser`]), the
//! Universal MIDI Packet codec ([`ump`]), and the MIDI 1.0 <-> 2.0
//! translator ([`translate`]). The parser is stateful per stream; the codec
//! and translator are pure functions of their inputs.

pub mod error;
pub use error::{Error, Result};

pub mod message;
pub use message::{Midi1Message, Midi1Packet};

pub mod parser;
pub use parser::Midi1Parser;

pub mod ump;
pub use ump::{MessageType, Midi2Message, Sysex7Format, UmpPacket};

pub mod translate;
pub use translate::{TranslationMode, Translator, TranslatorConfig, UmpBurst};
