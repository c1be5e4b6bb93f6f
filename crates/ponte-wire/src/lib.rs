//! Wire framings for the ponte transports.
//!
//! Each module covers one link format: raw MIDI 1.0 byte streams for the
//! serial DIN transport, 4-byte USB-MIDI 1.0 Event Packets, the
//! little-endian UMP word stream, and the minimal Network-MIDI 2.0 session
//! protocol spoken by the two UDP transports.

pub mod error;
pub use error::{Error, Result};

pub mod serial;

pub mod usb;
pub use usb::UsbEventPacket;

pub mod ump_stream;
pub use ump_stream::UmpStreamDecoder;

pub mod session;
pub use session::{
    FrameSink, Header, PacketKind, SessionConfig, SessionEvent, SessionManager, SessionState,
};
