//! Routing engine for the ponte bridge.
//!
//! Normalized packets from any transport enter a bounded queue; a single
//! dispatcher thread expands each packet through the routing matrix, applies
//! per-source filters, auto-translates between protocol families where the
//! destination requires it and hands the result to per-destination sinks.

pub mod error;
pub use error::{Error, Result};

pub mod packet;
pub use packet::{
    FormatPreference, PacketFormat, Payload, RouterPacket, TransportId, TRANSPORT_COUNT,
};

pub mod config;
pub use config::{InputFilter, RouterConfig};

pub mod stats;
pub use stats::{RouterStats, StatsSnapshot};

pub mod store;
pub use store::{ConfigStore, MemoryStore};

pub mod router;
pub use router::{MidiRouter, TransportSink, DEFAULT_DRAIN_BUDGET, QUEUE_CAPACITY};
