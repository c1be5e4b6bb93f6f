//! The bridge engine: transport ingress normalization in front of the
//! routing engine.
//!
//! Each transport receive thread owns an [`InputHandle`], feeds it raw MIDI
//! 1.0 bytes or UMP words, and the handle parses, timestamps and enqueues
//! normalized packets. System Exclusive is fragmented into Data-64 UMPs at
//! ingress so the queue carries only fixed-size payloads.

use std::sync::Arc;
use std::time::Instant;

use ponte_core::{Midi1Message, Midi1Packet, Midi1Parser, Translator, TranslatorConfig, UmpPacket};
use ponte_router::{
    ConfigStore, InputFilter, MidiRouter, Payload, RouterConfig, RouterPacket, StatsSnapshot,
    TransportId, TransportSink,
};

use crate::builder::MidiBridgeBuilder;
use crate::Result;

/// Multi-transport MIDI router/bridge.
pub struct MidiBridge {
    router: Arc<MidiRouter>,
    translator_config: TranslatorConfig,
    sysex_capacity: usize,
    epoch: Instant,
}

impl MidiBridge {
    pub fn builder() -> MidiBridgeBuilder {
        MidiBridgeBuilder::default()
    }

    /// Bridge with default configuration and no persistence.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub(crate) fn from_parts(
        config: Option<RouterConfig>,
        store: Option<Arc<dyn ConfigStore>>,
        translator_config: TranslatorConfig,
        sysex_capacity: usize,
        drain_budget: Option<usize>,
    ) -> Result<Self> {
        // Fail fast on bad translator options instead of at first input().
        Translator::new(translator_config)?;
        let router = match store {
            Some(store) => MidiRouter::with_store(config, store)?,
            None => MidiRouter::new(config.unwrap_or_default())?,
        };
        if let Some(budget) = drain_budget {
            router.set_drain_budget(budget);
        }
        Ok(Self {
            router: Arc::new(router),
            translator_config,
            sysex_capacity,
            epoch: Instant::now(),
        })
    }

    /// The routing engine, for configuration and statistics.
    pub fn router(&self) -> &MidiRouter {
        &self.router
    }

    /// Ingress handle for one transport. Each receive thread owns its own
    /// handle; the parser inside is single-threaded per stream.
    pub fn input(&self, transport: TransportId) -> Result<InputHandle> {
        Ok(InputHandle {
            transport,
            parser: Midi1Parser::new(self.sysex_capacity),
            translator: Translator::new(self.translator_config)?,
            router: Arc::clone(&self.router),
            epoch: self.epoch,
        })
    }

    /// Install the egress sink for a destination transport.
    pub fn register_tx(&self, transport: TransportId, sink: Arc<dyn TransportSink>) {
        self.router.register_tx(transport, sink);
    }

    pub fn set_filter(&self, transport: TransportId, filter: InputFilter) {
        self.router.set_filter(transport, filter);
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.router.stats()
    }

    /// Microseconds since the bridge epoch.
    pub fn timestamp_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }

    /// Quiesce the dispatcher and persist the configuration.
    pub fn shutdown(self) -> Result<()> {
        self.router.shutdown()?;
        Ok(())
    }
}

/// Per-transport ingress: parses raw input, stamps timestamps and enqueues
/// normalized packets.
pub struct InputHandle {
    transport: TransportId,
    parser: Midi1Parser,
    translator: Translator,
    router: Arc<MidiRouter>,
    epoch: Instant,
}

impl InputHandle {
    pub fn transport(&self) -> TransportId {
        self.transport
    }

    /// Parse raw MIDI 1.0 bytes and enqueue every complete message.
    /// Returns the number of packets enqueued; queue overflow is counted by
    /// the router and otherwise dropped silently.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> usize {
        let epoch = self.epoch;
        let mut enqueued = 0;
        for &byte in bytes {
            let timestamp_us = epoch.elapsed().as_micros() as u64;
            let Some(msg) = self.parser.parse_byte(byte) else {
                continue;
            };
            match Midi1Packet::from_message(&msg) {
                Some(packet) => {
                    let packet = RouterPacket::broadcast(
                        self.transport,
                        timestamp_us,
                        Payload::Midi1(packet),
                    );
                    if self.router.send(packet).is_ok() {
                        enqueued += 1;
                    }
                }
                None => {
                    // SysEx: fragment into Data-64 UMPs for the queue.
                    enqueued += enqueue_sysex(
                        &self.translator,
                        &self.router,
                        self.transport,
                        timestamp_us,
                        &msg,
                    );
                }
            }
        }
        enqueued
    }

    /// Decode a UMP word stream and enqueue every packet.
    pub fn feed_words(&mut self, words: &[u32]) -> usize {
        let mut enqueued = 0;
        let mut offset = 0;
        while offset < words.len() {
            let packet = match UmpPacket::decode(&words[offset..]) {
                Ok(packet) => packet,
                Err(err) => {
                    tracing::warn!(%err, "truncated UMP word stream");
                    break;
                }
            };
            offset += packet.num_words as usize;
            let packet = RouterPacket::broadcast(
                self.transport,
                self.epoch.elapsed().as_micros() as u64,
                Payload::Ump(packet),
            );
            if self.router.send(packet).is_ok() {
                enqueued += 1;
            }
        }
        enqueued
    }

    /// Reset the stream parser (e.g. after a link re-connect).
    pub fn reset_parser(&mut self) {
        self.parser.reset();
    }

    pub fn parse_errors(&self) -> u64 {
        self.parser.parse_errors()
    }
}

fn enqueue_sysex(
    translator: &Translator,
    router: &MidiRouter,
    transport: TransportId,
    timestamp_us: u64,
    msg: &Midi1Message<'_>,
) -> usize {
    let burst = match translator.to_ump(msg) {
        Ok(burst) => burst,
        Err(err) => {
            tracing::warn!(%err, "sysex fragmentation failed");
            return 0;
        }
    };
    let mut enqueued = 0;
    for ump in burst {
        let packet = RouterPacket::broadcast(transport, timestamp_us, Payload::Ump(ump));
        if router.send(packet).is_ok() {
            enqueued += 1;
        }
    }
    enqueued
}
