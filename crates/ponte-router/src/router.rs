//! Matrix routing engine.
//!
//! # Architecture
//!
//! ```text
//! transport RX threads                dispatcher thread
//!        |                                   |
//!  send() try_send --> bounded(64) --> recv loop --> filter -> matrix
//!        |                                   |          -> auto-translate
//!  setters (Mutex staging)                   |          -> per-dest sink
//!        '-- commit --> ArcSwap<RouterConfig> (lock-free load)
//! ```
//!
//! Producers never wait: a full queue drops the packet and counts it.
//! Configuration mutations commit an immutable snapshot the dispatcher
//! loads per packet; readers never block writers. Per-destination failures
//! are local and do not abort the remaining fan-out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use ponte_core::{Translator, TranslatorConfig};

use crate::config::{InputFilter, RouterConfig};
use crate::error::{Error, Result};
use crate::packet::{Payload, RouterPacket, TransportId, TRANSPORT_COUNT};
use crate::stats::{RouterStats, StatsSnapshot};
use crate::store::{decode_config, encode_config, ConfigStore};

/// Central queue depth.
pub const QUEUE_CAPACITY: usize = 64;

/// In-flight packets processed after a shutdown request, by default the
/// whole queue.
pub const DEFAULT_DRAIN_BUDGET: usize = QUEUE_CAPACITY;

/// Per-destination egress capability. Implementations may block on their
/// underlying resource; the dispatcher serializes the fan-out of one packet.
pub trait TransportSink: Send + Sync {
    fn send(&self, packet: &RouterPacket) -> Result<()>;
}

struct Shared {
    config: ArcSwap<RouterConfig>,
    sinks: ArcSwap<Vec<Option<Arc<dyn TransportSink>>>>,
    stats: RouterStats,
}

/// The routing engine: one dispatcher thread consuming a bounded queue fed
/// by the transport receive threads.
pub struct MidiRouter {
    shared: Arc<Shared>,
    /// Staging copy mutated under lock, committed to `shared.config`.
    staging: Mutex<RouterConfig>,
    packet_tx: Sender<RouterPacket>,
    shutdown_tx: Sender<usize>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    store: Option<Arc<dyn ConfigStore>>,
    drain_budget: AtomicUsize,
}

impl MidiRouter {
    /// Router with an explicit configuration and no persistence.
    pub fn new(config: RouterConfig) -> Result<Self> {
        Self::build(Some(config), None)
    }

    /// Router backed by a configuration store. With `config == None` the
    /// stored blob is loaded; a missing or unreadable blob falls back to
    /// defaults.
    pub fn with_store(config: Option<RouterConfig>, store: Arc<dyn ConfigStore>) -> Result<Self> {
        Self::build(config, Some(store))
    }

    fn build(config: Option<RouterConfig>, store: Option<Arc<dyn ConfigStore>>) -> Result<Self> {
        let config = match config {
            Some(config) => config,
            None => Self::load_or_default(store.as_deref()),
        };
        config.validate()?;

        let shared = Arc::new(Shared {
            config: ArcSwap::from_pointee(config.clone()),
            sinks: ArcSwap::from_pointee(vec![None; TRANSPORT_COUNT]),
            stats: RouterStats::new(),
        });

        let (packet_tx, packet_rx) = crossbeam_channel::bounded(QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        let dispatcher_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("ponte-router".into())
            .spawn(move || dispatcher_loop(dispatcher_shared, packet_rx, shutdown_rx))
            .map_err(|err| Error::Io(err.to_string()))?;

        tracing::info!("router initialized");
        Ok(Self {
            shared,
            staging: Mutex::new(config),
            packet_tx,
            shutdown_tx,
            dispatcher: Mutex::new(Some(handle)),
            store,
            drain_budget: AtomicUsize::new(DEFAULT_DRAIN_BUDGET),
        })
    }

    fn load_or_default(store: Option<&dyn ConfigStore>) -> RouterConfig {
        let Some(store) = store else {
            return RouterConfig::default();
        };
        match store.load() {
            Ok(Some(bytes)) => match decode_config(&bytes) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(%err, "stored config unreadable, using defaults");
                    RouterConfig::default()
                }
            },
            Ok(None) => {
                tracing::info!("no saved config, using defaults");
                RouterConfig::default()
            }
            Err(err) => {
                tracing::warn!(%err, "config store load failed, using defaults");
                RouterConfig::default()
            }
        }
    }

    /// Non-blocking enqueue. A full queue drops the packet, counts it
    /// against the source and returns `QueueFull`.
    pub fn send(&self, packet: RouterPacket) -> Result<()> {
        match self.packet_tx.try_send(packet) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(packet)) => {
                self.shared.stats.bump_dropped(packet.source);
                Err(Error::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(Error::InvalidState("router stopped")),
        }
    }

    /// Blocking enqueue, for producers that prefer back-pressure over
    /// drops.
    pub fn send_blocking(&self, packet: RouterPacket) -> Result<()> {
        self.packet_tx
            .send(packet)
            .map_err(|_| Error::InvalidState("router stopped"))
    }

    /// Install the egress sink for a destination.
    pub fn register_tx(&self, transport: TransportId, sink: Arc<dyn TransportSink>) {
        let current = self.shared.sinks.load();
        let mut next = (**current).clone();
        next[transport.index()] = Some(sink);
        self.shared.sinks.store(Arc::new(next));
        tracing::info!(transport = transport.name(), "registered tx sink");
    }

    fn commit(&self, mutate: impl FnOnce(&mut RouterConfig)) {
        let mut staging = self.staging.lock();
        mutate(&mut staging);
        self.shared.config.store(Arc::new(staging.clone()));
    }

    pub fn set_route(&self, src: TransportId, dst: TransportId, enabled: bool) {
        self.commit(|config| config.set_route(src, dst, enabled));
    }

    pub fn route(&self, src: TransportId, dst: TransportId) -> bool {
        self.staging.lock().route(src, dst)
    }

    pub fn set_filter(&self, transport: TransportId, filter: InputFilter) {
        self.commit(|config| config.filters[transport.index()] = filter);
    }

    pub fn set_merge_mode(&self, enabled: bool) {
        self.commit(|config| config.merge_inputs = enabled);
    }

    pub fn set_auto_translate(&self, enabled: bool) {
        self.commit(|config| config.auto_translate = enabled);
    }

    pub fn set_default_group(&self, group: u8) -> Result<()> {
        if group > 15 {
            return Err(Error::InvalidArgument("default group out of range"));
        }
        self.commit(|config| config.default_group = group);
        Ok(())
    }

    /// Copy of the current configuration.
    pub fn config(&self) -> RouterConfig {
        self.staging.lock().clone()
    }

    pub fn reset_config(&self) {
        self.commit(|config| *config = RouterConfig::default());
    }

    /// Persist the current configuration.
    pub fn save_config(&self) -> Result<()> {
        let store = self
            .store
            .as_ref()
            .ok_or(Error::InvalidState("no config store"))?;
        let bytes = encode_config(&self.staging.lock())?;
        store.save(&bytes)
    }

    /// Replace the configuration from the store. Returns `false` when the
    /// store holds no blob (the current configuration is kept).
    pub fn load_config(&self) -> Result<bool> {
        let store = self
            .store
            .as_ref()
            .ok_or(Error::InvalidState("no config store"))?;
        match store.load()? {
            Some(bytes) => {
                let config = decode_config(&bytes)?;
                self.commit(|current| *current = config);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.shared.stats.reset();
    }

    /// In-flight packets the dispatcher may still process during shutdown.
    pub fn set_drain_budget(&self, budget: usize) {
        self.drain_budget.store(budget, Ordering::Relaxed);
    }

    /// Stop the dispatcher, draining up to the configured budget, and
    /// persist the configuration when a store is attached. Idempotent;
    /// later `send` calls fail with `InvalidState`.
    pub fn shutdown(&self) -> Result<()> {
        let Some(handle) = self.dispatcher.lock().take() else {
            return Ok(());
        };
        let _ = self
            .shutdown_tx
            .send(self.drain_budget.load(Ordering::Relaxed));
        handle
            .join()
            .map_err(|_| Error::InvalidState("dispatcher panicked"))?;
        if self.store.is_some() {
            self.save_config()?;
        }
        tracing::info!("router shut down");
        Ok(())
    }
}

impl Drop for MidiRouter {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn dispatcher_loop(
    shared: Arc<Shared>,
    packet_rx: Receiver<RouterPacket>,
    shutdown_rx: Receiver<usize>,
) {
    tracing::debug!("router dispatcher started");
    loop {
        crossbeam_channel::select! {
            recv(packet_rx) -> msg => match msg {
                Ok(packet) => dispatch(&shared, &packet),
                Err(_) => break,
            },
            recv(shutdown_rx) -> budget => {
                let budget = budget.unwrap_or(0);
                let mut drained = 0;
                while drained < budget {
                    match packet_rx.try_recv() {
                        Ok(packet) => {
                            dispatch(&shared, &packet);
                            drained += 1;
                        }
                        Err(_) => break,
                    }
                }
                tracing::debug!(drained, "router dispatcher stopping");
                break;
            }
        }
    }
}

fn dispatch(shared: &Shared, packet: &RouterPacket) {
    let config = shared.config.load();
    let src = packet.source;

    // Filters apply at the source, before destination expansion.
    if !config.filters[src.index()].passes(&packet.payload) {
        shared.stats.bump_filtered(src);
        return;
    }

    let sinks = shared.sinks.load();
    for dest in TransportId::ALL {
        // Loopback prevention.
        if dest == src {
            continue;
        }
        if !(config.merge_inputs || config.route(src, dest)) {
            continue;
        }

        let Some(sink) = sinks.get(dest.index()).and_then(|slot| slot.as_ref()) else {
            tracing::debug!(dest = dest.name(), "no tx sink registered");
            continue;
        };

        let payload = match adapt_payload(&config, &shared.stats, &packet.payload, dest) {
            Ok(Some(payload)) => payload,
            // Format mismatch with translation disabled: not deliverable.
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(
                    src = src.name(),
                    dest = dest.name(),
                    %err,
                    "translation failed"
                );
                shared.stats.bump_routing_error();
                continue;
            }
        };

        let out = RouterPacket {
            payload,
            ..*packet
        };
        match sink.send(&out) {
            Ok(()) => shared.stats.bump_routed(src, dest),
            Err(err) => {
                tracing::warn!(dest = dest.name(), %err, "tx failed");
                shared.stats.bump_dropped(dest);
            }
        }
    }
}

/// Fit a payload to the destination's protocol family. `Ok(None)` means the
/// packet cannot be delivered there (mismatch with translation off).
fn adapt_payload(
    config: &RouterConfig,
    stats: &RouterStats,
    payload: &Payload,
    dest: TransportId,
) -> ponte_core::Result<Option<Payload>> {
    if dest.preferred_format().accepts(payload.format()) {
        return Ok(Some(*payload));
    }
    if !config.auto_translate {
        return Ok(None);
    }

    let translator = Translator::new(TranslatorConfig {
        default_group: config.default_group,
        ..Default::default()
    })?;
    match payload {
        Payload::Midi1(packet) => {
            let burst = translator.to_ump(&packet.message())?;
            stats.bump_translation_1to2();
            // Non-SysEx MIDI 1.0 translates to exactly one UMP.
            Ok(burst.first().copied().map(Payload::Ump))
        }
        Payload::Ump(packet) => {
            let midi1 = translator.to_midi1(packet)?;
            stats.bump_translation_2to1();
            Ok(Some(Payload::Midi1(midi1)))
        }
    }
}
