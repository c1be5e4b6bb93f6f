//! Router statistics.
//!
//! Counters are per-slot relaxed atomics; exact cross-counter totals are not
//! guaranteed and not required. `packets_dropped` counts queue-full drops at
//! the source and TX failures at the destination, in the same table.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::packet::{TransportId, TRANSPORT_COUNT};

#[derive(Debug, Default)]
pub struct RouterStats {
    packets_routed: [[AtomicU32; TRANSPORT_COUNT]; TRANSPORT_COUNT],
    packets_dropped: [AtomicU32; TRANSPORT_COUNT],
    packets_filtered: [AtomicU32; TRANSPORT_COUNT],
    translations_1to2: AtomicU32,
    translations_2to1: AtomicU32,
    routing_errors: AtomicU32,
}

impl RouterStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn bump_routed(&self, src: TransportId, dst: TransportId) {
        self.packets_routed[src.index()][dst.index()].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn bump_dropped(&self, transport: TransportId) {
        self.packets_dropped[transport.index()].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn bump_filtered(&self, src: TransportId) {
        self.packets_filtered[src.index()].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn bump_translation_1to2(&self) {
        self.translations_1to2.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn bump_translation_2to1(&self) {
        self.translations_2to1.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn bump_routing_error(&self) {
        self.routing_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Plain-value copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let mut routed = [[0u32; TRANSPORT_COUNT]; TRANSPORT_COUNT];
        let mut dropped = [0u32; TRANSPORT_COUNT];
        let mut filtered = [0u32; TRANSPORT_COUNT];
        for s in 0..TRANSPORT_COUNT {
            for d in 0..TRANSPORT_COUNT {
                routed[s][d] = self.packets_routed[s][d].load(Ordering::Relaxed);
            }
            dropped[s] = self.packets_dropped[s].load(Ordering::Relaxed);
            filtered[s] = self.packets_filtered[s].load(Ordering::Relaxed);
        }
        StatsSnapshot {
            packets_routed: routed,
            packets_dropped: dropped,
            packets_filtered: filtered,
            translations_1to2: self.translations_1to2.load(Ordering::Relaxed),
            translations_2to1: self.translations_2to1.load(Ordering::Relaxed),
            routing_errors: self.routing_errors.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for row in &self.packets_routed {
            for counter in row {
                counter.store(0, Ordering::Relaxed);
            }
        }
        for counter in &self.packets_dropped {
            counter.store(0, Ordering::Relaxed);
        }
        for counter in &self.packets_filtered {
            counter.store(0, Ordering::Relaxed);
        }
        self.translations_1to2.store(0, Ordering::Relaxed);
        self.translations_2to1.store(0, Ordering::Relaxed);
        self.routing_errors.store(0, Ordering::Relaxed);
    }
}

/// Counter values at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub packets_routed: [[u32; TRANSPORT_COUNT]; TRANSPORT_COUNT],
    pub packets_dropped: [u32; TRANSPORT_COUNT],
    pub packets_filtered: [u32; TRANSPORT_COUNT],
    pub translations_1to2: u32,
    pub translations_2to1: u32,
    pub routing_errors: u32,
}

impl StatsSnapshot {
    #[inline]
    pub fn routed(&self, src: TransportId, dst: TransportId) -> u32 {
        self.packets_routed[src.index()][dst.index()]
    }

    #[inline]
    pub fn dropped(&self, transport: TransportId) -> u32 {
        self.packets_dropped[transport.index()]
    }

    #[inline]
    pub fn filtered(&self, src: TransportId) -> u32 {
        self.packets_filtered[src.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_and_snapshot() {
        let stats = RouterStats::new();
        stats.bump_routed(TransportId::Serial, TransportId::Usb);
        stats.bump_routed(TransportId::Serial, TransportId::Usb);
        stats.bump_dropped(TransportId::Wifi);
        stats.bump_filtered(TransportId::Ethernet);
        stats.bump_translation_1to2();
        stats.bump_routing_error();

        let snap = stats.snapshot();
        assert_eq!(snap.routed(TransportId::Serial, TransportId::Usb), 2);
        assert_eq!(snap.routed(TransportId::Usb, TransportId::Serial), 0);
        assert_eq!(snap.dropped(TransportId::Wifi), 1);
        assert_eq!(snap.filtered(TransportId::Ethernet), 1);
        assert_eq!(snap.translations_1to2, 1);
        assert_eq!(snap.translations_2to1, 0);
        assert_eq!(snap.routing_errors, 1);
    }

    #[test]
    fn test_reset() {
        let stats = RouterStats::new();
        stats.bump_routed(TransportId::Serial, TransportId::Usb);
        stats.bump_translation_2to1();
        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }
}
