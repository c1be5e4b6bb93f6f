//! Router configuration: routing matrix, per-source filters, global flags.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::packet::{Payload, TransportId, TRANSPORT_COUNT};

/// Per-source input filter. A disabled filter passes everything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFilter {
    pub enabled: bool,
    /// One bit per channel; a clear bit blocks that channel.
    pub channel_mask: u16,
    /// Drop Active Sensing (0xFE).
    pub block_active_sensing: bool,
    /// Drop Timing Clock (0xF8).
    pub block_clock: bool,
}

impl Default for InputFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            channel_mask: 0xFFFF,
            block_active_sensing: false,
            block_clock: false,
        }
    }
}

impl InputFilter {
    /// Whether a payload passes this filter. Channel-bearing messages are
    /// checked against the channel mask; the block flags match on status.
    pub fn passes(&self, payload: &Payload) -> bool {
        if !self.enabled {
            return true;
        }
        if let Some(channel) = payload.channel() {
            if self.channel_mask & (1 << channel) == 0 {
                return false;
            }
        }
        if let Some(status) = payload.status() {
            if self.block_active_sensing && status == 0xFE {
                return false;
            }
            if self.block_clock && status == 0xF8 {
                return false;
            }
        }
        true
    }
}

/// Complete router configuration. Persisted as an opaque blob through a
/// [`ConfigStore`](crate::store::ConfigStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// `routes[src][dst]`: a packet from `src` may be delivered to `dst`.
    pub routes: [[bool; TRANSPORT_COUNT]; TRANSPORT_COUNT],
    pub filters: [InputFilter; TRANSPORT_COUNT],
    /// Translate between protocol families when the destination requires it.
    pub auto_translate: bool,
    /// Deliver every input to every non-source output, overriding the matrix.
    pub merge_inputs: bool,
    /// UMP group stamped on translated packets (0-15).
    pub default_group: u8,
}

impl Default for RouterConfig {
    /// Factory defaults: every off-diagonal route enabled, no filtering,
    /// auto-translation on.
    fn default() -> Self {
        let mut routes = [[true; TRANSPORT_COUNT]; TRANSPORT_COUNT];
        for (i, row) in routes.iter_mut().enumerate() {
            row[i] = false;
        }
        Self {
            routes,
            filters: [InputFilter::default(); TRANSPORT_COUNT],
            auto_translate: true,
            merge_inputs: false,
            default_group: 0,
        }
    }
}

impl RouterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_group > 15 {
            return Err(Error::InvalidArgument("default group out of range"));
        }
        Ok(())
    }

    #[inline]
    pub fn route(&self, src: TransportId, dst: TransportId) -> bool {
        self.routes[src.index()][dst.index()]
    }

    pub fn set_route(&mut self, src: TransportId, dst: TransportId, enabled: bool) {
        self.routes[src.index()][dst.index()] = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ponte_core::Midi1Packet;

    fn note_on(channel: u8) -> Payload {
        Payload::Midi1(Midi1Packet::new(0x90 | channel, [60, 100], 3))
    }

    #[test]
    fn test_disabled_filter_passes_everything() {
        let filter = InputFilter {
            enabled: false,
            channel_mask: 0,
            block_active_sensing: true,
            block_clock: true,
        };
        assert!(filter.passes(&note_on(0)));
        assert!(filter.passes(&Payload::Midi1(Midi1Packet::new(0xF8, [0, 0], 1))));
    }

    #[test]
    fn test_channel_mask() {
        let filter = InputFilter {
            enabled: true,
            channel_mask: 0b0000_0000_0000_0101, // channels 0 and 2
            ..Default::default()
        };
        assert!(filter.passes(&note_on(0)));
        assert!(!filter.passes(&note_on(1)));
        assert!(filter.passes(&note_on(2)));
        assert!(!filter.passes(&note_on(15)));
        // Non-channel messages are unaffected by the mask.
        assert!(filter.passes(&Payload::Midi1(Midi1Packet::new(0xF8, [0, 0], 1))));
    }

    #[test]
    fn test_block_flags() {
        let filter = InputFilter {
            enabled: true,
            block_active_sensing: true,
            block_clock: true,
            ..Default::default()
        };
        assert!(!filter.passes(&Payload::Midi1(Midi1Packet::new(0xFE, [0, 0], 1))));
        assert!(!filter.passes(&Payload::Midi1(Midi1Packet::new(0xF8, [0, 0], 1))));
        // Other real-time messages still pass.
        assert!(filter.passes(&Payload::Midi1(Midi1Packet::new(0xFA, [0, 0], 1))));
        // UMP System clock is matched too.
        let ump_clock = Payload::Ump(ponte_core::ump::system_packet(0, 0xF8, 0, 0).unwrap());
        assert!(!filter.passes(&ump_clock));
    }

    #[test]
    fn test_filter_ump_channel() {
        let filter = InputFilter {
            enabled: true,
            channel_mask: 1 << 5,
            ..Default::default()
        };
        let on5 = Payload::Ump(ponte_core::ump::midi2::note_on(0, 5, 60, 100, 0, 0).unwrap());
        let on6 = Payload::Ump(ponte_core::ump::midi2::note_on(0, 6, 60, 100, 0, 0).unwrap());
        assert!(filter.passes(&on5));
        assert!(!filter.passes(&on6));
    }

    #[test]
    fn test_default_config() {
        let config = RouterConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.auto_translate);
        assert!(!config.merge_inputs);
        for src in TransportId::ALL {
            for dst in TransportId::ALL {
                assert_eq!(config.route(src, dst), src != dst);
            }
        }
    }

    #[test]
    fn test_validate_group() {
        let config = RouterConfig {
            default_group: 16,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
