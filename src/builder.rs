//! MidiBridgeBuilder for configuring the bridge.

use std::sync::Arc;

use ponte_core::{TranslationMode, TranslatorConfig};
use ponte_router::{ConfigStore, RouterConfig};

use crate::{MidiBridge, Result};

/// Builder for [`MidiBridge`].
///
/// # Example
///
/// ```ignore
/// use ponte::MidiBridge;
///
/// let bridge = MidiBridge::builder()
///     .default_group(2)
///     .sysex_capacity(512)
///     .build()?;
/// ```
pub struct MidiBridgeBuilder {
    config: Option<RouterConfig>,
    store: Option<Arc<dyn ConfigStore>>,
    translator: TranslatorConfig,
    sysex_capacity: usize,
    drain_budget: Option<usize>,
}

impl Default for MidiBridgeBuilder {
    fn default() -> Self {
        Self {
            config: None,
            store: None,
            translator: TranslatorConfig::default(),
            sysex_capacity: 256,
            drain_budget: None,
        }
    }
}

impl MidiBridgeBuilder {
    /// Start from an explicit router configuration instead of the store
    /// blob or defaults.
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Attach a persistence store; the configuration is loaded from it at
    /// startup (unless `config` was given) and saved at shutdown.
    pub fn store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Translation mode (default: `Default`).
    pub fn translation_mode(mut self, mode: TranslationMode) -> Self {
        self.translator.mode = mode;
        self
    }

    /// UMP group stamped on ingress-translated packets (0-15).
    pub fn default_group(mut self, group: u8) -> Self {
        self.translator.default_group = group;
        self
    }

    /// SysEx capture buffer size per input parser; 0 disables capture.
    pub fn sysex_capacity(mut self, capacity: usize) -> Self {
        self.sysex_capacity = capacity;
        self
    }

    /// In-flight packets the dispatcher may still process at shutdown.
    pub fn drain_budget(mut self, budget: usize) -> Self {
        self.drain_budget = Some(budget);
        self
    }

    pub fn build(self) -> Result<MidiBridge> {
        MidiBridge::from_parts(
            self.config,
            self.store,
            self.translator,
            self.sysex_capacity,
            self.drain_budget,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let bridge = MidiBridgeBuilder::default().build().unwrap();
        assert_eq!(bridge.router().config(), RouterConfig::default());
        bridge.shutdown().unwrap();
    }

    #[test]
    fn test_builder_rejects_bad_group() {
        assert!(MidiBridgeBuilder::default().default_group(16).build().is_err());
    }

    #[test]
    fn test_builder_with_store() {
        let store = Arc::new(ponte_router::MemoryStore::new());
        let bridge = MidiBridgeBuilder::default()
            .store(store.clone())
            .build()
            .unwrap();
        bridge.router().set_merge_mode(true);
        bridge.shutdown().unwrap();

        // A new bridge over the same store sees the persisted config.
        let bridge = MidiBridgeBuilder::default().store(store).build().unwrap();
        assert!(bridge.router().config().merge_inputs);
        bridge.shutdown().unwrap();
    }
}
