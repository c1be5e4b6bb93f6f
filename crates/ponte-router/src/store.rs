//! Configuration persistence.
//!
//! The router depends only on byte-array get/put; the blob layout (bincode)
//! is opaque to the store.

use parking_lot::Mutex;

use crate::config::RouterConfig;
use crate::error::{Error, Result};

/// Persistent key-value seam for the configuration blob.
pub trait ConfigStore: Send + Sync {
    fn save(&self, bytes: &[u8]) -> Result<()>;
    fn load(&self) -> Result<Option<Vec<u8>>>;
}

pub(crate) fn encode_config(config: &RouterConfig) -> Result<Vec<u8>> {
    bincode::serialize(config).map_err(|err| Error::Io(err.to_string()))
}

pub(crate) fn decode_config(bytes: &[u8]) -> Result<RouterConfig> {
    let config: RouterConfig =
        bincode::deserialize(bytes).map_err(|err| Error::Io(err.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// In-memory store, for tests and store-less deployments.
#[derive(Default)]
pub struct MemoryStore {
    blob: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn save(&self, bytes: &[u8]) -> Result<()> {
        *self.blob.lock() = Some(bytes.to_vec());
        Ok(())
    }

    fn load(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.blob.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::TransportId;

    #[test]
    fn test_config_blob_roundtrip() {
        let mut config = RouterConfig::default();
        config.set_route(TransportId::Serial, TransportId::Usb, false);
        config.merge_inputs = true;
        config.default_group = 7;

        let bytes = encode_config(&config).unwrap();
        let back = decode_config(&bytes).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_config(&[0xFF; 3]).is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save(&[1, 2, 3]).unwrap();
        assert_eq!(store.load().unwrap(), Some(vec![1, 2, 3]));
    }
}
