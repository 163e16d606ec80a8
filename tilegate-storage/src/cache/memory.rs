//! In-process tile store.
//!
//! Same first-writer-wins contract as the disk store, without persistence.
//! Backs the gateway unit tests and the `tilegate-test-utils` crate.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use tilegate_core::{CacheError, CacheKey};
use tokio::sync::RwLock;

use super::traits::{StoreCounters, StoreOutcome, StoreStats, TileStore};

#[derive(Debug, Default)]
pub struct MemoryTileStore {
    entries: RwLock<HashMap<CacheKey, Vec<u8>>>,
    counters: StoreCounters,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry, bypassing the write counters.
    pub async fn insert(&self, key: CacheKey, bytes: Vec<u8>) {
        self.entries.write().await.insert(key, bytes);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl TileStore for MemoryTileStore {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let result = Ok(self.entries.read().await.get(key).cloned());
        self.counters.record_lookup(&result);
        result
    }

    async fn store(&self, key: &CacheKey, bytes: Vec<u8>) -> Result<StoreOutcome, CacheError> {
        let result = match self.entries.write().await.entry(key.clone()) {
            Entry::Occupied(_) => Ok(StoreOutcome::AlreadyPresent),
            Entry::Vacant(slot) => {
                slot.insert(bytes);
                Ok(StoreOutcome::Written)
            }
        };
        self.counters.record_store(&result);
        result
    }

    fn stats(&self) -> StoreStats {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilegate_core::RequestQuery;

    fn key(raw: &str) -> CacheKey {
        CacheKey::derive(&RequestQuery::new(raw).expect("non-empty query"))
    }

    #[tokio::test]
    async fn test_memory_store_contract() {
        let store = MemoryTileStore::new();
        let k = key("a=1");

        assert_eq!(store.lookup(&k).await, Ok(None));
        assert_eq!(store.store(&k, b"A".to_vec()).await, Ok(StoreOutcome::Written));
        assert_eq!(store.store(&k, b"B".to_vec()).await, Ok(StoreOutcome::AlreadyPresent));
        assert_eq!(store.lookup(&k).await, Ok(Some(b"A".to_vec())));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_seeded_entry_is_served() {
        let store = MemoryTileStore::new();
        let k = key("b=2");
        store.insert(k.clone(), vec![0xFF, 0xD8, 0xFF]).await;

        assert_eq!(store.lookup(&k).await, Ok(Some(vec![0xFF, 0xD8, 0xFF])));
        assert_eq!(store.stats().hits, 1);
        assert_eq!(store.stats().writes, 0);
    }
}
