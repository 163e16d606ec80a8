//! Tile store trait and shared bookkeeping types.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tilegate_core::{CacheError, CacheKey};

/// What a [`TileStore::store`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOutcome {
    /// The bytes were persisted under the key.
    Written,
    /// An entry already existed; the new bytes were discarded.
    AlreadyPresent,
}

/// Key/value persistence for rendered tiles.
///
/// Entries are immutable once written: `store` is first-writer-wins and a
/// present entry is always served as-is. There is no update, delete or
/// enumeration.
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Read the bytes stored under `key`.
    ///
    /// `Ok(None)` is a definitive miss. Any other failure reading an entry
    /// that exists is an error.
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    /// Persist `bytes` under `key` unless an entry already exists.
    ///
    /// Must be safe to call concurrently for the same key: exactly one
    /// caller observes [`StoreOutcome::Written`].
    async fn store(&self, key: &CacheKey, bytes: Vec<u8>) -> Result<StoreOutcome, CacheError>;

    /// Verify the store is usable (used by readiness checks).
    async fn check(&self) -> Result<(), CacheError> {
        Ok(())
    }

    /// Snapshot of usage counters.
    fn stats(&self) -> StoreStats;
}

/// Statistics about store usage since startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub skipped_writes: u64,
    pub errors: u64,
}

impl StoreStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Lock-free counters backing [`StoreStats`].
#[derive(Debug, Default)]
pub(crate) struct StoreCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    skipped_writes: AtomicU64,
    errors: AtomicU64,
}

impl StoreCounters {
    pub(crate) fn record_lookup<T>(&self, result: &Result<Option<T>, CacheError>) {
        let counter = match result {
            Ok(Some(_)) => &self.hits,
            Ok(None) => &self.misses,
            Err(_) => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store(&self, result: &Result<StoreOutcome, CacheError>) {
        let counter = match result {
            Ok(StoreOutcome::Written) => &self.writes,
            Ok(StoreOutcome::AlreadyPresent) => &self.skipped_writes,
            Err(_) => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StoreStats {
        StoreStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            skipped_writes: self.skipped_writes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}
