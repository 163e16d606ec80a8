//! Tile cache stores.
//!
//! A cache entry is named by the [`CacheKey`](tilegate_core::CacheKey) of the
//! query that produced it and holds the final, protocol-stripped image bytes.
//! Entries never expire and are never rewritten: if an entry exists it is
//! served as-is.
//!
//! # Concurrency
//!
//! Concurrent misses for the same key may each render and each call
//! [`TileStore::store`]. Stores are first-writer-wins, so at most one version
//! of a key's bytes is ever persisted and later writers are no-ops.

pub mod disk;
pub mod memory;
pub mod traits;

pub use disk::DiskTileStore;
pub use memory::MemoryTileStore;
pub use traits::{StoreOutcome, StoreStats, TileStore};
