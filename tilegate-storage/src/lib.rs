//! Tilegate Storage - Tile Cache Stores
//!
//! Defines the [`TileStore`] abstraction used by the gateway and its disk
//! and in-memory implementations.

pub mod cache;

pub use cache::{DiskTileStore, MemoryTileStore, StoreOutcome, StoreStats, TileStore};
