//! Tilegate Core - Shared Types
//!
//! Request queries, cache keys, rendered tile types and the error taxonomy
//! used by every other tilegate crate. No I/O happens here.

pub mod error;
pub mod key;
pub mod query;
pub mod tile;

pub use error::{CacheError, ConfigError, GatewayError, GatewayResult, RenderError};
pub use key::{CacheKey, KeyDigest};
pub use query::RequestQuery;
pub use tile::{ImageSubtype, ParsedTile};
