//! Error types for tilegate operations

use std::time::Duration;
use thiserror::Error;

/// Renderer-side failures: the subprocess could not run, ran too long, or
/// reported that it could not produce a tile.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Failed to render tile: {detail}")]
    ExecutionFailed { detail: String },

    #[error("Failed to render tile: renderer timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("cannot generate tile. {message}")]
    Rejected { message: String },

    #[error("cannot generate tile")]
    MessageParseFailed,

    #[error("Failed to render tile: malformed renderer response ({reason})")]
    MalformedResponse { reason: String },
}

/// Tile cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cannot read tile {key} from disk: {reason}")]
    Read { key: String, reason: String },

    #[error("cannot create tile file {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("cache root {path} is unusable: {reason}")]
    Root { path: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for the gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Query parameters cannot be empty")]
    EmptyQuery,

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
