//! Tilegate API - HTTP Tile Gateway
//!
//! Serves map tiles over HTTP. Each request's query string is handed to an
//! external CGI renderer; rendered tiles are returned to the client and
//! written to a content-addressed disk cache so repeated requests are served
//! without rendering again.

pub mod config;
pub mod error;
pub mod gateway;
pub mod macros;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ApiConfig, EnvSource, GatewayConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use gateway::{ServedTile, TileGateway, TileSource};
pub use routes::{build_cors_layer, create_router};
pub use state::AppState;
