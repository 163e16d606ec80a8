//! HTTP Routes
//!
//! - Tile endpoint at the configured base path (GET and HEAD)
//! - Health check endpoints under /health
//! - Prometheus metrics at /metrics
//! - CORS support for browser map clients

pub mod health;
pub mod tile;

use std::time::Duration;

use axum::{
    http::{header::HeaderName, HeaderValue, Method},
    middleware::from_fn,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::ApiConfig;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use health::create_router as health_router;
pub use tile::TILE_CACHE_HEADER;

/// Create the complete router.
///
/// # Middleware Order (outer to inner)
/// 1. CORS (outermost) - handles preflight requests
/// 2. Observability - tracing and metrics
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let mut router = Router::new();
    for path in config.tile_paths() {
        router = router.route(&path, get(tile::get_tile));
    }

    let router = router
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    tracing::info!(
        base_path = %config.base_path,
        "Tile endpoint mounted"
    );

    router
        .layer(from_fn(observability_middleware))
        .layer(build_cors_layer(config))
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// A `*` entry allows any origin; otherwise only the configured origins are
/// allowed.
pub fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers([HeaderName::from_static("x-requested-with")])
        .expose_headers([TILE_CACHE_HEADER])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.allows_any_origin() {
        tracing::info!("CORS: allowing all origins");
        return cors.allow_origin(Any);
    }

    tracing::info!("CORS: allowing origins: {:?}", config.cors_origins);
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}
