//! Tilegate Server Entry Point
//!
//! Loads configuration (optionally from an env file named by the first
//! argument), opens the tile cache and starts the Axum HTTP server.

use std::path::PathBuf;
use std::sync::Arc;

use tilegate_api::telemetry::{init_tracing, TelemetryConfig};
use tilegate_api::{
    create_router, ApiConfig, ApiError, ApiResult, AppState, EnvSource, GatewayConfig,
    TileGateway,
};
use tilegate_storage::DiskTileStore;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let env_file = std::env::args_os().nth(1).map(PathBuf::from);
    let (env, env_file_error) = match &env_file {
        Some(path) => match EnvSource::process().with_env_file(path) {
            Ok(env) => (env, None),
            Err(e) => (EnvSource::process(), Some(e)),
        },
        None => (EnvSource::process(), None),
    };

    init_tracing(&TelemetryConfig::from_source(&env))?;

    if let (Some(path), Some(e)) = (&env_file, env_file_error) {
        tracing::warn!(path = %path.display(), error = %e, "Could not read env file, using process environment only");
    }

    let gateway_config = GatewayConfig::from_source(&env)?;
    let api_config = ApiConfig::from_source(&env);

    let store = DiskTileStore::open(&gateway_config.cache_dir).await?;
    tracing::info!(
        cache_dir = %gateway_config.cache_dir.display(),
        renderer = %gateway_config.renderer_path.display(),
        parser = ?gateway_config.parser,
        key_digest = ?gateway_config.key_digest,
        render_timeout_secs = gateway_config.render_timeout.map(|t| t.as_secs()),
        "Gateway configured"
    );

    let gateway = TileGateway::from_config(&gateway_config, Arc::new(store));
    let app = create_router(AppState::new(gateway), &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting tilegate server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
