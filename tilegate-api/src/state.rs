//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use crate::gateway::TileGateway;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<TileGateway>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(gateway: TileGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<TileGateway>, gateway);
crate::impl_from_ref!(Instant, start_time);
