//! Tilegate Telemetry - Observability Infrastructure
//!
//! Provides tracing initialization, request instrumentation and Prometheus
//! metrics for the gateway.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics, metrics_handler, TilegateMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracing, LogFormat, TelemetryConfig};
