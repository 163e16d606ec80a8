//! Prometheus Metrics Definitions
//!
//! Defines all tilegate metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_histogram_vec, CounterVec, Encoder,
    Histogram, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Renderer latency buckets (seconds); renders are slower than requests that hit the cache.
const RENDER_LATENCY_BUCKETS: &[f64] = &[0.010, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<TilegateMetrics>> = Lazy::new(TilegateMetrics::new);

/// The global metrics, if they registered successfully.
pub fn metrics() -> Option<&'static TilegateMetrics> {
    METRICS.as_ref().ok()
}

/// Container for all tilegate metrics.
#[derive(Clone)]
pub struct TilegateMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Cache lookup counter - labels: result (hit/miss/error)
    pub cache_lookups_total: CounterVec,

    /// Cache store counter - labels: result (written/present/error)
    pub cache_stores_total: CounterVec,

    /// Renderer invocation counter - labels: outcome (ok/failed/rejected/timeout)
    pub renders_total: CounterVec,

    /// Renderer invocation duration, including output parsing
    pub render_duration_seconds: Histogram,
}

impl TilegateMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "tilegate_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "tilegate_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_request_duration_seconds: {}", e)))?,

            cache_lookups_total: register_counter_vec!(
                "tilegate_cache_lookups_total",
                "Total tile cache lookups",
                &["result"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_lookups_total: {}", e)))?,

            cache_stores_total: register_counter_vec!(
                "tilegate_cache_stores_total",
                "Total tile cache writes",
                &["result"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_stores_total: {}", e)))?,

            renders_total: register_counter_vec!(
                "tilegate_renders_total",
                "Total renderer invocations",
                &["outcome"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register renders_total: {}", e)))?,

            render_duration_seconds: register_histogram!(
                "tilegate_render_duration_seconds",
                "Renderer invocation duration in seconds",
                RENDER_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register render_duration_seconds: {}", e)))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status_str.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record a cache lookup (`hit`, `miss` or `error`).
    pub fn record_cache_lookup(&self, result: &str) {
        self.cache_lookups_total.with_label_values(&[result]).inc();
    }

    /// Record a cache write (`written`, `present` or `error`).
    pub fn record_cache_store(&self, result: &str) {
        self.cache_stores_total.with_label_values(&[result]).inc();
    }

    /// Record a renderer invocation.
    pub fn record_render(&self, outcome: &str, duration_secs: f64) {
        self.renders_total.with_label_values(&[outcome]).inc();
        self.render_duration_seconds.observe(duration_secs);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        // Force initialization
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        assert!(!metrics.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_http_request() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        metrics.record_http_request("GET", "/", 200, 0.015);
        Ok(())
    }

    #[test]
    fn test_record_cache_and_render() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        let before = metrics.cache_lookups_total.with_label_values(&["hit"]).get();
        metrics.record_cache_lookup("hit");
        assert!(metrics.cache_lookups_total.with_label_values(&["hit"]).get() >= before + 1.0);

        metrics.record_cache_store("written");
        metrics.record_render("rejected", 0.2);
        assert!(metrics.renders_total.with_label_values(&["rejected"]).get() >= 1.0);
        Ok(())
    }
}
