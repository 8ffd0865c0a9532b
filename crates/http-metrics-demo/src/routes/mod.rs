//! HTTP routes for the demo service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::jobs::JobMetrics;
use crate::middleware::deadline_middleware;
use axum::{middleware, routing::get, Router};
use http_metrics::config::{skip_options_and, CollectorOptions};
use http_metrics::handlers::metrics_router;
use http_metrics::middleware::CollectorLayer;
use http_metrics::MetricsRegistry;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Paths excluded from request metrics.
pub const UNINSTRUMENTED_PATHS: [&str; 2] = ["/metrics", "/ping"];

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Business metrics updated by handlers.
    pub jobs: JobMetrics,
}

/// Collector options derived from the service configuration.
pub fn collector_options(config: &Config) -> CollectorOptions {
    CollectorOptions::new()
        .track_host(config.metrics_track_host)
        .track_protocol(config.metrics_track_protocol)
        .skip(skip_options_and(&UNINSTRUMENTED_PATHS))
}

/// Server-side limit on handling a request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/ping` - Heartbeat, not instrumented
/// - `/fast`, `/slow`, `/error` - Simulated workloads
/// - `/timeout` - `/slow` behind a 1 second deadline
/// - `/metrics` - Prometheus scrape endpoint, not instrumented
/// - 30 second request timeout
/// - HTTP metrics collector
/// - TraceLayer for request logging
///
/// # Errors
///
/// Fails if the collector families are already registered in `registry`.
pub fn build_routes(
    state: Arc<AppState>,
    registry: &MetricsRegistry,
    options: CollectorOptions,
) -> http_metrics::Result<Router> {
    build_routes_with_timeout(state, registry, options, REQUEST_TIMEOUT)
}

pub(crate) fn build_routes_with_timeout(
    state: Arc<AppState>,
    registry: &MetricsRegistry,
    options: CollectorOptions,
    request_timeout: Duration,
) -> http_metrics::Result<Router> {
    let collector = CollectorLayer::new(registry, options)?;

    let app_routes = Router::new()
        .route("/ping", get(handlers::ping))
        .route("/fast", get(handlers::fast))
        .route("/slow", get(handlers::slow))
        .route("/error", get(handlers::error))
        .route(
            "/timeout",
            get(handlers::slow).layer(middleware::from_fn(deadline_middleware)),
        )
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request with 408 (innermost)
    // 2. CollectorLayer - Record request metrics per matched route
    // 3. TraceLayer - Log request details (outermost)
    Ok(app_routes
        .merge(metrics_router(registry.clone()))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(collector)
        .layer(TraceLayer::new_for_http()))
}
