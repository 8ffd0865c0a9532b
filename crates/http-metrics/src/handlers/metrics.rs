//! Prometheus scrape endpoint.
//!
//! The endpoint is unauthenticated. Label values carried by the built-in
//! families are route patterns, statuses and optionally hosts, never raw
//! request paths.

use crate::registry::{MetricsRegistry, TEXT_CONTENT_TYPE};
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

/// Handler for GET /metrics
///
/// Returns 200 OK with the text exposition format:
/// ```text
/// # HELP http_requests_total Total number of HTTP requests.
/// # TYPE http_requests_total counter
/// http_requests_total{client_aborted="false",endpoint="GET /items/:id",host="",protocol="",status="200"} 42
/// ```
///
/// An encoding failure is logged and answered with a generic 500.
#[tracing::instrument(skip_all, name = "http_metrics.scrape")]
pub async fn metrics_handler(State(registry): State<MetricsRegistry>) -> Response {
    match registry.render() {
        Ok(body) => ([(CONTENT_TYPE, TEXT_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(target: "http_metrics.handlers", error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred").into_response()
        }
    }
}

/// Router serving [`metrics_handler`] at `/metrics`.
pub fn metrics_router(registry: MetricsRegistry) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(registry)
}
