//! HTTP request handlers.
//!
//! Each route produces a distinct shape of traffic on the dashboards:
//! quick successes, long requests that clients often abandon, random
//! failures and deadline expiries.

use crate::jobs::JobMetrics;
use crate::routes::AppState;
use axum::{extract::State, http::StatusCode};
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;

/// Simulated work of `/fast`.
pub const FAST_WORK: Duration = Duration::from_millis(100);

/// Duration of `/slow`.
pub const SLOW_WORK: Duration = Duration::from_secs(5);

/// Statuses returned by `/error`.
pub const ERROR_STATUSES: [StatusCode; 5] = [
    StatusCode::BAD_REQUEST,
    StatusCode::UNAUTHORIZED,
    StatusCode::FORBIDDEN,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::SERVICE_UNAVAILABLE,
];

/// Handler for GET /ping
pub async fn ping() -> &'static str {
    "."
}

/// Handler for GET /fast
#[tracing::instrument(skip_all, name = "demo.fast")]
pub async fn fast(State(state): State<Arc<AppState>>) -> &'static str {
    run_job(&state.jobs).await;
    "This was a fast operation!\n"
}

/// Handler for GET /slow, also served behind the deadline at /timeout.
pub async fn slow() -> &'static str {
    tokio::time::sleep(SLOW_WORK).await;
    "This was a slow operation!\n"
}

/// Handler for GET /error
pub async fn error() -> (StatusCode, &'static str) {
    let status = ERROR_STATUSES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, "Bad request error!\n")
}

async fn run_job(jobs: &JobMetrics) {
    jobs.do_work("job", FAST_WORK).await;
}
