//! Background traffic simulation.
//!
//! Drives the dashboards without external load: periodic calls to an
//! upstream, to a host that never resolves, and a random mix of requests
//! against this service with random client-side deadlines so some of them
//! are abandoned mid-flight. All calls go through the instrumented client.
//!
//! # Graceful Shutdown
//!
//! Every loop exits when the cancellation token is triggered.

use http_metrics::transport::InstrumentedClient;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Reachable upstream polled every [`UPSTREAM_PERIOD`].
pub const UPSTREAM_URL: &str = "http://example.com";
pub const UPSTREAM_PERIOD: Duration = Duration::from_millis(500);

/// Host under the reserved `.invalid` TLD, polled every [`UNRESOLVABLE_PERIOD`].
pub const UNRESOLVABLE_URL: &str = "http://cant-resolve-this-thing.invalid";
pub const UNRESOLVABLE_PERIOD: Duration = Duration::from_millis(1500);

/// Paths of this service hit by the inbound loop.
pub const INBOUND_PATHS: [&str; 5] = ["/fast", "/slow", "/error", "/timeout", "/not-found"];

/// Start all simulation loops.
///
/// `base_url` is the address this service listens on, e.g. `http://127.0.0.1:8022`.
pub fn spawn(
    client: InstrumentedClient,
    base_url: String,
    cancel_token: CancellationToken,
) -> Vec<JoinHandle<()>> {
    info!(target: "http_metrics_demo.traffic", base_url = %base_url, "Starting traffic simulation");

    vec![
        tokio::spawn(poll(
            client.clone(),
            UPSTREAM_URL.to_string(),
            UPSTREAM_PERIOD,
            cancel_token.clone(),
        )),
        tokio::spawn(poll(
            client.clone(),
            UNRESOLVABLE_URL.to_string(),
            UNRESOLVABLE_PERIOD,
            cancel_token.clone(),
        )),
        tokio::spawn(hit_endpoints(client, base_url, cancel_token)),
    ]
}

/// GET `url` every `period` until cancelled.
pub async fn poll(
    client: InstrumentedClient,
    url: String,
    period: Duration,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            result = client.get(&url) => log_outcome(&url, result),
            _ = cancel_token.cancelled() => break,
        }
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = cancel_token.cancelled() => break,
        }
    }
    debug!(target: "http_metrics_demo.traffic", url = %url, "Poll loop stopped");
}

/// Hit random paths of `base_url`, giving each call a random 1-8s deadline.
pub async fn hit_endpoints(
    client: InstrumentedClient,
    base_url: String,
    cancel_token: CancellationToken,
) {
    loop {
        let (path, deadline, pause) = {
            let mut rng = rand::thread_rng();
            (
                INBOUND_PATHS.choose(&mut rng).copied().unwrap_or("/fast"),
                Duration::from_millis(rng.gen_range(1_000..8_000)),
                Duration::from_millis(rng.gen_range(1..=100)),
            )
        };
        let url = format!("{base_url}{path}");

        tokio::select! {
            result = tokio::time::timeout(deadline, client.get(&url)) => match result {
                Ok(result) => log_outcome(&url, result),
                Err(_) => debug!(target: "http_metrics_demo.traffic", url = %url, "Client gave up"),
            },
            _ = cancel_token.cancelled() => break,
        }
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = cancel_token.cancelled() => break,
        }
    }
    debug!(target: "http_metrics_demo.traffic", "Endpoint loop stopped");
}

fn log_outcome(url: &str, result: Result<reqwest::Response, reqwest::Error>) {
    match result {
        Ok(response) => {
            debug!(target: "http_metrics_demo.traffic", url, status = response.status().as_u16(), "Call completed");
        }
        Err(e) => {
            debug!(target: "http_metrics_demo.traffic", url, error = %e, "Call failed");
        }
    }
}
