//! Demo service integration tests.
//!
//! Serves the real router with the `TestServer` harness and scrapes it.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use http_metrics::MetricsRegistry;
use http_metrics_demo::config::Config;
use http_metrics_demo::jobs::JobMetrics;
use http_metrics_demo::observability::register_build_info;
use http_metrics_demo::routes::{build_routes, collector_options, AppState};
use http_metrics_test_utils::TestServer;
use std::collections::HashMap;
use std::sync::Arc;

async fn spawn() -> Result<TestServer, anyhow::Error> {
    let registry = MetricsRegistry::new();
    register_build_info(&registry)?;
    let state = Arc::new(AppState {
        jobs: JobMetrics::register(&registry)?,
    });
    let config = Config::from_vars(&HashMap::new())?;
    let app = build_routes(state, &registry, collector_options(&config))?;
    TestServer::spawn(app).await
}

/// Heartbeat answers without being counted.
#[tokio::test]
async fn test_ping() -> Result<(), anyhow::Error> {
    let server = spawn().await?;

    let response = reqwest::get(server.url_for("/ping")).await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, ".");

    let body = server.scrape().await?;
    assert!(!body.contains("endpoint=\"GET /ping\""));

    Ok(())
}

/// A scrape after traffic shows request, job and build families.
#[tokio::test]
async fn test_scrape_after_traffic() -> Result<(), anyhow::Error> {
    let server = spawn().await?;

    reqwest::get(server.url_for("/fast")).await?;
    reqwest::get(server.url_for("/not-found")).await?;

    let body = server.scrape().await?;
    assert!(body.contains("# TYPE http_requests_total counter"));
    assert!(body.contains("# TYPE http_request_duration_seconds histogram"));
    assert!(body.contains("# TYPE http_requests_inflight gauge"));
    assert!(body.contains("endpoint=\"GET /fast\""));
    assert!(body.contains("endpoint=\"<no-match>\""));
    assert!(body.contains("protocol=\"HTTP/1.1\""));
    assert!(body.contains("jobs_processed_total{name=\"job\""));
    assert!(body.contains("build_info{"));
    assert!(!body.contains("endpoint=\"GET /metrics\""));

    Ok(())
}
