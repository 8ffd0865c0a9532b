//! HTTP metrics demo
//!
//! Serves the demo routes and `/metrics`, and optionally generates traffic
//! against itself and a couple of upstreams.

use http_metrics::config::TransportOptions;
use http_metrics::transport::TransportLayer;
use http_metrics::MetricsRegistry;
use http_metrics_demo::config::Config;
use http_metrics_demo::jobs::JobMetrics;
use http_metrics_demo::observability::{init_tracing, register_build_info};
use http_metrics_demo::routes::{self, AppState};
use http_metrics_demo::traffic;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;
    init_tracing(config.log_format)?;

    info!(
        bind_address = %config.bind_address,
        metrics_track_host = config.metrics_track_host,
        metrics_track_protocol = config.metrics_track_protocol,
        transport_track_host = config.transport_track_host,
        simulate_traffic = config.simulate_traffic,
        "Configuration loaded successfully"
    );

    let registry = MetricsRegistry::new();
    register_build_info(&registry)?;

    let state = Arc::new(AppState {
        jobs: JobMetrics::register(&registry)?,
    });
    let app = routes::build_routes(state, &registry, routes::collector_options(&config))?;

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    let local_addr = listener.local_addr()?;
    info!("Demo service listening on {}", local_addr);

    let cancel_token = CancellationToken::new();
    let traffic_tasks = if config.simulate_traffic {
        let transport = TransportLayer::new(
            &registry,
            TransportOptions::new().track_host(config.transport_track_host),
        )?;
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                error!("Failed to build HTTP client: {}", e);
                e
            })?;
        traffic::spawn(
            transport.client(http_client),
            format!("http://127.0.0.1:{}", local_addr.port()),
            cancel_token.clone(),
        )
    } else {
        Vec::new()
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.drain_seconds, cancel_token.clone()))
        .await?;

    cancel_token.cancel();
    for task in traffic_tasks {
        if let Err(e) = task.await {
            warn!("Traffic task failed: {}", e);
        }
    }

    info!("Demo service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Stops background traffic, then returns when the drain period is complete.
async fn shutdown_signal(drain_secs: u64, cancel_token: CancellationToken) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    cancel_token.cancel();

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (DRAIN_SECONDS=0)");
    }
}
