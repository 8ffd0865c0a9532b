//! HTTP metrics library
//!
//! Prometheus instrumentation for HTTP services built on axum, tower and
//! reqwest:
//!
//! - Typed label schemas: a struct declared with [`label_schema!`] is the
//!   only way to supply label values to a metric family
//! - Counter, gauge, histogram and info factories bound to an explicit
//!   [`MetricsRegistry`]
//! - An inbound collector layer recording request count, latency and
//!   in-flight requests per route pattern, status and client abort
//! - An outbound transport layer recording the same for client calls,
//!   classifying failures as `timeout`, `canceled` or `error`
//! - A `/metrics` handler serving the text exposition format
//!
//! # Example
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use http_metrics::config::CollectorOptions;
//! use http_metrics::handlers::metrics_router;
//! use http_metrics::middleware::CollectorLayer;
//! use http_metrics::MetricsRegistry;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let registry = MetricsRegistry::new();
//! let collector = CollectorLayer::new(&registry, CollectorOptions::default())?;
//!
//! let app = Router::new()
//!     .route("/items/:id", get(|| async { "item" }))
//!     .layer(collector)
//!     .merge(metrics_router(registry));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8022").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - `config` - Collector and transport options
//! - `errors` - Error type
//! - `handlers` - Scrape endpoint
//! - `labels` - Label schemas
//! - `metrics` - Metric factories
//! - `middleware` - Inbound collector
//! - `registry` - Metric registry and exposition
//! - `transport` - Outbound instrumentation

pub mod config;
pub mod errors;
pub mod handlers;
pub mod labels;
pub mod metrics;
pub mod middleware;
pub mod registry;
pub mod transport;

pub use errors::{MetricsError, Result};
pub use labels::{LabelSchema, NoLabels};
pub use registry::MetricsRegistry;
