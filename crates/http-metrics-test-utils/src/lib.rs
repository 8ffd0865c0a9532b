//! # HTTP Metrics Test Utilities
//!
//! Shared test utilities for the `http-metrics` crates.
//!
//! This crate provides:
//! - Metric snapshots (`MetricSnapshot` for asserting on gathered families)
//! - Server test harness (`TestServer` for end-to-end tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use http_metrics_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let registry = MetricsRegistry::new();
//!     let server = TestServer::spawn(app(&registry)).await?;
//!
//!     reqwest::get(server.url_for("/items/1")).await?;
//!
//!     let snapshot = MetricSnapshot::take(&registry);
//!     assert_eq!(snapshot.counter("http_requests_total", &[("status", "200")]), 1.0);
//!     Ok(())
//! }
//! ```

pub mod server_harness;
pub mod snapshot;

// Re-export commonly used items
pub use server_harness::*;
pub use snapshot::*;
