//! HTTP metrics demo service library
//!
//! An example service showing the `http_metrics` crate end to end:
//!
//! - Inbound request metrics on every route except `/ping` and `/metrics`
//! - A business counter (`jobs_processed_total`) with a typed label schema
//! - A `build_info` info metric
//! - Outbound call metrics from a simulated traffic generator, including
//!   calls to an unresolvable host and calls abandoned by their client
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `handlers` - HTTP request handlers
//! - `jobs` - Simulated work and its counter
//! - `middleware` - Per-route request deadline
//! - `observability` - Logging setup and build info
//! - `routes` - Axum router setup
//! - `traffic` - Background traffic simulation

pub mod config;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod traffic;
