//! HTTP handlers.

pub mod metrics;

pub use metrics::{metrics_handler, metrics_router};
