//! Inbound HTTP middleware.
//!
//! # Components
//!
//! - `collector` - request counter, duration histogram and in-flight gauge
//! - `status` - final status and cancellation capabilities shared through
//!   request extensions

pub mod collector;
pub mod status;

pub use collector::{
    Collector, CollectorLayer, CollectorMetrics, InflightLabels, RequestLabels, NO_MATCH,
    WEBSOCKET_SUFFIX,
};
pub use status::{RequestCancellation, ResponseStatus};
