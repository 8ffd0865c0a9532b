//! Error types for metric registration and exposition.
//!
//! Every variant except `Encode` and `HttpClient` describes a wiring
//! mistake made while declaring metrics: a bad metric name, a bad label
//! schema, bad histogram buckets or a name collision. These surface from the factory calls at
//! startup so the service can refuse to boot instead of publishing a
//! misconfigured metric.

use thiserror::Error;

/// Errors raised while declaring, registering or exporting metrics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    /// Metric name does not match `^[a-z_][a-z0-9_]*$`.
    #[error("invalid metric name {0:?}: must match [a-z_][a-z0-9_]*")]
    InvalidMetricName(String),

    /// A declared label name does not match `^[a-z_][a-z0-9_]*$`.
    #[error("invalid label name {label:?} in {schema} {{ {field} }}: must match [a-z_][a-z0-9_]*")]
    InvalidLabelName {
        schema: &'static str,
        field: &'static str,
        label: String,
    },

    /// A declared label name is empty.
    #[error("missing label name in {schema} {{ {field} }}")]
    EmptyLabelName {
        schema: &'static str,
        field: &'static str,
    },

    /// Label names starting with `__` are reserved by the exposition format.
    #[error("reserved label name {label:?} in {schema} {{ {field} }}")]
    ReservedLabelName {
        schema: &'static str,
        field: &'static str,
        label: String,
    },

    /// Two fields of one schema resolve to the same label name.
    #[error("duplicate label name {label:?} in {schema}")]
    DuplicateLabelName { schema: &'static str, label: String },

    /// A schema instance produced a different number of values than it declares fields.
    #[error("label schema {schema} declares {expected} labels but produced {actual} values")]
    LabelCountMismatch {
        schema: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Histogram bucket bounds are empty, non-finite or not strictly ascending.
    #[error("invalid buckets for histogram {metric:?}: {reason}")]
    InvalidBuckets { metric: String, reason: String },

    /// Counters only move forward.
    #[error("counter delta must be a finite value >= 0, got {0}")]
    NegativeCounterDelta(f64),

    /// A metric family with this name is already registered.
    #[error("metric {0:?} is already registered")]
    AlreadyRegistered(String),

    /// The underlying registry rejected the metric family.
    #[error("registry error: {0}")]
    Registry(String),

    /// The default outbound HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    HttpClient(String),

    /// Encoding the exposition text failed.
    #[error("failed to encode metrics: {0}")]
    Encode(String),
}

impl MetricsError {
    /// Maps a registration failure from the underlying registry.
    pub(crate) fn from_registration(name: &str, err: prometheus::Error) -> Self {
        match err {
            prometheus::Error::AlreadyReg => MetricsError::AlreadyRegistered(name.to_string()),
            other => MetricsError::Registry(other.to_string()),
        }
    }
}

/// Result type alias using `MetricsError`.
pub type Result<T> = std::result::Result<T, MetricsError>;
