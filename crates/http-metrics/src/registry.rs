//! Process-scoped metric registry.
//!
//! [`MetricsRegistry`] is created once at startup and handed to every metric
//! factory and to the `/metrics` handler. It is a cheap clone around a
//! shared `prometheus::Registry`; there is no global default instance.

use crate::errors::{MetricsError, Result};
use crate::labels::validate_metric_name;
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Content type of the text exposition format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Shared handle to the metric families of one process.
#[derive(Clone)]
pub struct MetricsRegistry {
    inner: Arc<prometheus::Registry>,
    names: Arc<Mutex<HashSet<String>>>,
    prefix: Option<String>,
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("prefix", &self.prefix)
            .field("families", &self.inner.gather().len())
            .finish()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(prometheus::Registry::new()),
            names: Arc::default(),
            prefix: None,
        }
    }

    /// Creates an empty registry whose metric names all start with `prefix_`.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidMetricName` if the prefix does not
    /// match the metric naming grammar.
    pub fn with_prefix(prefix: &str) -> Result<Self> {
        validate_metric_name(prefix)?;
        Ok(Self {
            inner: Arc::new(prometheus::Registry::new()),
            names: Arc::default(),
            prefix: Some(prefix.to_string()),
        })
    }

    /// Name prefix applied to every registered metric, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Fully qualified, validated metric name.
    pub(crate) fn qualified_name(&self, name: &str) -> Result<String> {
        validate_metric_name(name)?;
        Ok(match &self.prefix {
            Some(prefix) => format!("{prefix}_{name}"),
            None => name.to_string(),
        })
    }

    /// Registers a collector under `name`.
    ///
    /// A name can only be registered once, whatever its labels or help.
    pub(crate) fn register<C>(&self, name: &str, collector: C) -> Result<()>
    where
        C: Collector + 'static,
    {
        let mut names = self.names.lock().unwrap_or_else(PoisonError::into_inner);

        let registered = if names.contains(name) {
            Err(MetricsError::AlreadyRegistered(name.to_string()))
        } else {
            self.inner
                .register(Box::new(collector))
                .map_err(|e| MetricsError::from_registration(name, e))
        };

        if let Err(e) = registered {
            tracing::error!(target: "http_metrics.registry", metric = name, error = %e, "Metric registration failed");
            return Err(e);
        }

        names.insert(name.to_string());
        tracing::debug!(target: "http_metrics.registry", metric = name, "Registered metric family");
        Ok(())
    }

    /// Whether a family named `name` (fully qualified) is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Snapshot of every registered family.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.inner.gather()
    }

    /// Text exposition of every registered family.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::Encode` if the encoder fails.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.gather(), &mut buffer)
            .map_err(|e| MetricsError::Encode(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encode(e.to_string()))
    }
}
