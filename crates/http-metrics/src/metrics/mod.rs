//! Typed metric factories.
//!
//! Each factory validates the metric name, resolves the label names of its
//! schema type and registers one labeled family in a [`MetricsRegistry`].
//! The returned handle only accepts instances of that schema, so call
//! sites cannot drift apart on label names.
//!
//! ```
//! use http_metrics::labels::NoLabels;
//! use http_metrics::metrics::{Counter, Histogram, DEFAULT_DURATION_BUCKETS};
//! use http_metrics::MetricsRegistry;
//!
//! http_metrics::label_schema! {
//!     pub struct JobLabels {
//!         #[label = "name"]
//!         pub name: String,
//!         #[label = "status"]
//!         pub status: String,
//!     }
//! }
//!
//! let registry = MetricsRegistry::new();
//! let jobs = Counter::<JobLabels>::register(&registry, "jobs_processed_total", "Jobs processed.")?;
//! let restarts = Counter::unlabeled(&registry, "worker_restarts_total", "Worker restarts.")?;
//! let latency = Histogram::<JobLabels>::register(
//!     &registry,
//!     "job_duration_seconds",
//!     "Job duration.",
//!     DEFAULT_DURATION_BUCKETS,
//! )?;
//!
//! let labels = JobLabels { name: "resize".into(), status: "success".into() };
//! jobs.inc(&labels);
//! latency.observe(0.42, &labels);
//! restarts.inc(&NoLabels);
//! # Ok::<(), http_metrics::MetricsError>(())
//! ```
//!
//! [`MetricsRegistry`]: crate::registry::MetricsRegistry

mod counter;
mod gauge;
mod histogram;
mod info;

pub use counter::Counter;
pub use gauge::Gauge;
pub use histogram::{Histogram, DEFAULT_DURATION_BUCKETS};
pub use info::Info;

use crate::errors::{MetricsError, Result};
use crate::labels::{self, LabelSchema};
use prometheus::core::{Collector, MetricVec, MetricVecBuilder};
use prometheus::proto::Metric;

/// Resolved label names of `L`, borrowed for a family constructor.
fn label_names<L: LabelSchema>() -> Result<Vec<&'static str>> {
    Ok(labels::resolve::<L>()?.iter().map(String::as_str).collect())
}

/// Maps a family construction failure.
fn family_error(name: &str, err: prometheus::Error) -> MetricsError {
    MetricsError::Registry(format!("{name}: {err}"))
}

/// Child series of `vec` for one schema instance.
///
/// Label names were validated when the family was registered, so a
/// failure here is a defect. It is logged and the observation dropped.
fn series<L, T>(vec: &MetricVec<T>, metric: &str, labels: &L) -> Option<T::M>
where
    L: LabelSchema,
    T: MetricVecBuilder,
{
    let result = labels::values(labels).and_then(|values| {
        vec.get_metric_with_label_values(&values)
            .map_err(|e| family_error(metric, e))
    });

    match result {
        Ok(series) => Some(series),
        Err(e) => {
            tracing::error!(target: "http_metrics.registry", metric, error = %e, "Dropped observation");
            None
        }
    }
}

/// Snapshot of the existing series of `vec` for one schema instance.
///
/// Read-only: a label combination that was never written stays absent
/// from the exposition.
fn existing_series<L, T>(vec: &MetricVec<T>, labels: &L) -> Option<Metric>
where
    L: LabelSchema,
    T: MetricVecBuilder,
{
    let pairs = labels::extract(labels).ok()?;
    vec.collect().iter().find_map(|family| {
        family
            .get_metric()
            .iter()
            .find(|metric| {
                let found = metric.get_label();
                found.len() == pairs.len()
                    && pairs.iter().all(|(name, value)| {
                        found
                            .iter()
                            .any(|pair| pair.get_name() == *name && pair.get_value() == *value)
                    })
            })
            .cloned()
    })
}
