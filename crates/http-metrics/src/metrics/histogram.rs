//! Histograms.

use super::{existing_series, family_error, label_names, series};
use crate::errors::{MetricsError, Result};
use crate::labels::{LabelSchema, NoLabels};
use crate::registry::MetricsRegistry;
use prometheus::{HistogramOpts, HistogramVec};
use std::fmt;
use std::marker::PhantomData;

/// Latency buckets in seconds, from 5ms up to 100s.
pub const DEFAULT_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0,
];

/// Histogram family keyed by label schema `L`.
///
/// Bucket upper bounds are fixed at registration; the `+Inf` bucket, the
/// running sum and the sample count are always maintained.
pub struct Histogram<L: LabelSchema = NoLabels> {
    name: String,
    vec: HistogramVec,
    _labels: PhantomData<fn(&L)>,
}

impl<L: LabelSchema> Histogram<L> {
    /// Registers a histogram family named `name` with `L`'s labels.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Counter::register`](super::Counter::register),
    /// plus `MetricsError::InvalidBuckets` when `buckets` is empty, holds a
    /// non-finite bound or is not strictly ascending.
    pub fn register(
        registry: &MetricsRegistry,
        name: &str,
        help: &str,
        buckets: &[f64],
    ) -> Result<Self> {
        let name = registry.qualified_name(name)?;
        validate_buckets(&name, buckets)?;

        let opts = HistogramOpts::new(name.as_str(), help).buckets(buckets.to_vec());
        let vec = HistogramVec::new(opts, &label_names::<L>()?)
            .map_err(|e| family_error(&name, e))?;
        registry.register(&name, vec.clone())?;

        Ok(Self {
            name,
            vec,
            _labels: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records one sample in the series for `labels`.
    pub fn observe(&self, value: f64, labels: &L) {
        if let Some(histogram) = series(&self.vec, &self.name, labels) {
            histogram.observe(value);
        }
    }

    /// Number of samples recorded for `labels`.
    pub fn sample_count(&self, labels: &L) -> u64 {
        existing_series(&self.vec, labels)
            .map_or(0, |metric| metric.get_histogram().get_sample_count())
    }

    /// Sum of the samples recorded for `labels`.
    pub fn sample_sum(&self, labels: &L) -> f64 {
        existing_series(&self.vec, labels)
            .map_or(0.0, |metric| metric.get_histogram().get_sample_sum())
    }
}

impl Histogram<NoLabels> {
    /// Registers a histogram without labels.
    ///
    /// # Errors
    ///
    /// Same as [`Histogram::register`].
    pub fn unlabeled(
        registry: &MetricsRegistry,
        name: &str,
        help: &str,
        buckets: &[f64],
    ) -> Result<Self> {
        Self::register(registry, name, help, buckets)
    }
}

impl<L: LabelSchema> Clone for Histogram<L> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            vec: self.vec.clone(),
            _labels: PhantomData,
        }
    }
}

impl<L: LabelSchema> fmt::Debug for Histogram<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Histogram")
            .field("name", &self.name)
            .field("labels", &L::descriptor().type_name())
            .finish()
    }
}

fn validate_buckets(metric: &str, buckets: &[f64]) -> Result<()> {
    let invalid = |reason: &str| MetricsError::InvalidBuckets {
        metric: metric.to_string(),
        reason: reason.to_string(),
    };

    if buckets.is_empty() {
        return Err(invalid("at least one bucket is required"));
    }
    if buckets.iter().any(|bound| !bound.is_finite()) {
        return Err(invalid("bounds must be finite (+Inf is implicit)"));
    }
    if buckets.windows(2).any(|pair| matches!(pair, [lower, upper] if lower >= upper)) {
        return Err(invalid("bounds must be strictly ascending"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    crate::label_schema! {
        #[derive(Debug, Clone, Default)]
        struct RouteLabels {
            #[label = "endpoint"]
            pub endpoint: String,
        }
    }

    fn route(endpoint: &str) -> RouteLabels {
        RouteLabels {
            endpoint: endpoint.to_string(),
        }
    }

    #[test]
    fn test_observe_tracks_count_and_sum() {
        let registry = MetricsRegistry::new();
        let histogram = Histogram::<RouteLabels>::register(
            &registry,
            "request_duration_seconds",
            "Latency",
            DEFAULT_DURATION_BUCKETS,
        )
        .unwrap();

        histogram.observe(0.012, &route("GET /items"));
        histogram.observe(0.3, &route("GET /items"));

        assert_eq!(histogram.sample_count(&route("GET /items")), 2);
        assert!((histogram.sample_sum(&route("GET /items")) - 0.312).abs() < 1e-9);
    }

    #[test]
    fn test_reading_unknown_series_leaves_exposition_alone() {
        let registry = MetricsRegistry::new();
        let histogram = Histogram::<RouteLabels>::register(
            &registry,
            "request_duration_seconds",
            "Latency",
            DEFAULT_DURATION_BUCKETS,
        )
        .unwrap();
        histogram.observe(0.2, &route("GET /items"));

        assert_eq!(histogram.sample_count(&route("GET /orders")), 0);
        assert_eq!(histogram.sample_sum(&route("GET /orders")), 0.0);

        let text = registry.render().unwrap();
        assert!(text.contains("GET /items"));
        assert!(!text.contains("GET /orders"));
    }

    #[test]
    fn test_exposition_has_buckets_inf_sum_and_count() {
        let registry = MetricsRegistry::new();
        let histogram =
            Histogram::unlabeled(&registry, "job_seconds", "Job time", &[0.1, 1.0]).unwrap();

        histogram.observe(0.05, &NoLabels);
        histogram.observe(5.0, &NoLabels);

        let text = registry.render().unwrap();
        assert!(text.contains("job_seconds_bucket{le=\"0.1\"} 1"));
        assert!(text.contains("job_seconds_bucket{le=\"1\"} 1"));
        assert!(text.contains("job_seconds_bucket{le=\"+Inf\"} 2"));
        assert!(text.contains("job_seconds_sum 5.05"));
        assert!(text.contains("job_seconds_count 2"));
    }

    #[test]
    fn test_invalid_buckets_are_rejected() {
        let registry = MetricsRegistry::new();
        for buckets in [
            &[][..],
            &[1.0, 0.5][..],
            &[0.5, 0.5][..],
            &[0.5, f64::INFINITY][..],
            &[f64::NAN][..],
        ] {
            let err =
                Histogram::unlabeled(&registry, "bad_seconds", "Bad", buckets).unwrap_err();
            assert!(matches!(err, MetricsError::InvalidBuckets { .. }), "{buckets:?}");
        }
        assert!(!registry.is_registered("bad_seconds"));
    }

    #[test]
    fn test_invalid_name_is_rejected_before_buckets() {
        let registry = MetricsRegistry::new();
        let err = Histogram::unlabeled(&registry, "Bad", "Bad", &[]).unwrap_err();
        assert_eq!(err, MetricsError::InvalidMetricName("Bad".to_string()));
    }
}
