//! Point-in-time view of a registry for assertions.
//!
//! Lookups take a metric name and a subset of label pairs. Every series of
//! the family whose labels contain all given pairs is summed, so
//! `counter("http_requests_total", &[("status", "500")])` counts 500s
//! across all endpoints.

use http_metrics::MetricsRegistry;
use prometheus::proto::{Metric, MetricFamily};

/// Gathered families of one registry.
#[derive(Debug, Clone)]
pub struct MetricSnapshot {
    families: Vec<MetricFamily>,
}

impl MetricSnapshot {
    /// Gather every family of `registry`.
    pub fn take(registry: &MetricsRegistry) -> Self {
        Self {
            families: registry.gather(),
        }
    }

    /// Names of all gathered families.
    pub fn family_names(&self) -> Vec<String> {
        self.families
            .iter()
            .map(|family| family.get_name().to_string())
            .collect()
    }

    pub fn has_family(&self, name: &str) -> bool {
        self.family(name).is_some()
    }

    /// Number of series in family `name` matching `labels`.
    pub fn series_count(&self, name: &str, labels: &[(&str, &str)]) -> usize {
        self.matching(name, labels).count()
    }

    /// Sum of counter values matching `labels`.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> f64 {
        self.matching(name, labels)
            .map(|metric| metric.get_counter().get_value())
            .sum()
    }

    /// Sum of gauge values matching `labels`.
    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> f64 {
        self.matching(name, labels)
            .map(|metric| metric.get_gauge().get_value())
            .sum()
    }

    /// Total observation count of histogram series matching `labels`.
    pub fn histogram_count(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.matching(name, labels)
            .map(|metric| metric.get_histogram().get_sample_count())
            .sum()
    }

    /// Total observation sum of histogram series matching `labels`.
    pub fn histogram_sum(&self, name: &str, labels: &[(&str, &str)]) -> f64 {
        self.matching(name, labels)
            .map(|metric| metric.get_histogram().get_sample_sum())
            .sum()
    }

    /// Distinct values of `label` across family `name`, sorted.
    pub fn label_values(&self, name: &str, label: &str) -> Vec<String> {
        let mut values: Vec<String> = self
            .matching(name, &[])
            .filter_map(|metric| {
                metric
                    .get_label()
                    .iter()
                    .find(|pair| pair.get_name() == label)
                    .map(|pair| pair.get_value().to_string())
            })
            .collect();
        values.sort();
        values.dedup();
        values
    }

    /// Label names of the first series of family `name`, in exposition order.
    pub fn label_names(&self, name: &str) -> Vec<String> {
        self.matching(name, &[])
            .next()
            .map(|metric| {
                metric
                    .get_label()
                    .iter()
                    .map(|pair| pair.get_name().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn family(&self, name: &str) -> Option<&MetricFamily> {
        self.families.iter().find(|family| family.get_name() == name)
    }

    fn matching<'a>(
        &'a self,
        name: &str,
        labels: &'a [(&'a str, &'a str)],
    ) -> impl Iterator<Item = &'a Metric> + 'a {
        self.family(name)
            .map(|family| family.get_metric())
            .unwrap_or_default()
            .iter()
            .filter(move |metric| {
                labels.iter().all(|(key, value)| {
                    metric
                        .get_label()
                        .iter()
                        .any(|pair| pair.get_name() == *key && pair.get_value() == *value)
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_metrics::metrics::{Counter, Gauge, Histogram};
    use http_metrics::NoLabels;

    http_metrics::label_schema! {
        pub struct JobLabels {
            #[label = "name"]
            pub name: String,
            #[label = "status"]
            pub status: String,
        }
    }

    fn job(name: &str, status: &str) -> JobLabels {
        JobLabels {
            name: name.to_string(),
            status: status.to_string(),
        }
    }

    #[test]
    fn test_counter_sums_matching_series() {
        let registry = MetricsRegistry::new();
        let jobs = Counter::<JobLabels>::register(&registry, "jobs_total", "Jobs.").unwrap();
        jobs.inc(&job("resize", "success"));
        jobs.inc(&job("resize", "failure"));
        jobs.inc(&job("upload", "success"));

        let snapshot = MetricSnapshot::take(&registry);
        assert_eq!(snapshot.counter("jobs_total", &[]), 3.0);
        assert_eq!(snapshot.counter("jobs_total", &[("status", "success")]), 2.0);
        assert_eq!(
            snapshot.counter("jobs_total", &[("name", "resize"), ("status", "failure")]),
            1.0
        );
        assert_eq!(snapshot.series_count("jobs_total", &[("name", "resize")]), 2);
        assert_eq!(
            snapshot.label_values("jobs_total", "name"),
            vec!["resize".to_string(), "upload".to_string()]
        );
        assert_eq!(
            snapshot.label_names("jobs_total"),
            vec!["name".to_string(), "status".to_string()]
        );
    }

    #[test]
    fn test_missing_family_reads_as_zero() {
        let snapshot = MetricSnapshot::take(&MetricsRegistry::new());
        assert!(!snapshot.has_family("absent_total"));
        assert_eq!(snapshot.counter("absent_total", &[]), 0.0);
        assert_eq!(snapshot.histogram_count("absent_seconds", &[]), 0);
        assert!(snapshot.family_names().is_empty());
    }

    #[test]
    fn test_gauge_and_histogram() {
        let registry = MetricsRegistry::new();
        let depth = Gauge::unlabeled(&registry, "queue_depth", "Depth.").unwrap();
        let latency = Histogram::unlabeled(&registry, "job_seconds", "Latency.", &[0.1, 1.0]).unwrap();
        depth.set(4.0, &NoLabels);
        latency.observe(0.5, &NoLabels);
        latency.observe(1.5, &NoLabels);

        let snapshot = MetricSnapshot::take(&registry);
        assert_eq!(snapshot.gauge("queue_depth", &[]), 4.0);
        assert_eq!(snapshot.histogram_count("job_seconds", &[]), 2);
        assert_eq!(snapshot.histogram_sum("job_seconds", &[]), 2.0);
    }
}
