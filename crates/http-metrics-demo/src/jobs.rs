//! Simulated background work and its business counter.
//!
//! `jobs_processed_total{name, status}` shows a typed schema outside the
//! HTTP layer: every call site has to build a full [`JobLabels`].

use http_metrics::label_schema;
use http_metrics::metrics::Counter;
use http_metrics::{MetricsRegistry, Result};
use rand::Rng;
use std::time::Duration;

/// Share of jobs that fail, in percent.
pub const FAILURE_PERCENT: u32 = 10;

label_schema! {
    /// Labels of `jobs_processed_total`.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct JobLabels {
        #[label = "name"]
        pub name: String,
        #[label = "status"]
        pub status: String,
    }
}

/// Outcome of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Success,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Success => "success",
            JobStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobMetrics {
    processed: Counter<JobLabels>,
}

impl JobMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            processed: Counter::register(
                registry,
                "jobs_processed_total",
                "Number of jobs processed",
            )?,
        })
    }

    pub fn record(&self, name: &str, status: JobStatus) {
        self.processed.inc(&JobLabels {
            name: name.to_string(),
            status: status.as_str().to_string(),
        });
    }

    /// Number of jobs recorded for `name` with `status`.
    pub fn processed(&self, name: &str, status: JobStatus) -> f64 {
        self.processed.get(&JobLabels {
            name: name.to_string(),
            status: status.as_str().to_string(),
        })
    }

    /// Sleeps for `duration`, then records a job with a random outcome.
    pub async fn do_work(&self, name: &str, duration: Duration) -> JobStatus {
        tokio::time::sleep(duration).await;

        let status = if rand::thread_rng().gen_range(0..100) < FAILURE_PERCENT {
            JobStatus::Error
        } else {
            JobStatus::Success
        };
        self.record(name, status);
        tracing::debug!(target: "http_metrics_demo.jobs", job = name, status = status.as_str(), "Job processed");
        status
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_do_work_records_one_job() {
        let registry = MetricsRegistry::new();
        let jobs = JobMetrics::register(&registry).unwrap();

        let status = jobs.do_work("resize", Duration::from_millis(1)).await;

        assert_eq!(jobs.processed("resize", status), 1.0);
        let other = match status {
            JobStatus::Success => JobStatus::Error,
            JobStatus::Error => JobStatus::Success,
        };
        assert_eq!(jobs.processed("resize", other), 0.0);

        let text = registry.render().unwrap();
        let other_series = format!("status=\"{}\"", other.as_str());
        assert!(!text.contains(&other_series));
    }

    #[test]
    fn test_registered_once() {
        let registry = MetricsRegistry::new();
        JobMetrics::register(&registry).unwrap();
        assert!(JobMetrics::register(&registry).is_err());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(JobStatus::Success.as_str(), "success");
        assert_eq!(JobStatus::Error.as_str(), "error");
    }
}
