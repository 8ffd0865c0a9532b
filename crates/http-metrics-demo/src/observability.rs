//! Logging setup and static service facts.

use crate::config::LogFormat;
use http_metrics::label_schema;
use http_metrics::metrics::Info;
use http_metrics::{MetricsRegistry, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "http_metrics=debug,http_metrics_demo=debug,tower_http=info";

label_schema! {
    /// Labels of `build_info`.
    #[derive(Debug, Clone)]
    pub struct BuildLabels {
        #[label = "version"]
        pub version: String,
        #[label = "service"]
        pub service: String,
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> std::result::Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }
    Ok(())
}

/// Publish `build_info{version, service} 1`.
pub fn register_build_info(registry: &MetricsRegistry) -> Result<Info<BuildLabels>> {
    let info = Info::register(registry, "build_info", "Build information of the running service.")?;
    info.record(&BuildLabels {
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
    });
    Ok(info)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use http_metrics_test_utils::MetricSnapshot;

    #[test]
    fn test_build_info_is_one() {
        let registry = MetricsRegistry::new();
        register_build_info(&registry).unwrap();

        let snapshot = MetricSnapshot::take(&registry);
        assert_eq!(
            snapshot.gauge(
                "build_info",
                &[
                    ("version", env!("CARGO_PKG_VERSION")),
                    ("service", "http-metrics-demo")
                ]
            ),
            1.0
        );
    }
}
