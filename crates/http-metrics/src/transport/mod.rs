//! Outbound HTTP metrics.
//!
//! [`TransportLayer`] decorates any tower service that sends requests and
//! records, per call:
//! - `http_client_requests_inflight{host}`
//! - `http_client_requests_total{host, status}`
//! - `http_client_request_duration_seconds{host, status}`: only for calls
//!   that received a response
//!
//! `status` is the numeric response status when one arrived, otherwise
//! `timeout`, `canceled` or `error` as decided by [`ClassifyFailure`]. A
//! call whose future is dropped before it resolves is `canceled`.
//!
//! The decorated service's result is returned unchanged.

mod classify;
mod client;

pub use classify::{
    classify_error, Canceled, ClassifyFailure, Failure, OutboundRequest, OutboundResponse,
};
pub use client::{ClientSender, InstrumentedClient};

use crate::config::TransportOptions;
use crate::errors::{MetricsError, Result};
use crate::label_schema;
use crate::metrics::{Counter, Gauge, Histogram, DEFAULT_DURATION_BUCKETS};
use crate::registry::MetricsRegistry;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};

label_schema! {
    /// Labels of the outbound counter and duration histogram.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct ClientRequestLabels {
        #[label = "host"]
        pub host: String,
        #[label = "status"]
        pub status: String,
    }
}

label_schema! {
    /// Labels of the outbound in-flight gauge.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct ClientInflightLabels {
        #[label = "host"]
        pub host: String,
    }
}

/// Metric families written by the transport.
#[derive(Debug, Clone)]
pub struct TransportMetrics {
    pub requests_total: Counter<ClientRequestLabels>,
    pub request_duration: Histogram<ClientRequestLabels>,
    pub requests_inflight: Gauge<ClientInflightLabels>,
}

impl TransportMetrics {
    /// Registers the three transport families.
    ///
    /// # Errors
    ///
    /// Fails if any of the names is already registered in `registry`.
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            requests_total: Counter::register(
                registry,
                "http_client_requests_total",
                "Total number of outgoing HTTP requests.",
            )?,
            request_duration: Histogram::register(
                registry,
                "http_client_request_duration_seconds",
                "Histogram of latency (seconds) of outgoing HTTP requests.",
                DEFAULT_DURATION_BUCKETS,
            )?,
            requests_inflight: Gauge::register(
                registry,
                "http_client_requests_inflight",
                "Number of outgoing HTTP requests currently in flight.",
            )?,
        })
    }
}

/// Tower layer instrumenting outbound calls.
#[derive(Debug, Clone)]
pub struct TransportLayer {
    metrics: Arc<TransportMetrics>,
    options: TransportOptions,
}

impl TransportLayer {
    /// Registers the transport families in `registry` and builds the layer.
    ///
    /// # Errors
    ///
    /// Fails if the transport families are already registered.
    pub fn new(registry: &MetricsRegistry, options: TransportOptions) -> Result<Self> {
        let metrics = TransportMetrics::register(registry)?;
        Ok(Self::from_metrics(Arc::new(metrics), options))
    }

    /// Builds a layer around already registered families.
    pub fn from_metrics(metrics: Arc<TransportMetrics>, options: TransportOptions) -> Self {
        Self { metrics, options }
    }

    pub fn metrics(&self) -> &Arc<TransportMetrics> {
        &self.metrics
    }

    /// Instruments a `reqwest` client.
    pub fn client(&self, client: reqwest::Client) -> InstrumentedClient {
        InstrumentedClient::new(self.layer(ClientSender::new(client)))
    }
}

impl<S> Layer<S> for TransportLayer {
    type Service = Transport<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Transport {
            inner,
            metrics: Arc::clone(&self.metrics),
            options: self.options,
        }
    }
}

/// Tower service produced by [`TransportLayer`].
#[derive(Debug, Clone)]
pub struct Transport<S> {
    inner: S,
    metrics: Arc<TransportMetrics>,
    options: TransportOptions,
}

impl Transport<ClientSender> {
    /// Transport over a default `reqwest` client.
    ///
    /// # Errors
    ///
    /// - `MetricsError::HttpClient` if the client cannot be built (TLS
    ///   backend initialization)
    /// - `MetricsError::AlreadyRegistered` if the families are taken
    pub fn with_default_sender(
        registry: &MetricsRegistry,
        options: TransportOptions,
    ) -> Result<Self> {
        let sender = ClientSender::try_default()
            .map_err(|e| MetricsError::HttpClient(e.to_string()))?;
        Ok(TransportLayer::new(registry, options)?.layer(sender))
    }
}

impl<S> Transport<S> {
    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, Req> Service<Req> for Transport<S>
where
    S: Service<Req> + Clone,
    S::Response: OutboundResponse,
    S::Error: ClassifyFailure,
    Req: OutboundRequest,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Req) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let host = if self.options.track_host {
            request.host().unwrap_or_default()
        } else {
            String::new()
        };

        let guard = Outbound::start(Arc::clone(&self.metrics), ClientInflightLabels { host });

        ResponseFuture {
            inner: Box::pin(inner.call(request)),
            guard: Some(guard),
        }
    }
}

/// Response future of [`Transport`].
pub struct ResponseFuture<F> {
    inner: Pin<Box<F>>,
    guard: Option<Outbound>,
}

impl<F, T, E> Future for ResponseFuture<F>
where
    F: Future<Output = std::result::Result<T, E>>,
    T: OutboundResponse,
    E: ClassifyFailure,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some(guard) = this.guard.as_mut() {
            guard.polling = true;
        }
        let poll = this.inner.as_mut().poll(cx);
        if let Some(guard) = this.guard.as_mut() {
            guard.polling = false;
        }

        if let Poll::Ready(result) = &poll {
            if let Some(mut guard) = this.guard.take() {
                guard.outcome = Some(match result {
                    Ok(response) => Outcome::Response(response.status_code()),
                    Err(e) => Outcome::Failed(e.classify()),
                });
            }
        }

        poll
    }
}

enum Outcome {
    Response(u16),
    Failed(Failure),
}

/// Per-call bookkeeping; finalizes the observation when dropped.
struct Outbound {
    metrics: Arc<TransportMetrics>,
    inflight: ClientInflightLabels,
    start: Instant,
    outcome: Option<Outcome>,
    polling: bool,
}

impl Outbound {
    fn start(metrics: Arc<TransportMetrics>, inflight: ClientInflightLabels) -> Self {
        metrics.requests_inflight.inc(&inflight);
        Self {
            metrics,
            inflight,
            start: Instant::now(),
            outcome: None,
            polling: false,
        }
    }
}

impl Drop for Outbound {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.metrics.requests_inflight.dec(&self.inflight);

        let panicked = self.polling || std::thread::panicking();
        let (status, responded) = match &self.outcome {
            Some(Outcome::Response(code)) => (code.to_string(), true),
            Some(Outcome::Failed(failure)) => (failure.as_label().to_string(), false),
            None if panicked => (Failure::Error.as_label().to_string(), false),
            None => (Failure::Canceled.as_label().to_string(), false),
        };

        let labels = ClientRequestLabels {
            host: std::mem::take(&mut self.inflight.host),
            status,
        };

        self.metrics.requests_total.inc(&labels);
        if responded {
            self.metrics.request_duration.observe(duration, &labels);
        }

        tracing::trace!(
            target: "http_metrics.transport",
            host = %labels.host,
            status = %labels.status,
            duration_seconds = duration,
            "Outbound call observed"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;
    use tower::{service_fn, ServiceBuilder, ServiceExt};

    fn get(uri: &str) -> http::Request<()> {
        http::Request::builder().uri(uri).body(()).unwrap()
    }

    fn labels(host: &str, status: &str) -> ClientRequestLabels {
        ClientRequestLabels {
            host: host.to_string(),
            status: status.to_string(),
        }
    }

    fn layer(track_host: bool) -> TransportLayer {
        let registry = MetricsRegistry::new();
        TransportLayer::new(&registry, TransportOptions::new().track_host(track_host)).unwrap()
    }

    #[tokio::test]
    async fn test_response_records_status_and_latency() {
        let layer = layer(true);
        let metrics = Arc::clone(layer.metrics());
        let service = layer.layer(service_fn(|_req: http::Request<()>| async {
            Ok::<_, io::Error>(http::Response::builder().status(503).body(()).unwrap())
        }));

        let response = service.oneshot(get("http://api.example.com/v1")).await.unwrap();
        assert_eq!(response.status(), 503);

        let expected = labels("api.example.com", "503");
        assert_eq!(metrics.requests_total.get(&expected), 1.0);
        assert_eq!(metrics.request_duration.sample_count(&expected), 1);
        assert_eq!(
            metrics.requests_inflight.get(&ClientInflightLabels {
                host: "api.example.com".to_string()
            }),
            0.0
        );
    }

    #[tokio::test]
    async fn test_host_is_empty_unless_tracked() {
        let layer = layer(false);
        let metrics = Arc::clone(layer.metrics());
        let service = layer.layer(service_fn(|_req: http::Request<()>| async {
            Ok::<_, io::Error>(http::Response::new(()))
        }));

        service.oneshot(get("http://api.example.com/v1")).await.unwrap();

        assert_eq!(metrics.requests_total.get(&labels("", "200")), 1.0);
    }

    #[tokio::test]
    async fn test_transport_error_is_error_without_histogram() {
        let layer = layer(true);
        let metrics = Arc::clone(layer.metrics());
        let service = layer.layer(service_fn(|_req: http::Request<()>| async {
            Err::<http::Response<()>, _>(io::Error::new(
                io::ErrorKind::NotFound,
                "failed to lookup address information",
            ))
        }));

        let err = service
            .oneshot(get("http://cant-resolve-this.invalid/"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let expected = labels("cant-resolve-this.invalid", "error");
        assert_eq!(metrics.requests_total.get(&expected), 1.0);
        assert_eq!(metrics.request_duration.sample_count(&expected), 0);
    }

    #[tokio::test]
    async fn test_deadline_is_timeout() {
        let layer = layer(false);
        let metrics = Arc::clone(layer.metrics());
        let sender = service_fn(|_req: http::Request<()>| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, tower::BoxError>(http::Response::new(()))
        });
        let service = ServiceBuilder::new()
            .layer(layer)
            .timeout(Duration::from_millis(10))
            .service(sender);

        let err = service.oneshot(get("http://slow.example/")).await.unwrap_err();
        assert!(err.is::<tower::timeout::error::Elapsed>());

        assert_eq!(metrics.requests_total.get(&labels("", "timeout")), 1.0);
    }

    #[tokio::test]
    async fn test_dropped_call_is_canceled() {
        let layer = layer(false);
        let metrics = Arc::clone(layer.metrics());
        let service = layer.layer(service_fn(|_req: http::Request<()>| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, io::Error>(http::Response::new(()))
        }));

        let pending = service.oneshot(get("http://slow.example/"));
        assert!(tokio::time::timeout(Duration::from_millis(10), pending)
            .await
            .is_err());

        assert_eq!(metrics.requests_total.get(&labels("", "canceled")), 1.0);
        assert_eq!(
            metrics.requests_inflight.get(&ClientInflightLabels::default()),
            0.0
        );
    }

    #[tokio::test]
    async fn test_canceled_marker_is_canceled() {
        let layer = layer(false);
        let metrics = Arc::clone(layer.metrics());
        let service = layer.layer(service_fn(|_req: http::Request<()>| async {
            Err::<http::Response<()>, tower::BoxError>(Box::new(Canceled))
        }));

        service.oneshot(get("http://x.example/")).await.unwrap_err();

        assert_eq!(metrics.requests_total.get(&labels("", "canceled")), 1.0);
    }

    #[tokio::test]
    async fn test_inflight_is_visible_during_call() {
        let layer = layer(false);
        let metrics = Arc::clone(layer.metrics());
        let observed = Arc::clone(&metrics);
        let service = layer.layer(service_fn(move |_req: http::Request<()>| {
            let observed = Arc::clone(&observed);
            async move {
                let inflight = observed
                    .requests_inflight
                    .get(&ClientInflightLabels::default());
                Ok::<_, io::Error>(
                    http::Response::builder()
                        .status(if inflight == 1.0 { 200 } else { 500 })
                        .body(())
                        .unwrap(),
                )
            }
        }));

        let response = service.oneshot(get("http://x.example/")).await.unwrap();
        assert_eq!(response.status(), 200);
    }

    #[test]
    fn test_with_default_sender_registers_families() {
        let registry = MetricsRegistry::new();
        Transport::with_default_sender(&registry, TransportOptions::default()).unwrap();

        assert!(registry.is_registered("http_client_requests_total"));
        assert!(registry.is_registered("http_client_request_duration_seconds"));
        assert!(registry.is_registered("http_client_requests_inflight"));
    }
}
