//! Inbound HTTP metrics collector.
//!
//! Records, per request that is not skipped:
//! - `http_requests_inflight{host, protocol}`: +1 on entry, -1 on completion
//! - `http_requests_total{host, protocol, endpoint, status, client_aborted}`
//! - `http_request_duration_seconds{...same labels}`: only for requests
//!   that were not aborted
//!
//! The endpoint label is `"<METHOD> <route pattern>"` taken from axum's
//! [`MatchedPath`], or `"<no-match>"` when no route matched. Apply the layer
//! with [`Router::layer`](axum::Router::layer) so that route matching has
//! already happened when the collector sees the request.
//!
//! Finalization lives in a drop guard owned by the response future. It runs
//! exactly once whether the handler returns, panics or the future is dropped
//! because the client went away.

use super::status::{RequestCancellation, ResponseStatus};
use crate::config::CollectorOptions;
use crate::errors::Result;
use crate::label_schema;
use crate::metrics::{Counter, Gauge, Histogram, DEFAULT_DURATION_BUCKETS};
use crate::registry::MetricsRegistry;
use axum::extract::MatchedPath;
use http::header::{HOST, UPGRADE};
use http::request::Parts;
use http::{Request, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};

/// Endpoint label for requests that matched no route.
pub const NO_MATCH: &str = "<no-match>";

/// Protocol suffix for WebSocket upgrade requests.
pub const WEBSOCKET_SUFFIX: &str = " + WebSocket";

label_schema! {
    /// Labels of the request counter and duration histogram.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RequestLabels {
        #[label = "host"]
        pub host: String,
        #[label = "protocol"]
        pub protocol: String,
        #[label = "endpoint"]
        pub endpoint: String,
        #[label = "status"]
        pub status: String,
        #[label = "client_aborted"]
        pub client_aborted: String,
    }
}

label_schema! {
    /// Labels of the in-flight gauge.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct InflightLabels {
        #[label = "host"]
        pub host: String,
        #[label = "protocol"]
        pub protocol: String,
    }
}

/// Metric families written by the collector.
#[derive(Debug, Clone)]
pub struct CollectorMetrics {
    pub requests_total: Counter<RequestLabels>,
    pub request_duration: Histogram<RequestLabels>,
    pub requests_inflight: Gauge<InflightLabels>,
}

impl CollectorMetrics {
    /// Registers the three collector families.
    ///
    /// # Errors
    ///
    /// Fails if any of the names is already registered in `registry`.
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            requests_total: Counter::register(
                registry,
                "http_requests_total",
                "Total number of HTTP requests.",
            )?,
            request_duration: Histogram::register(
                registry,
                "http_request_duration_seconds",
                "Histogram of response latency (seconds) of HTTP requests.",
                DEFAULT_DURATION_BUCKETS,
            )?,
            requests_inflight: Gauge::register(
                registry,
                "http_requests_inflight",
                "Number of HTTP requests currently in flight.",
            )?,
        })
    }
}

/// Tower layer instrumenting inbound requests.
#[derive(Debug, Clone)]
pub struct CollectorLayer {
    metrics: Arc<CollectorMetrics>,
    options: Arc<CollectorOptions>,
}

impl CollectorLayer {
    /// Registers the collector families in `registry` and builds the layer.
    ///
    /// # Errors
    ///
    /// Fails if the collector families are already registered.
    pub fn new(registry: &MetricsRegistry, options: CollectorOptions) -> Result<Self> {
        let metrics = CollectorMetrics::register(registry)?;
        Ok(Self::from_metrics(Arc::new(metrics), options))
    }

    /// Builds a layer around already registered families.
    pub fn from_metrics(metrics: Arc<CollectorMetrics>, options: CollectorOptions) -> Self {
        Self {
            metrics,
            options: Arc::new(options),
        }
    }

    pub fn metrics(&self) -> &Arc<CollectorMetrics> {
        &self.metrics
    }
}

impl<S> Layer<S> for CollectorLayer {
    type Service = Collector<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Collector {
            inner,
            metrics: Arc::clone(&self.metrics),
            options: Arc::clone(&self.options),
        }
    }
}

/// Tower service produced by [`CollectorLayer`].
#[derive(Debug, Clone)]
pub struct Collector<S> {
    inner: S,
    metrics: Arc<CollectorMetrics>,
    options: Arc<CollectorOptions>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for Collector<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        // Keep the service that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let (mut parts, body) = request.into_parts();

        if self.options.should_skip(&parts) {
            tracing::trace!(target: "http_metrics.collector", path = %parts.uri.path(), "Skipping request");
            return ResponseFuture {
                inner: Box::pin(inner.call(Request::from_parts(parts, body))),
                guard: None,
            };
        }

        let inflight = InflightLabels {
            host: if self.options.track_host {
                request_host(&parts)
            } else {
                String::new()
            },
            protocol: if self.options.track_protocol {
                request_protocol(&parts)
            } else {
                String::new()
            },
        };

        let guard = InFlight::start(
            Arc::clone(&self.metrics),
            inflight,
            endpoint(&parts),
            ResponseStatus::reuse_or_insert(&mut parts.extensions),
            RequestCancellation::reuse_or_insert(&mut parts.extensions),
        );

        ResponseFuture {
            inner: Box::pin(inner.call(Request::from_parts(parts, body))),
            guard: Some(guard),
        }
    }
}

/// Response future of [`Collector`].
pub struct ResponseFuture<F> {
    inner: Pin<Box<F>>,
    guard: Option<InFlight>,
}

impl<F, ResBody, E> Future for ResponseFuture<F>
where
    F: Future<Output = std::result::Result<Response<ResBody>, E>>,
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
                match result {
                    Ok(response) => guard.status.set(response.status().as_u16()),
                    // The server turns service errors into a failed response.
                    Err(_) => guard.status.set_if_unset(500),
                }
                guard.completed = true;
            }
        }

        poll
    }
}

/// Per-request bookkeeping; finalizes the observation when dropped.
struct InFlight {
    metrics: Arc<CollectorMetrics>,
    inflight: InflightLabels,
    endpoint: String,
    status: ResponseStatus,
    cancellation: RequestCancellation,
    start: Instant,
    completed: bool,
    polling: bool,
}

impl InFlight {
    fn start(
        metrics: Arc<CollectorMetrics>,
        inflight: InflightLabels,
        endpoint: String,
        status: ResponseStatus,
        cancellation: RequestCancellation,
    ) -> Self {
        metrics.requests_inflight.inc(&inflight);
        Self {
            metrics,
            inflight,
            endpoint,
            status,
            cancellation,
            start: Instant::now(),
            completed: false,
            polling: false,
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.metrics.requests_inflight.dec(&self.inflight);

        // Dropped mid-poll means the handler panicked.
        let panicked = self.polling || std::thread::panicking();
        let aborted = !panicked && (!self.completed || self.cancellation.is_cancelled());

        let status = match self.status.get() {
            Some(status) => status,
            None if panicked => 500,
            None => 200,
        };

        let labels = RequestLabels {
            host: std::mem::take(&mut self.inflight.host),
            protocol: std::mem::take(&mut self.inflight.protocol),
            endpoint: std::mem::take(&mut self.endpoint),
            status: status.to_string(),
            client_aborted: aborted.to_string(),
        };

        self.metrics.requests_total.inc(&labels);
        if !aborted {
            self.metrics.request_duration.observe(duration, &labels);
        }

        tracing::trace!(
            target: "http_metrics.collector",
            endpoint = %labels.endpoint,
            status = %labels.status,
            client_aborted = aborted,
            panicked,
            duration_seconds = duration,
            "Request observed"
        );
    }
}

/// `"<METHOD> <pattern>"` for matched routes, else [`NO_MATCH`].
fn endpoint(parts: &Parts) -> String {
    match parts.extensions.get::<MatchedPath>() {
        Some(path) => format!("{} {}", parts.method, path.as_str()),
        None => NO_MATCH.to_string(),
    }
}

/// `Host` header, else the URI authority.
fn request_host(parts: &Parts) -> String {
    parts
        .headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| parts.uri.authority().map(|authority| authority.as_str()))
        .unwrap_or_default()
        .to_string()
}

/// `HTTP/1.1`, `HTTP/2.0`, ... with [`WEBSOCKET_SUFFIX`] for upgrades.
fn request_protocol(parts: &Parts) -> String {
    let mut protocol = format!("{:?}", parts.version);
    let websocket = parts
        .headers
        .get_all(UPGRADE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.trim().eq_ignore_ascii_case("websocket"));
    if websocket {
        protocol.push_str(WEBSOCKET_SUFFIX);
    }
    protocol
}
