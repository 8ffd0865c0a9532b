//! `reqwest` as a tower sender, and a client facade over the instrumented stack.

use super::Transport;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Service, ServiceExt};

/// Tower service sending requests with a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ClientSender {
    client: reqwest::Client,
}

impl ClientSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Sender over a `reqwest::Client` with default settings.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend or resolver cannot be
    /// initialized.
    pub fn try_default() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            tracing::error!(target: "http_metrics.transport", error = %e, "Failed to build HTTP client");
            e
        })?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Service<reqwest::Request> for ClientSender {
    type Response = reqwest::Response;
    type Error = reqwest::Error;
    type Future = Pin<Box<dyn Future<Output = Result<reqwest::Response, reqwest::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: reqwest::Request) -> Self::Future {
        let client = self.client.clone();
        Box::pin(async move { client.execute(request).await })
    }
}

/// `reqwest`-shaped client whose calls go through the transport metrics.
#[derive(Debug, Clone)]
pub struct InstrumentedClient {
    service: Transport<ClientSender>,
}

impl InstrumentedClient {
    pub fn new(service: Transport<ClientSender>) -> Self {
        Self { service }
    }

    /// Underlying client, for building requests.
    pub fn inner(&self) -> &reqwest::Client {
        self.service.get_ref().client()
    }

    /// Sends a built request.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error unchanged.
    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        self.service.clone().oneshot(request).await
    }

    /// Sends a `GET` to `url`.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error for an invalid URL or a failed call.
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, reqwest::Error> {
        let request = self.inner().get(url).build()?;
        self.execute(request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::TransportOptions;
    use crate::registry::MetricsRegistry;
    use crate::transport::{ClientRequestLabels, TransportLayer, TransportMetrics};
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn instrumented(client: reqwest::Client) -> (InstrumentedClient, Arc<TransportMetrics>) {
        let registry = MetricsRegistry::new();
        let layer = TransportLayer::new(&registry, TransportOptions::new().track_host(true)).unwrap();
        let metrics = Arc::clone(layer.metrics());
        (layer.client(client), metrics)
    }

    fn labels(host: &str, status: &str) -> ClientRequestLabels {
        ClientRequestLabels {
            host: host.to_string(),
            status: status.to_string(),
        }
    }

    #[tokio::test]
    async fn test_get_records_response_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/teapot"))
            .respond_with(ResponseTemplate::new(418))
            .mount(&server)
            .await;

        let (client, metrics) = instrumented(reqwest::Client::new());
        let response = client
            .get(&format!("{}/teapot", server.uri()))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 418);

        let host = server.address().to_string();
        let expected = labels(&host, "418");
        assert_eq!(metrics.requests_total.get(&expected), 1.0);
        assert_eq!(metrics.request_duration.sample_count(&expected), 1);
    }

    #[tokio::test]
    async fn test_client_timeout_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let (client, metrics) = instrumented(client);

        let err = client.get(&server.uri()).await.unwrap_err();
        assert!(err.is_timeout());

        let expected = labels(&server.address().to_string(), "timeout");
        assert_eq!(metrics.requests_total.get(&expected), 1.0);
        assert_eq!(metrics.request_duration.sample_count(&expected), 0);
    }

    #[tokio::test]
    async fn test_connection_refused_is_error() {
        // Bind then release a port so nothing listens on it.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (client, metrics) = instrumented(reqwest::Client::new());
        client.get(&format!("http://{addr}/")).await.unwrap_err();

        let expected = labels(&addr.to_string(), "error");
        assert_eq!(metrics.requests_total.get(&expected), 1.0);
        assert_eq!(metrics.request_duration.sample_count(&expected), 0);
    }

    #[tokio::test]
    async fn test_abandoned_call_is_canceled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let (client, metrics) = instrumented(reqwest::Client::new());
        let url = server.uri();
        let result = tokio::time::timeout(Duration::from_millis(50), client.get(&url)).await;
        assert!(result.is_err());

        let host = server.address().to_string();
        assert_eq!(metrics.requests_total.get(&labels(&host, "canceled")), 1.0);
        assert_eq!(
            metrics.requests_inflight.get(&crate::transport::ClientInflightLabels { host }),
            0.0
        );
    }

    #[test]
    fn test_try_default_builds() {
        assert!(ClientSender::try_default().is_ok());
    }
}
