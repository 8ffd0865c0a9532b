//! Test server harness for E2E testing
//!
//! Provides `TestServer` for serving an axum router on a loopback port.

use axum::Router;
use std::net::SocketAddr;
use tokio::task::JoinHandle;

/// Background server bound to `127.0.0.1:<random port>`.
///
/// # Example
/// ```rust,ignore
/// let server = TestServer::spawn(router).await?;
/// let response = reqwest::get(server.url_for("/ping")).await?;
/// assert_eq!(response.status(), 200);
/// ```
pub struct TestServer {
    addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Spawn `app` on a random available port.
    ///
    /// # Returns
    /// * `Ok(TestServer)` - Running server instance
    /// * `Err(anyhow::Error)` - If binding fails
    pub async fn spawn(app: Router) -> Result<Self, anyhow::Error> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the URL of `path` on the test server.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.url(), path)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Fetch and return the text body of `/metrics`.
    pub async fn scrape(&self) -> Result<String, anyhow::Error> {
        let response = reqwest::get(self.url_for("/metrics")).await?;
        anyhow::ensure!(
            response.status().is_success(),
            "scrape returned {}",
            response.status()
        );
        Ok(response.text().await?)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
