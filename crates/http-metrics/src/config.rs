//! Instrumentation options for the inbound collector and outbound transport.

use http::request::Parts;
use http::Method;
use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether a request bypasses instrumentation.
pub type SkipFn = Arc<dyn Fn(&Parts) -> bool + Send + Sync>;

/// Options for [`CollectorLayer`](crate::middleware::CollectorLayer).
#[derive(Clone, Default)]
pub struct CollectorOptions {
    /// Record the request host as the `host` label.
    pub track_host: bool,

    /// Record the protocol (`HTTP/1.1`, `HTTP/2.0`, with a `+ WebSocket`
    /// suffix for upgrade requests) as the `protocol` label.
    pub track_protocol: bool,

    /// Requests for which this returns `true` pass through untouched.
    pub skip: Option<SkipFn>,
}

impl fmt::Debug for CollectorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorOptions")
            .field("track_host", &self.track_host)
            .field("track_protocol", &self.track_protocol)
            .field("skip", &self.skip.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}

impl CollectorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_host(mut self, enabled: bool) -> Self {
        self.track_host = enabled;
        self
    }

    pub fn track_protocol(mut self, enabled: bool) -> Self {
        self.track_protocol = enabled;
        self
    }

    /// Installs the skip predicate, replacing any previous one.
    pub fn skip<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Parts) -> bool + Send + Sync + 'static,
    {
        self.skip = Some(Arc::new(predicate));
        self
    }

    pub(crate) fn should_skip(&self, parts: &Parts) -> bool {
        self.skip.as_ref().is_some_and(|skip| skip(parts))
    }
}

/// Options for [`TransportLayer`](crate::transport::TransportLayer).
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportOptions {
    /// Record the destination host as the `host` label.
    ///
    /// Only enable this for a small, known set of upstream hosts. Hosts
    /// taken from user input, crawlers or generated URLs make the label
    /// cardinality unbounded.
    pub track_host: bool,
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_host(mut self, enabled: bool) -> Self {
        self.track_host = enabled;
        self
    }
}

/// Skip predicate matching any of the given exact paths.
pub fn skip_paths(paths: &[&str]) -> impl Fn(&Parts) -> bool + Send + Sync + 'static {
    let paths: Vec<String> = paths.iter().map(|p| (*p).to_string()).collect();
    move |parts: &Parts| paths.iter().any(|p| p == parts.uri.path())
}

/// Skip predicate matching `OPTIONS` pre-flights and the given exact paths,
/// typically the scrape endpoint and health checks.
pub fn skip_options_and(paths: &[&str]) -> impl Fn(&Parts) -> bool + Send + Sync + 'static {
    let matches_path = skip_paths(paths);
    move |parts: &Parts| parts.method == Method::OPTIONS || matches_path(parts)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use http::Request;

    fn parts(method: Method, uri: &str) -> Parts {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_defaults_track_nothing_and_skip_nothing() {
        let options = CollectorOptions::default();
        assert!(!options.track_host);
        assert!(!options.track_protocol);
        assert!(!options.should_skip(&parts(Method::GET, "/metrics")));
        assert!(!TransportOptions::default().track_host);
    }

    #[test]
    fn test_builder() {
        let options = CollectorOptions::new()
            .track_host(true)
            .track_protocol(true)
            .skip(|parts| parts.uri.path() == "/ping");

        assert!(options.track_host);
        assert!(options.track_protocol);
        assert!(options.should_skip(&parts(Method::GET, "/ping")));
        assert!(!options.should_skip(&parts(Method::GET, "/pong")));
        assert!(TransportOptions::new().track_host(true).track_host);
    }

    #[test]
    fn test_skip_paths_matches_exact_paths() {
        let skip = skip_paths(&["/metrics", "/ping"]);
        assert!(skip(&parts(Method::GET, "/metrics")));
        assert!(skip(&parts(Method::POST, "/ping?x=1")));
        assert!(!skip(&parts(Method::GET, "/metrics/extra")));
    }

    #[test]
    fn test_skip_options_and() {
        let skip = skip_options_and(&["/metrics"]);
        assert!(skip(&parts(Method::OPTIONS, "/items")));
        assert!(skip(&parts(Method::GET, "/metrics")));
        assert!(!skip(&parts(Method::GET, "/items")));
    }

    #[test]
    fn test_debug_hides_predicate() {
        let options = CollectorOptions::new().skip(|_| true);
        let debug = format!("{:?}", options);
        assert!(debug.contains("<predicate>"));
    }
}
