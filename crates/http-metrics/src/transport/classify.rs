//! Views of outbound requests, responses and failures needed for labeling.

use std::error::Error as StdError;
use std::io;
use thiserror::Error;

/// Marker error for sends aborted by their caller.
///
/// Senders that stop a call on request (shutdown, caller gave up) should
/// return this, possibly wrapped, so the call is labeled `canceled`.
#[derive(Debug, Clone, Copy, Default, Error)]
#[error("request canceled")]
pub struct Canceled;

/// Terminal classification of a call that produced no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// A deadline elapsed before a response arrived.
    Timeout,
    /// The caller abandoned the call.
    Canceled,
    /// Anything else: DNS, connect, TLS, protocol errors.
    Error,
}

impl Failure {
    /// Value of the `status` label.
    pub fn as_label(&self) -> &'static str {
        match self {
            Failure::Timeout => "timeout",
            Failure::Canceled => "canceled",
            Failure::Error => "error",
        }
    }
}

/// Outbound request whose destination host can be labeled.
pub trait OutboundRequest {
    /// `host[:port]` of the destination, if known.
    fn host(&self) -> Option<String>;
}

/// Outbound response carrying a numeric status.
pub trait OutboundResponse {
    fn status_code(&self) -> u16;
}

/// Sender error that can be classified as timeout, cancel or plain error.
pub trait ClassifyFailure {
    fn classify(&self) -> Failure;
}

impl OutboundRequest for reqwest::Request {
    fn host(&self) -> Option<String> {
        let url = self.url();
        let host = url.host_str().filter(|host| !host.is_empty())?;
        Some(match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}

impl<B> OutboundRequest for http::Request<B> {
    fn host(&self) -> Option<String> {
        // Userinfo is never part of the label.
        let authority = self.uri().authority()?;
        let host = Some(authority.host()).filter(|host| !host.is_empty())?;
        Some(match authority.port_u16() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}

impl OutboundResponse for reqwest::Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

impl<B> OutboundResponse for http::Response<B> {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

impl ClassifyFailure for reqwest::Error {
    fn classify(&self) -> Failure {
        if self.is_timeout() {
            return Failure::Timeout;
        }
        classify_error(self)
    }
}

impl ClassifyFailure for tower::BoxError {
    fn classify(&self) -> Failure {
        classify_error(self.as_ref())
    }
}

impl ClassifyFailure for io::Error {
    fn classify(&self) -> Failure {
        classify_error(self)
    }
}

/// Walks the source chain of `err` looking for a deadline or cancel cause.
pub fn classify_error(err: &(dyn StdError + 'static)) -> Failure {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(failure) = classify_one(err) {
            return failure;
        }
        current = err.source();
    }
    Failure::Error
}

fn classify_one(err: &(dyn StdError + 'static)) -> Option<Failure> {
    if err.is::<Canceled>() {
        return Some(Failure::Canceled);
    }
    if err.is::<tower::timeout::error::Elapsed>() || err.is::<tokio::time::error::Elapsed>() {
        return Some(Failure::Timeout);
    }
    if let Some(err) = err.downcast_ref::<reqwest::Error>() {
        if err.is_timeout() {
            return Some(Failure::Timeout);
        }
    }
    if let Some(err) = err.downcast_ref::<io::Error>() {
        match err.kind() {
            io::ErrorKind::TimedOut => return Some(Failure::Timeout),
            io::ErrorKind::Interrupted => return Some(Failure::Canceled),
            _ => {}
        }
        // `io::Error::source` skips the wrapped error itself.
        if let Some(inner) = err.get_ref() {
            let failure = classify_error(inner);
            if failure != Failure::Error {
                return Some(failure);
            }
        }
    }
    None
}
