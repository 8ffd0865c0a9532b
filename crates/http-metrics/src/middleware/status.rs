//! Request-scoped capabilities shared between stacked middleware.
//!
//! Both types live in the request extensions. A collector reuses an
//! instance already inserted by an outer layer instead of replacing it, so
//! every layer of a stack observes the same final status and the same
//! cancellation signal.

use http::Extensions;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Final status code of a request, observable after the handler ran.
///
/// Zero means "not written yet".
#[derive(Debug, Clone, Default)]
pub struct ResponseStatus(Arc<AtomicU16>);

impl ResponseStatus {
    /// Returns the instance in `extensions`, inserting a fresh one if absent.
    pub fn reuse_or_insert(extensions: &mut Extensions) -> Self {
        if let Some(existing) = extensions.get::<Self>() {
            return existing.clone();
        }
        let status = Self::default();
        extensions.insert(status.clone());
        status
    }

    pub fn set(&self, status: u16) {
        self.0.store(status, Ordering::Release);
    }

    /// Records `status` unless a status was already written.
    pub fn set_if_unset(&self, status: u16) {
        let _ = self
            .0
            .compare_exchange(0, status, Ordering::AcqRel, Ordering::Acquire);
    }

    /// The written status, if any.
    pub fn get(&self) -> Option<u16> {
        match self.0.load(Ordering::Acquire) {
            0 => None,
            status => Some(status),
        }
    }
}

/// Cancellation signal of a request.
///
/// Stages inside the collector (deadlines, shutdown handling) cancel it to
/// mark the request as aborted; the collector checks it without blocking
/// when it finalizes.
#[derive(Debug, Clone, Default)]
pub struct RequestCancellation(CancellationToken);

impl RequestCancellation {
    /// Returns the instance in `extensions`, inserting a fresh one if absent.
    pub fn reuse_or_insert(extensions: &mut Extensions) -> Self {
        if let Some(existing) = extensions.get::<Self>() {
            return existing.clone();
        }
        let cancellation = Self::default();
        extensions.insert(cancellation.clone());
        cancellation
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Underlying token, e.g. to `select!` on `cancelled()` in a handler.
    pub fn token(&self) -> &CancellationToken {
        &self.0
    }
}
