//! Per-route request deadline.
//!
//! Unlike a plain timeout layer, expiry also cancels the request's
//! [`RequestCancellation`] token, so the collector records the request as
//! aborted (no latency sample) while the client still gets a 504.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_metrics::middleware::RequestCancellation;
use std::time::Duration;

/// Deadline of the `/timeout` route.
pub const REQUEST_DEADLINE: Duration = Duration::from_secs(1);

/// Middleware enforcing [`REQUEST_DEADLINE`].
pub async fn deadline_middleware(request: Request, next: Next) -> Response {
    with_deadline(REQUEST_DEADLINE, request, next).await
}

pub async fn with_deadline(deadline: Duration, request: Request, next: Next) -> Response {
    let cancellation = request.extensions().get::<RequestCancellation>().cloned();
    let path = request.uri().path().to_string();

    match tokio::time::timeout(deadline, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            if let Some(cancellation) = cancellation {
                cancellation.cancel();
            }
            tracing::warn!(
                target: "http_metrics_demo.deadline",
                path = %path,
                deadline_ms = deadline.as_millis() as u64,
                "Request deadline exceeded"
            );
            (StatusCode::GATEWAY_TIMEOUT, "Request deadline exceeded\n").into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::Path, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(deadline: Duration) -> Router {
        Router::new()
            .route(
                "/sleep/:ms",
                get(|Path(ms): Path<u64>| async move {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    "done"
                }),
            )
            .layer(middleware::from_fn(move |req: Request, next: Next| {
                with_deadline(deadline, req, next)
            }))
    }

    fn request(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request builder should succeed")
    }

    #[tokio::test]
    async fn test_fast_request_passes_through() {
        let response = app(Duration::from_millis(500))
            .oneshot(request("/sleep/1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_expired_request_returns_504_and_cancels_token() {
        let cancellation = RequestCancellation::default();
        let router = app(Duration::from_millis(10));
        let mut req = request("/sleep/5000");
        req.extensions_mut().insert(cancellation.clone());

        let response = router.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(cancellation.is_cancelled());
    }
}
