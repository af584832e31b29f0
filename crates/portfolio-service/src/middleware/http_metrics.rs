//! HTTP metrics middleware for capturing all request/response metrics
//!
//! Applied outermost so framework-level responses (404, 405, timeouts) are
//! counted too.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Middleware that records method, normalized path, status and duration
/// for every response.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn handler_200() -> &'static str {
        "OK"
    }

    async fn handler_500() -> (StatusCode, &'static str) {
        (StatusCode::INTERNAL_SERVER_ERROR, "Error")
    }

    fn test_app() -> Router {
        Router::new()
            .route("/success", get(handler_200))
            .route("/error", get(handler_500))
            .layer(middleware::from_fn(http_metrics_middleware))
    }

    #[tokio::test]
    async fn test_middleware_passes_responses_through() {
        for (uri, expected) in [
            ("/success", StatusCode::OK),
            ("/error", StatusCode::INTERNAL_SERVER_ERROR),
            ("/missing", StatusCode::NOT_FOUND),
        ] {
            let request = HttpRequest::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .expect("request builder should succeed");

            let response = test_app()
                .oneshot(request)
                .await
                .expect("request should succeed");

            assert_eq!(response.status(), expected, "uri {uri}");
        }
    }

    #[tokio::test]
    async fn test_middleware_records_request_counter() {
        use metrics_util::debugging::DebuggingRecorder;

        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let _guard = ::metrics::set_default_local_recorder(&recorder);

        let request = HttpRequest::builder()
            .uri("/success")
            .body(Body::empty())
            .unwrap();
        test_app().oneshot(request).await.unwrap();

        let recorded = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .any(|(key, _, _, _)| key.key().name() == "portfolio_http_requests_total");
        assert!(recorded);
    }
}
