//! Portfolio service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Bodies
//! are short plain-text messages; the actual cause is logged server-side.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Portfolio service error type.
///
/// Maps to HTTP status codes:
/// - Unauthorized: 401
/// - NotFound: 404
/// - ServiceUnavailable: 503
/// - Internal: 500
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ServiceError::Unauthorized => "Unauthorized".to_string(),
            ServiceError::NotFound(resource) => format!("{resource} not found"),
            ServiceError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "portfolio.availability", reason = %reason, "Service unavailable");
                "Service temporarily unavailable".to_string()
            }
            ServiceError::Internal => "An internal error occurred".to_string(),
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_text(body: Body) -> String {
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ServiceError::Unauthorized), "Unauthorized");
        assert_eq!(
            format!("{}", ServiceError::NotFound("README".to_string())),
            "Not found: README"
        );
        assert_eq!(
            format!("{}", ServiceError::ServiceUnavailable("disk".to_string())),
            "Service unavailable: disk"
        );
        assert_eq!(format!("{}", ServiceError::Internal), "Internal server error");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceError::Unauthorized.status_code(), 401);
        assert_eq!(ServiceError::NotFound("x".to_string()).status_code(), 404);
        assert_eq!(
            ServiceError::ServiceUnavailable("x".to_string()).status_code(),
            503
        );
        assert_eq!(ServiceError::Internal.status_code(), 500);
    }

    #[tokio::test]
    async fn test_into_response_unauthorized_is_plain_text() {
        let response = ServiceError::Unauthorized.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(content_type.starts_with("text/plain"));

        assert_eq!(read_body_text(response.into_body()).await, "Unauthorized");
    }

    #[tokio::test]
    async fn test_into_response_not_found() {
        let response = ServiceError::NotFound("README".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_body_text(response.into_body()).await, "README not found");
    }

    #[tokio::test]
    async fn test_into_response_service_unavailable_hides_reason() {
        let response =
            ServiceError::ServiceUnavailable("resume file missing".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = read_body_text(response.into_body()).await;
        assert_eq!(body, "Service temporarily unavailable");
        assert!(!body.contains("resume file missing"));
    }

    #[tokio::test]
    async fn test_into_response_internal() {
        let response = ServiceError::Internal.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            read_body_text(response.into_body()).await,
            "An internal error occurred"
        );
    }
}
