//! Handlers behind the Access middleware.

use crate::auth::{Claims, Session};
use crate::errors::ServiceError;
use crate::routes::AppState;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Served when no resume file is configured.
pub const RESUME_PLACEHOLDER: &str =
    "Set RESUME_PATH to the location of resume.pdf to serve it from this route.";

/// Handler for GET /private/download/resume
///
/// Streams the configured PDF as an attachment, or a plain-text placeholder
/// when `RESUME_PATH` is unset.
///
/// # Errors
///
/// Returns `ServiceError::ServiceUnavailable` if the configured file cannot
/// be read.
#[instrument(skip_all, name = "portfolio.handlers.resume")]
pub async fn download_resume(State(state): State<Arc<AppState>>) -> Result<Response, ServiceError> {
    let Some(path) = state.config.resume_path.as_ref() else {
        tracing::debug!(target: "portfolio.handlers.resume", "No resume configured, serving placeholder");
        return Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            RESUME_PLACEHOLDER,
        )
            .into_response());
    };

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        tracing::error!(
            target: "portfolio.handlers.resume",
            path = %path.display(),
            error = %e,
            "Failed to read resume file"
        );
        ServiceError::ServiceUnavailable("resume file unreadable".to_string())
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"resume.pdf\""),
            (header::CACHE_CONTROL, "private, no-store"),
        ],
        bytes,
    )
        .into_response())
}

/// Handler for GET /private/session
///
/// Returns the visitor's session derived from the verified claims.
///
/// # Errors
///
/// Returns `ServiceError::Unauthorized` if the assertion carries no email
/// (service tokens).
#[instrument(skip_all, name = "portfolio.handlers.session")]
pub async fn get_session(Extension(claims): Extension<Claims>) -> Result<Json<Session>, ServiceError> {
    let session = Session::from_claims(&claims).ok_or_else(|| {
        tracing::debug!(target: "portfolio.handlers.session", "Verified assertion has no email");
        ServiceError::Unauthorized
    })?;

    Ok(Json(session))
}
