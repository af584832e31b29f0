//! README rendering handler.

use crate::errors::ServiceError;
use crate::routes::AppState;
use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

/// Query parameters for GET /v1/readme
#[derive(Debug, Deserialize)]
pub struct ReadmeQuery {
    /// Repository URL, e.g. `https://github.com/owner/repo`.
    pub repo: String,
}

/// Handler for GET /v1/readme?repo=<url>
///
/// Fetches the README rendered by GitHub and highlights its code blocks.
///
/// # Errors
///
/// - `ServiceError::NotFound` if the URL is not a GitHub repository or the
///   README cannot be retrieved
/// - `ServiceError::Internal` if the highlighting task fails
#[instrument(skip_all, name = "portfolio.handlers.readme")]
pub async fn get_readme(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReadmeQuery>,
) -> Result<Html<String>, ServiceError> {
    let html = state
        .github
        .fetch_readme_html(&query.repo)
        .await
        .ok_or_else(|| ServiceError::NotFound("README".to_string()))?;

    let highlighter = Arc::clone(&state.highlighter);
    let highlighted = tokio::task::spawn_blocking(move || highlighter.highlight(&html))
        .await
        .map_err(|e| {
            tracing::error!(target: "portfolio.handlers.readme", error = %e, "Highlight task failed");
            ServiceError::Internal
        })?;

    Ok(Html(highlighted))
}
