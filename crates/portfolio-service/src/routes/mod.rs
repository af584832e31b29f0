//! HTTP routes for the portfolio service.
//!
//! Defines the Axum router and application state.

use crate::auth::TokenVerifier;
use crate::config::Config;
use crate::handlers;
use crate::highlight::Highlighter;
use crate::middleware::{http_metrics_middleware, require_access, AuthState};
use crate::services::GitHubClient;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Access assertion verifier (owns the key cache).
    pub verifier: Arc<TokenVerifier>,

    /// GitHub REST API client.
    pub github: GitHubClient,

    /// Code block highlighter, shared with blocking tasks.
    pub highlighter: Arc<Highlighter>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/ready` - Readiness probe (Access key set reachable) - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/v1/readme?repo=<url>` - Highlighted README HTML - public
/// - `/private/download/resume` - Resume download - requires Access
/// - `/private/session` - Visitor session - requires Access
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        verifier: Arc::clone(&state.verifier),
    });

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/v1/readme", get(handlers::get_readme))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Private routes (Access assertion required)
    let private_routes = Router::new()
        .route("/private/download/resume", get(handlers::download_resume))
        .route("/private/session", get(handlers::get_session))
        .route_layer(middleware::from_fn_with_state(auth_state, require_access))
        .with_state(state);

    // Layers wrap outward in the order applied:
    // 1. TraceLayer - Log request details (innermost)
    // 2. TimeoutLayer - Timeout the request
    // 3. http_metrics_middleware - Record ALL responses, timeouts included (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(private_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_config_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Config>();
    }
}
