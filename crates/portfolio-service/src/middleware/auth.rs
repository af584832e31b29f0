//! Access middleware for private routes.
//!
//! Reads the `cf-access-jwt-assertion` header, verifies it with the
//! [`TokenVerifier`], and stores the verified claims in request extensions.

use crate::auth::{Claims, TokenVerifier};
use crate::errors::ServiceError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the access middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Verifier with its key cache.
    pub verifier: Arc<TokenVerifier>,
}

/// Reject requests without a valid Access assertion.
///
/// # Response
///
/// - 401 with plain-text `Unauthorized` if the header is missing or the
///   assertion does not verify (including when the key set is unreachable)
/// - Otherwise continues with the claims in request extensions
#[instrument(skip_all, name = "portfolio.middleware.auth")]
pub async fn require_access(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let claims = state
        .verifier
        .authenticate(req.headers())
        .await
        .ok_or_else(|| {
            tracing::debug!(target: "portfolio.middleware.auth", path = %req.uri().path(), "Access denied");
            ServiceError::Unauthorized
        })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extension trait for extracting claims from request.
pub trait ClaimsExt {
    /// Get the verified claims from request extensions.
    ///
    /// Returns `None` if the access middleware was not applied to this request.
    fn claims(&self) -> Option<&Claims>;
}

impl<B> ClaimsExt for axum::extract::Request<B> {
    fn claims(&self) -> Option<&Claims> {
        self.extensions().get::<Claims>()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::{JwksClient, ACCESS_JWT_HEADER};
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use portfolio_test_utils::{TestKeypair, TestTokenBuilder, KEYPAIR_ALPHA};
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_auth_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AuthState>();
    }

    async fn protected_app(server: &MockServer) -> Router {
        let jwks = JwksClient::new(format!("{}/cdn-cgi/access/certs", server.uri()));
        let verifier = Arc::new(TokenVerifier::new(Arc::new(jwks), Duration::from_secs(60)));
        let state = Arc::new(AuthState { verifier });

        async fn whoami(req: Request) -> String {
            req.claims()
                .and_then(|claims| claims.email.clone())
                .unwrap_or_default()
        }

        Router::new()
            .route("/private", get(whoami))
            .route_layer(middleware::from_fn_with_state(state, require_access))
    }

    #[tokio::test]
    async fn test_valid_assertion_passes_claims_through() {
        let keypair = TestKeypair::new(KEYPAIR_ALPHA, "k1");
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cdn-cgi/access/certs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(keypair.jwks_json()))
            .mount(&server)
            .await;

        let token = keypair.sign(&TestTokenBuilder::new().with_email("me@dcln.me").build());
        let request = axum::http::Request::builder()
            .uri("/private")
            .header(ACCESS_JWT_HEADER, token)
            .body(Body::empty())
            .unwrap();

        let response = protected_app(&server).await.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(&body[..], b"me@dcln.me");
    }

    #[tokio::test]
    async fn test_missing_assertion_is_unauthorized() {
        let server = MockServer::start().await;
        let request = axum::http::Request::builder()
            .uri("/private")
            .body(Body::empty())
            .unwrap();

        let response = protected_app(&server).await.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
