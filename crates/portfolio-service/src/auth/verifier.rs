//! Cloudflare Access assertion verification.
//!
//! An assertion is accepted only if:
//! - it is at most `MAX_JWT_SIZE_BYTES` and has three non-empty segments
//! - the header decodes and names a `kid` present in the current key set
//! - the RS256 signature over `header.payload` verifies under that key
//! - `exp` is not in the past and `nbf` is not beyond now + tolerance
//!
//! The header `alg` is never consulted; every key in the set is an RSA key and
//! is only ever used with RS256.
//!
//! Failure causes are logged here and collapsed to `None` / `false` at the
//! public boundary. Request headers are the only input from the outside world,
//! so the helpers that read them never fetch keys when the header is absent.

use crate::auth::claims::Claims;
use crate::auth::jwks::{JwksClient, JwksError};
use crate::auth::session::Session;
use crate::config::Config;
use crate::observability::metrics;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use common::jwt::{split_token, validate_time_window_at, JwtValidationError};
use jsonwebtoken::Algorithm;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// Header carrying the Access assertion.
pub const ACCESS_JWT_HEADER: &str = "cf-access-jwt-assertion";

/// Why an assertion was not accepted.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The key set could not be fetched; says nothing about the token.
    #[error("Access key set unavailable")]
    KeySetUnavailable(#[source] JwksError),

    /// The token failed a structural, signature, or time check.
    #[error("The access token is invalid or expired")]
    InvalidToken { reason: &'static str },
}

impl AuthError {
    fn invalid(reason: &'static str) -> Self {
        AuthError::InvalidToken { reason }
    }

    /// Bounded metric label for this outcome.
    fn metric_label(&self) -> &'static str {
        match self {
            AuthError::KeySetUnavailable(_) => "unavailable",
            AuthError::InvalidToken { .. } => "invalid",
        }
    }
}

impl From<JwtValidationError> for AuthError {
    fn from(err: JwtValidationError) -> Self {
        let reason = match err {
            JwtValidationError::TokenTooLarge => "token too large",
            JwtValidationError::MalformedToken => "malformed token",
            JwtValidationError::MissingKid => "missing kid",
            JwtValidationError::Expired => "expired",
            JwtValidationError::NotYetValid => "not yet valid",
        };
        AuthError::invalid(reason)
    }
}

/// Verifies Access assertions against the team's public key set.
pub struct TokenVerifier {
    jwks: Arc<JwksClient>,
    nbf_tolerance: Duration,
}

impl TokenVerifier {
    pub fn new(jwks: Arc<JwksClient>, nbf_tolerance: Duration) -> Self {
        Self {
            jwks,
            nbf_tolerance,
        }
    }

    /// Build a verifier with its own key cache from configuration.
    pub fn from_config(config: &Config) -> Self {
        let jwks = JwksClient::with_ttl(
            config.certs_url(),
            Duration::from_secs(config.jwks_cache_ttl_seconds),
        );
        Self::new(
            Arc::new(jwks),
            Duration::from_secs(config.jwt_nbf_tolerance_seconds),
        )
    }

    /// Key cache shared with this verifier.
    pub fn jwks(&self) -> &Arc<JwksClient> {
        &self.jwks
    }

    /// Verify an assertion against the current time.
    pub async fn verify_token(&self, token: &str) -> Option<Claims> {
        self.verify_token_at(token, Utc::now()).await
    }

    /// Verify an assertion as of `now`.
    ///
    /// Returns the decoded claims unchanged on success.
    #[instrument(skip_all)]
    pub async fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Option<Claims> {
        match self.try_verify_at(token, now).await {
            Ok(claims) => {
                metrics::record_token_verification("valid");
                Some(claims)
            }
            Err(err) => {
                metrics::record_token_verification(err.metric_label());
                match &err {
                    AuthError::KeySetUnavailable(source) => {
                        tracing::warn!(
                            target: "portfolio.auth.verifier",
                            error = %source,
                            "Access assertion not verifiable: key set unavailable"
                        );
                    }
                    AuthError::InvalidToken { reason } => {
                        tracing::debug!(
                            target: "portfolio.auth.verifier",
                            reason = %reason,
                            "Access assertion rejected"
                        );
                    }
                }
                None
            }
        }
    }

    /// Full verification with the failure cause preserved.
    ///
    /// # Errors
    ///
    /// - `AuthError::KeySetUnavailable` if the key set cannot be fetched
    /// - `AuthError::InvalidToken` for every other rejection
    pub async fn try_verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Claims, AuthError> {
        let parts = split_token(token)?;

        let kid = parts.kid()?;

        let keys = self
            .jwks
            .keys(now)
            .await
            .map_err(AuthError::KeySetUnavailable)?;

        let key = keys
            .get(&kid)
            .ok_or_else(|| AuthError::invalid("unknown kid"))?;

        // Padding on the signature segment is tolerated; the signing input is
        // used exactly as received.
        let signature = parts.signature.trim_end_matches('=');
        let verified = jsonwebtoken::crypto::verify(
            signature,
            parts.signing_input.as_bytes(),
            key,
            Algorithm::RS256,
        )
        .map_err(|_| AuthError::invalid("signature undecodable"))?;

        if !verified {
            return Err(AuthError::invalid("signature mismatch"));
        }

        let claims: Claims = parts.payload()?;

        validate_time_window_at(claims.exp, claims.nbf, self.nbf_tolerance, now.timestamp())?;

        Ok(claims)
    }

    /// Whether the request carries a currently valid assertion.
    pub async fn is_request_authenticated(&self, headers: &HeaderMap) -> bool {
        self.authenticate(headers).await.is_some()
    }

    /// Email of the authenticated visitor, if any.
    pub async fn extract_email(&self, headers: &HeaderMap) -> Option<String> {
        self.authenticate(headers).await?.email
    }

    /// Session view of the authenticated visitor, if any.
    pub async fn extract_session(&self, headers: &HeaderMap) -> Option<Session> {
        let claims = self.authenticate(headers).await?;
        Session::from_claims(&claims)
    }

    /// Verified claims of the request's assertion, if any.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Option<Claims> {
        let token = assertion_from_headers(headers)?;
        self.verify_token(token).await
    }
}

/// Non-empty assertion header value.
///
/// Absent headers and values that are not visible ASCII read as `None`.
pub fn assertion_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ACCESS_JWT_HEADER)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
