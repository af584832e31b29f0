//! JWKS client for fetching and caching Cloudflare Access public keys.
//!
//! The client fetches the team's certs endpoint
//! (`{team_domain}/cdn-cgi/access/certs`), imports every RSA key that carries
//! a key ID, and caches the resulting [`KeySet`] for a fixed TTL measured from
//! the fetch time.
//!
//! # Consistency
//!
//! - The cached set is replaced as a whole (`Arc` swap under a write lock);
//!   readers see either the previous or the new set, never a partial one
//! - Concurrent refreshes are not coalesced; the last writer wins
//! - Time is passed in explicitly so callers and tests control staleness

use crate::observability::metrics;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::instrument;

/// Default cache TTL (1 hour).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// HTTP timeout for the certs request.
const JWKS_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Errors raised while refreshing the key set.
#[derive(Debug, Error)]
pub enum JwksError {
    /// Transport failure talking to the certs endpoint.
    #[error("JWKS request failed: {0}")]
    Request(String),

    /// The certs endpoint answered with a non-success status.
    #[error("JWKS endpoint returned status {0}")]
    Status(u16),

    /// The body was not a JWKS document.
    #[error("JWKS response could not be parsed: {0}")]
    Parse(String),
}

/// JSON Web Key from the certs endpoint.
///
/// Only the fields needed to import RSA verification keys are modelled;
/// everything else in the document is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for Access signing keys).
    #[serde(default)]
    pub kty: Option<String>,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm hint (usually "RS256").
    #[serde(default)]
    pub alg: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// Imported verification keys indexed by key ID.
#[derive(Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, DecodingKey>,
}

impl KeySet {
    /// Import the RSA keys of a JWKS document.
    ///
    /// Keys that are not RSA, lack a `kid`, or lack usable `n`/`e` components
    /// are skipped.
    pub fn from_jwks(jwks: &JwksResponse) -> Self {
        let mut keys = HashMap::new();

        for jwk in &jwks.keys {
            if jwk.kty.as_deref() != Some("RSA") {
                tracing::debug!(target: "portfolio.auth.jwks", kty = ?jwk.kty, "Skipping non-RSA key");
                continue;
            }

            let Some(kid) = jwk.kid.as_deref().filter(|kid| !kid.is_empty()) else {
                tracing::debug!(target: "portfolio.auth.jwks", "Skipping RSA key without kid");
                continue;
            };

            let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                tracing::warn!(target: "portfolio.auth.jwks", kid = %kid, "RSA key missing modulus or exponent");
                continue;
            };

            match DecodingKey::from_rsa_components(n, e) {
                Ok(key) => {
                    keys.insert(kid.to_string(), key);
                }
                Err(err) => {
                    tracing::warn!(target: "portfolio.auth.jwks", kid = %kid, error = %err, "Failed to import RSA key");
                }
            }
        }

        Self { keys }
    }

    /// Look up a key by ID.
    pub fn get(&self, kid: &str) -> Option<&DecodingKey> {
        self.keys.get(kid)
    }

    /// Whether a key with this ID exists.
    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    /// Number of imported keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys were imported.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Imported key IDs, sorted.
    pub fn kids(&self) -> Vec<&str> {
        let mut kids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        kids.sort_unstable();
        kids
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet").field("kids", &self.kids()).finish()
    }
}

/// Cached key set with expiry time.
struct CachedKeys {
    keys: Arc<KeySet>,
    expires_at: DateTime<Utc>,
}

/// JWKS client for fetching and caching public keys.
pub struct JwksClient {
    /// URL of the certs endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Cached key set.
    cache: RwLock<Option<CachedKeys>>,

    /// Cache TTL duration.
    cache_ttl: ChronoDuration,
}

impl JwksClient {
    /// Create a new JWKS client with the default 1 hour TTL.
    pub fn new(jwks_url: String) -> Self {
        Self::with_ttl(jwks_url, DEFAULT_CACHE_TTL)
    }

    /// Create a new JWKS client with custom cache TTL.
    pub fn with_ttl(jwks_url: String, cache_ttl: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(JWKS_REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "portfolio.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        let cache_ttl = ChronoDuration::from_std(cache_ttl).unwrap_or_else(|_| {
            tracing::warn!(target: "portfolio.auth.jwks", "JWKS cache TTL out of range, using default");
            ChronoDuration::seconds(3600)
        });

        Self {
            jwks_url,
            http_client,
            cache: RwLock::new(None),
            cache_ttl,
        }
    }

    /// URL of the certs endpoint.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Return the cached key set if it is still fresh at `now`.
    pub async fn get(&self, now: DateTime<Utc>) -> Option<Arc<KeySet>> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|cached| now < cached.expires_at)
            .map(|cached| Arc::clone(&cached.keys))
    }

    /// Return a fresh key set, fetching one if the cache is empty or stale.
    ///
    /// # Errors
    ///
    /// Propagates [`JwksError`] from [`JwksClient::refresh`].
    pub async fn keys(&self, now: DateTime<Utc>) -> Result<Arc<KeySet>, JwksError> {
        if let Some(keys) = self.get(now).await {
            tracing::debug!(target: "portfolio.auth.jwks", "JWKS cache hit");
            return Ok(keys);
        }

        self.refresh(now).await
    }

    /// Fetch the certs endpoint and replace the cached key set.
    ///
    /// The new set expires at `now + ttl`.
    ///
    /// # Errors
    ///
    /// - `JwksError::Request` on transport failure
    /// - `JwksError::Status` on a non-success response
    /// - `JwksError::Parse` if the body is not a JWKS document
    #[instrument(skip(self, now), fields(url = %self.jwks_url))]
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<Arc<KeySet>, JwksError> {
        let result = self.fetch().await;
        metrics::record_jwks_refresh(if result.is_ok() { "success" } else { "error" });
        let jwks = result?;

        let keys = Arc::new(KeySet::from_jwks(&jwks));

        tracing::info!(
            target: "portfolio.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeys {
            keys: Arc::clone(&keys),
            expires_at: now + self.cache_ttl,
        });

        Ok(keys)
    }

    async fn fetch(&self) -> Result<JwksResponse, JwksError> {
        tracing::debug!(target: "portfolio.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "portfolio.auth.jwks", error = %e, "Failed to fetch JWKS");
                JwksError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "portfolio.auth.jwks",
                status = %status,
                "JWKS endpoint returned error"
            );
            return Err(JwksError::Status(status.as_u16()));
        }

        response.json().await.map_err(|e| {
            tracing::error!(target: "portfolio.auth.jwks", error = %e, "Failed to parse JWKS response");
            JwksError::Parse(e.to_string())
        })
    }

    /// Drop the cached key set.
    #[cfg(test)]
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}
