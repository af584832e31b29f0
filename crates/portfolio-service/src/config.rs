//! Portfolio service configuration.
//!
//! Configuration is loaded from environment variables. The GitHub token is
//! held as a secret and redacted in Debug output.

use common::jwt::{DEFAULT_NBF_TOLERANCE, MAX_CLOCK_SKEW};
use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default Cloudflare Access team domain.
pub const DEFAULT_CF_ACCESS_TEAM_DOMAIN: &str = "https://dcln-me.cloudflareaccess.com";

/// Default JWKS cache TTL in seconds (1 hour).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 3600;

/// Default GitHub REST API base URL.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Default User-Agent sent to the GitHub API.
pub const DEFAULT_GITHUB_USER_AGENT: &str = "dcln-portfolio";

/// Path of the certs endpoint under the Access team domain.
const CF_ACCESS_CERTS_PATH: &str = "/cdn-cgi/access/certs";

/// Portfolio service configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Cloudflare Access team domain, without trailing slash.
    pub cf_access_team_domain: String,

    /// How long a fetched key set stays fresh.
    pub jwks_cache_ttl_seconds: u64,

    /// Allowed clock skew for the `nbf` claim, in seconds.
    pub jwt_nbf_tolerance_seconds: u64,

    /// GitHub REST API base URL, without trailing slash.
    pub github_api_url: String,

    /// User-Agent header for GitHub requests.
    pub github_user_agent: String,

    /// Optional GitHub token for higher API rate limits.
    pub github_token: Option<SecretString>,

    /// Location of the private resume PDF. Unset serves a placeholder.
    pub resume_path: Option<PathBuf>,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("cf_access_team_domain", &self.cf_access_team_domain)
            .field("jwks_cache_ttl_seconds", &self.jwks_cache_ttl_seconds)
            .field("jwt_nbf_tolerance_seconds", &self.jwt_nbf_tolerance_seconds)
            .field("github_api_url", &self.github_api_url)
            .field("github_user_agent", &self.github_user_agent)
            .field(
                "github_token",
                &self.github_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("resume_path", &self.resume_path)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JWKS cache TTL configuration: {0}")]
    InvalidJwksCacheTtl(String),

    #[error("Invalid JWT nbf tolerance configuration: {0}")]
    InvalidNbfTolerance(String),

    #[error("Invalid GitHub configuration: {0}")]
    InvalidGitHub(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let cf_access_team_domain = vars
            .get("CF_ACCESS_TEAM_DOMAIN")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_CF_ACCESS_TEAM_DOMAIN.to_string());

        let jwks_cache_ttl_seconds = if let Some(value_str) = vars.get("JWKS_CACHE_TTL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwksCacheTtl(format!(
                    "JWKS_CACHE_TTL_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidJwksCacheTtl(
                    "JWKS_CACHE_TTL_SECONDS must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_JWKS_CACHE_TTL_SECONDS
        };

        let jwt_nbf_tolerance_seconds =
            if let Some(value_str) = vars.get("JWT_NBF_TOLERANCE_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidNbfTolerance(format!(
                        "JWT_NBF_TOLERANCE_SECONDS must be a valid non-negative integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value > MAX_CLOCK_SKEW.as_secs() {
                    return Err(ConfigError::InvalidNbfTolerance(format!(
                        "JWT_NBF_TOLERANCE_SECONDS must not exceed {} seconds, got {}",
                        MAX_CLOCK_SKEW.as_secs(),
                        value
                    )));
                }

                value
            } else {
                DEFAULT_NBF_TOLERANCE.as_secs()
            };

        let github_api_url = vars
            .get("GITHUB_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string());

        let github_user_agent = vars
            .get("GITHUB_USER_AGENT")
            .cloned()
            .unwrap_or_else(|| DEFAULT_GITHUB_USER_AGENT.to_string());

        if github_user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidGitHub(
                "GITHUB_USER_AGENT must not be empty".to_string(),
            ));
        }

        let github_token = vars
            .get("GITHUB_TOKEN")
            .filter(|s| !s.is_empty())
            .map(|s| SecretString::from(s.clone()));

        let resume_path = vars
            .get("RESUME_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(Config {
            bind_address,
            cf_access_team_domain,
            jwks_cache_ttl_seconds,
            jwt_nbf_tolerance_seconds,
            github_api_url,
            github_user_agent,
            github_token,
            resume_path,
        })
    }

    /// URL of the Access certs (JWKS) endpoint for the team domain.
    pub fn certs_url(&self) -> String {
        format!("{}{}", self.cf_access_team_domain, CF_ACCESS_CERTS_PATH)
    }
}
