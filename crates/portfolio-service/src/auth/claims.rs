//! Access assertion claims.
//!
//! Contains the claims carried by a verified Cloudflare Access assertion.
//! `sub` and `email` identify a person and are redacted in Debug output.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The `aud` claim, which issuers send either as a string or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

/// Claims of a verified access assertion.
///
/// Returned exactly as decoded: absent claims stay absent when serialized
/// again, and claims this struct does not name are kept in `extra`. Only
/// `exp` is required.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer (the Access team domain).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject (user identifier) - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience tag(s) of the protected application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Authenticated email address - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Avatar URL supplied by some identity providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Any further claims, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("iss", &self.iss)
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("aud", &self.aud)
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("picture", &self.picture)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("exp", &self.exp)
            .field("extra_claims", &self.extra.len())
            .finish()
    }
}
