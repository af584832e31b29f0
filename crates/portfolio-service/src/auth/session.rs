//! Session view over verified claims.

use crate::auth::claims::Claims;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Authenticated visitor derived from a verified access assertion.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Email the visitor authenticated with.
    pub email: String,

    /// Avatar URL, when the identity provider supplies one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// When the assertion was issued.
    pub issued_at: DateTime<Utc>,

    /// When the assertion stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from verified claims.
    ///
    /// Returns `None` when the claims carry no email (service tokens), no
    /// `iat`, or a timestamp outside chrono's representable range.
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        let email = claims.email.clone()?;
        let issued_at = DateTime::from_timestamp(claims.iat?, 0)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)?;

        Some(Self {
            email,
            picture: claims.picture.clone(),
            issued_at,
            expires_at,
        })
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("email", &"[REDACTED]")
            .field("picture", &self.picture)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
