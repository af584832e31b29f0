//! Builder patterns for test data construction
//!
//! Provides a fluent API for Cloudflare Access assertion claims.

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Default issuer used by test claims.
pub const TEST_ISSUER: &str = "https://dcln-me.cloudflareaccess.com";

/// Default email used by test claims.
pub const TEST_EMAIL: &str = "visitor@dcln.me";

/// Builder for Access assertion claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .with_email("alice@example.com")
///     .expires_in(3600)
///     .build();
/// let token = keypair.sign(&claims);
/// ```
pub struct TestTokenBuilder {
    iss: String,
    sub: String,
    aud: Vec<String>,
    email: Option<String>,
    picture: Option<String>,
    iat: i64,
    nbf: Option<i64>,
    exp: i64,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new builder: valid for one hour from now, no `nbf`.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            iss: TEST_ISSUER.to_string(),
            sub: "test-subject".to_string(),
            aud: vec!["test-audience".to_string()],
            email: Some(TEST_EMAIL.to_string()),
            picture: None,
            iat: now.timestamp(),
            nbf: None,
            exp: (now + Duration::seconds(3600)).timestamp(),
            extra: Map::new(),
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Drop the email claim (service-token style assertion).
    pub fn without_email(mut self) -> Self {
        self.email = None;
        self
    }

    pub fn with_picture(mut self, url: &str) -> Self {
        self.picture = Some(url.to_string());
        self
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set the absolute expiration timestamp
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.exp = timestamp;
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Set not-before in seconds from now
    pub fn not_before_in(mut self, seconds: i64) -> Self {
        self.nbf = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Set the absolute not-before timestamp
    pub fn not_before(mut self, timestamp: i64) -> Self {
        self.nbf = Some(timestamp);
        self
    }

    /// Add an arbitrary extra claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = json!({
            "iss": self.iss,
            "sub": self.sub,
            "aud": self.aud,
            "iat": self.iat,
            "exp": self.exp,
        });

        if let Some(object) = claims.as_object_mut() {
            if let Some(email) = self.email {
                object.insert("email".to_string(), json!(email));
            }
            if let Some(picture) = self.picture {
                object.insert("picture".to_string(), json!(picture));
            }
            if let Some(nbf) = self.nbf {
                object.insert("nbf".to_string(), json!(nbf));
            }
            object.extend(self.extra);
        }

        claims
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
