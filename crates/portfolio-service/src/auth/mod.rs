//! Authentication module for the portfolio service.
//!
//! Verifies the assertion Cloudflare Access attaches to every request that
//! passed its login, using the team's published RSA keys.
//!
//! # Components
//!
//! - `jwks` - client for fetching and caching the team's certs
//! - `verifier` - assertion verification and request helpers
//! - `claims` - claims carried by a verified assertion
//! - `session` - visitor view derived from verified claims

pub mod claims;
pub mod jwks;
pub mod session;
pub mod verifier;

pub use claims::Claims;
pub use jwks::{JwksClient, KeySet};
pub use session::Session;
pub use verifier::{AuthError, TokenVerifier, ACCESS_JWT_HEADER};
