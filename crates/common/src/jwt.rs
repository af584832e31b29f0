//! JWT utilities shared by the portfolio crates.
//!
//! This module holds the parts of token handling that do not depend on a key
//! set:
//! - Size limits for DoS prevention
//! - Splitting a compact token into its three segments
//! - Lenient base64url decoding of segments
//! - Key ID extraction from the header
//! - `exp` / `nbf` time-window validation with a not-before tolerance
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Nothing here verifies a signature; callers must verify before trusting
//!   any decoded payload
//! - Error messages are generic to prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{split_token, validate_time_window_at, DEFAULT_NBF_TOLERANCE};
//!
//! let parts = split_token(token)?;
//! let kid = parts.kid()?;
//! // ... look up kid, verify parts.signing_input against parts.signature ...
//! validate_time_window_at(claims.exp, claims.nbf, DEFAULT_NBF_TOLERANCE, now)?;
//! ```

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Access assertions are typically around 1KB. Anything larger than this is
/// rejected BEFORE base64 decoding or signature verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default tolerance for the `nbf` (not-before) claim.
///
/// A token whose `nbf` lies up to this far in the future is still accepted,
/// which absorbs clock drift between the edge proxy and this host.
pub const DEFAULT_NBF_TOLERANCE: Duration = Duration::from_secs(60);

/// Maximum configurable clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Base64url engine that accepts segments with or without `=` padding.
///
/// Token segments are normally unpadded, but some issuers keep the padding.
pub const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while parsing or time-checking a JWT.
///
/// All variants render the same message so that callers cannot leak which
/// check failed. Detail is logged at debug level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token is not three non-empty segments, or a segment does not decode.
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token header has no usable `kid`.
    #[error("The access token is invalid or expired")]
    MissingKid,

    /// Current time is past the `exp` claim.
    #[error("The access token is invalid or expired")]
    Expired,

    /// The `nbf` claim lies beyond now plus the tolerance.
    #[error("The access token is invalid or expired")]
    NotYetValid,
}

// =============================================================================
// Token structure
// =============================================================================

/// JOSE header fields this crate cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenHeader {
    /// Signing algorithm declared by the issuer.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key ID used to select the verification key.
    #[serde(default)]
    pub kid: Option<String>,

    /// Token type, usually `JWT`.
    #[serde(default)]
    pub typ: Option<String>,
}

/// The three segments of a compact JWT, borrowed from the original string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenParts<'a> {
    /// Base64url header segment.
    pub header: &'a str,

    /// Base64url payload segment.
    pub payload: &'a str,

    /// Base64url signature segment.
    pub signature: &'a str,

    /// The literal `header.payload` text the signature covers.
    pub signing_input: &'a str,
}

impl TokenParts<'_> {
    /// Decode and parse the header segment.
    ///
    /// # Errors
    ///
    /// Returns `MalformedToken` if the segment is not base64url JSON.
    pub fn header(&self) -> Result<TokenHeader, JwtValidationError> {
        decode_json(self.header)
    }

    /// The header's `kid` (key ID), read without verifying the signature.
    ///
    /// The value must only be used to look up a key in a trusted key set.
    ///
    /// # Errors
    ///
    /// - `MalformedToken` if the header does not decode
    /// - `MissingKid` if the header has no `kid` or it is empty
    pub fn kid(&self) -> Result<String, JwtValidationError> {
        self.header()?
            .kid
            .filter(|kid| !kid.is_empty())
            .ok_or(JwtValidationError::MissingKid)
    }

    /// Decode and parse the payload segment into `T`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedToken` if the segment is not base64url JSON of shape `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, JwtValidationError> {
        decode_json(self.payload)
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Split a compact JWT into header, payload and signature.
///
/// # Errors
///
/// - `TokenTooLarge` if the token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` unless there are exactly three non-empty segments
pub fn split_token(token: &str) -> Result<TokenParts<'_>, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        tracing::debug!(
            target: "common.jwt",
            parts = token.split('.').count(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    };

    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        tracing::debug!(target: "common.jwt", "Token rejected: empty segment");
        return Err(JwtValidationError::MalformedToken);
    }

    let signing_input = token
        .get(..header.len() + 1 + payload.len())
        .ok_or(JwtValidationError::MalformedToken)?;

    Ok(TokenParts {
        header,
        payload,
        signature,
        signing_input,
    })
}

/// Decode a base64url segment, with or without padding.
///
/// # Errors
///
/// Returns `MalformedToken` if the segment is not valid base64url.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, JwtValidationError> {
    URL_SAFE_LENIENT.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT segment base64");
        JwtValidationError::MalformedToken
    })
}

fn decode_json<T: DeserializeOwned>(segment: &str) -> Result<T, JwtValidationError> {
    let bytes = decode_segment(segment)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT segment JSON");
        JwtValidationError::MalformedToken
    })
}

/// Deterministic time-window validation against an explicit `now`.
///
/// The two checks are independent:
/// - `now > exp` rejects (a token is still valid in its expiry second)
/// - `nbf > now + nbf_tolerance` rejects
///
/// # Errors
///
/// Returns `Expired` or `NotYetValid`.
pub fn validate_time_window_at(
    exp: i64,
    nbf: Option<i64>,
    nbf_tolerance: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    if now > exp {
        tracing::debug!(target: "common.jwt", exp = exp, now = now, "Token rejected: expired");
        return Err(JwtValidationError::Expired);
    }

    if let Some(nbf) = nbf {
        // Bounded by MAX_CLOCK_SKEW through configuration validation
        #[allow(clippy::cast_possible_wrap)]
        let tolerance_secs = nbf_tolerance.as_secs() as i64;
        let max_nbf = now.saturating_add(tolerance_secs);

        if nbf > max_nbf {
            tracing::debug!(
                target: "common.jwt",
                nbf = nbf,
                now = now,
                max_allowed = max_nbf,
                "Token rejected: nbf too far in the future"
            );
            return Err(JwtValidationError::NotYetValid);
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};

    fn header_segment(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json)
    }

    // -------------------------------------------------------------------------
    // split_token Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_split_token_three_segments() {
        let parts = split_token("aaa.bbb.ccc").unwrap();

        assert_eq!(parts.header, "aaa");
        assert_eq!(parts.payload, "bbb");
        assert_eq!(parts.signature, "ccc");
        assert_eq!(parts.signing_input, "aaa.bbb");
    }

    #[test]
    fn test_split_token_wrong_segment_count() {
        for token in ["", "single", "only.two", "too.many.parts.here"] {
            assert_eq!(
                split_token(token),
                Err(JwtValidationError::MalformedToken),
                "token {token:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_split_token_empty_segment() {
        for token in [".b.c", "a..c", "a.b.", ".."] {
            assert_eq!(
                split_token(token),
                Err(JwtValidationError::MalformedToken),
                "token {token:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_split_token_oversized() {
        let oversized = format!("{}.b.c", "a".repeat(MAX_JWT_SIZE_BYTES));
        assert_eq!(
            split_token(&oversized),
            Err(JwtValidationError::TokenTooLarge)
        );
    }

    #[test]
    fn test_split_token_at_size_limit() {
        let token = format!("{}.b.c", "a".repeat(MAX_JWT_SIZE_BYTES - 4));
        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);
        assert!(split_token(&token).is_ok());
    }

    // -------------------------------------------------------------------------
    // decode_segment Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_segment_accepts_padded_and_unpadded() {
        let data = b"{\"kid\":\"k\"}";
        let unpadded = URL_SAFE_NO_PAD.encode(data);
        let padded = URL_SAFE.encode(data);
        assert_ne!(unpadded, padded, "fixture should need padding");

        assert_eq!(decode_segment(&unpadded).unwrap(), data);
        assert_eq!(decode_segment(&padded).unwrap(), data);
    }

    #[test]
    fn test_decode_segment_uses_url_safe_alphabet() {
        // 0xfb 0xff encodes to "-_8" in the URL-safe alphabet ("+/8" in standard)
        assert_eq!(decode_segment("-_8").unwrap(), vec![0xfb, 0xff]);
        assert!(decode_segment("+/8").is_err());
    }

    // -------------------------------------------------------------------------
    // TokenParts::kid Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_kid_valid_token() {
        let header = header_segment(r#"{"alg":"RS256","kid":"test-key-01"}"#);
        let token = format!("{header}.payload.signature");

        assert_eq!(split_token(&token).unwrap().kid().unwrap(), "test-key-01");
    }

    #[test]
    fn test_kid_missing_kid() {
        let header = header_segment(r#"{"alg":"RS256","typ":"JWT"}"#);
        let token = format!("{header}.payload.signature");

        assert_eq!(split_token(&token).unwrap().kid(), Err(JwtValidationError::MissingKid));
    }

    #[test]
    fn test_kid_empty_kid() {
        let header = header_segment(r#"{"alg":"RS256","kid":""}"#);
        let token = format!("{header}.payload.signature");

        assert_eq!(split_token(&token).unwrap().kid(), Err(JwtValidationError::MissingKid));
    }

    #[test]
    fn test_kid_non_string_kid() {
        let header = header_segment(r#"{"alg":"RS256","kid":12345}"#);
        let token = format!("{header}.payload.signature");

        assert_eq!(split_token(&token).unwrap().kid(), Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_kid_invalid_base64() {
        assert_eq!(
            split_token("!!!invalid!!!.payload.signature").unwrap().kid(),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_kid_invalid_json() {
        let header = header_segment("not-json");
        let token = format!("{header}.payload.signature");

        assert_eq!(split_token(&token).unwrap().kid(), Err(JwtValidationError::MalformedToken));
    }

    // -------------------------------------------------------------------------
    // validate_time_window_at Tests
    // -------------------------------------------------------------------------

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_time_window_valid() {
        assert!(validate_time_window_at(NOW + 3600, Some(NOW), DEFAULT_NBF_TOLERANCE, NOW).is_ok());
    }

    #[test]
    fn test_time_window_without_nbf() {
        assert!(validate_time_window_at(NOW + 3600, None, DEFAULT_NBF_TOLERANCE, NOW).is_ok());
    }

    #[test]
    fn test_time_window_expired() {
        assert_eq!(
            validate_time_window_at(NOW - 100, Some(NOW - 200), DEFAULT_NBF_TOLERANCE, NOW),
            Err(JwtValidationError::Expired)
        );
    }

    #[test]
    fn test_time_window_exp_boundary() {
        // Still valid during the expiry second itself
        assert!(validate_time_window_at(NOW, None, DEFAULT_NBF_TOLERANCE, NOW).is_ok());
        assert_eq!(
            validate_time_window_at(NOW - 1, None, DEFAULT_NBF_TOLERANCE, NOW),
            Err(JwtValidationError::Expired)
        );
    }

    #[test]
    fn test_time_window_nbf_boundary() {
        // nbf == now + tolerance is the last accepted value
        assert!(
            validate_time_window_at(NOW + 3600, Some(NOW + 60), DEFAULT_NBF_TOLERANCE, NOW).is_ok()
        );

        // nbf == now + tolerance + 1 is the first rejected value
        assert_eq!(
            validate_time_window_at(NOW + 3600, Some(NOW + 61), DEFAULT_NBF_TOLERANCE, NOW),
            Err(JwtValidationError::NotYetValid)
        );
    }

    #[test]
    fn test_time_window_checks_are_independent() {
        // Expired AND not yet valid: the expiry check reports first, but either
        // failure alone is enough to reject.
        assert!(validate_time_window_at(NOW - 1, Some(NOW + 600), DEFAULT_NBF_TOLERANCE, NOW)
            .is_err());
        assert!(validate_time_window_at(NOW + 10, Some(NOW + 600), DEFAULT_NBF_TOLERANCE, NOW)
            .is_err());
    }

    #[test]
    fn test_time_window_zero_tolerance() {
        assert!(validate_time_window_at(NOW + 10, Some(NOW), Duration::ZERO, NOW).is_ok());
        assert_eq!(
            validate_time_window_at(NOW + 10, Some(NOW + 1), Duration::ZERO, NOW),
            Err(JwtValidationError::NotYetValid)
        );
    }

    #[test]
    fn test_constants() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
        assert_eq!(DEFAULT_NBF_TOLERANCE, Duration::from_secs(60));
        assert_eq!(MAX_CLOCK_SKEW, Duration::from_secs(600));
    }
}
