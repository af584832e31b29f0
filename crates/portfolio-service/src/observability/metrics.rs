//! Metrics definitions for the portfolio service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `portfolio_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: HTTP methods
//! - `endpoint`: the fixed route table, everything else is `/other`
//! - `status`: success, error, timeout
//! - `result`: valid, invalid, unavailable
//! - `language`: supported, plaintext (never the raw language id)

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("portfolio_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `portfolio_http_requests_total`, `portfolio_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// This captures ALL HTTP responses including framework-level 404/405s.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("portfolio_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("portfolio_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto the fixed route table.
///
/// Query strings are never part of `path`, so `/v1/readme?repo=...` is
/// already reduced to `/v1/readme` by the caller.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/private/download/resume" => "/private/download/resume",
        "/private/session" => "/private/session",
        "/v1/readme" => "/v1/readme",
        _ => "/other",
    }
}

// ============================================================================
// Access Token Metrics
// ============================================================================

/// Record the outcome of one access token verification.
///
/// Metric: `portfolio_token_verifications_total`
/// Labels: `result` ("valid", "invalid", "unavailable")
///
/// "unavailable" means the key set could not be fetched, which is an
/// operational problem rather than a bad credential.
pub fn record_token_verification(result: &str) {
    counter!("portfolio_token_verifications_total",
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record a key set refresh attempt.
///
/// Metric: `portfolio_jwks_refresh_total`
/// Labels: `status` ("success", "error")
pub fn record_jwks_refresh(status: &str) {
    counter!("portfolio_jwks_refresh_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// README Metrics
// ============================================================================

/// Record a GitHub README fetch.
///
/// Metric: `portfolio_readme_fetch_total`
/// Labels: `status` ("success", "not_found", "error", "invalid_url")
pub fn record_readme_fetch(status: &str) {
    counter!("portfolio_readme_fetch_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record one highlighted code block.
///
/// Metric: `portfolio_code_blocks_highlighted_total`
/// Labels: `language` ("supported", "plaintext")
pub fn record_code_block_highlighted(language: &str) {
    counter!("portfolio_code_blocks_highlighted_total",
        "language" => language.to_string()
    )
    .increment(1);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use metrics_util::MetricKind;

    /// Sum of all counter values named `name` carrying `label=value`.
    fn counter_value(
        snapshot: &[(
            metrics_util::CompositeKey,
            Option<metrics::Unit>,
            Option<metrics::SharedString>,
            DebugValue,
        )],
        name: &str,
        label: (&str, &str),
    ) -> u64 {
        snapshot
            .iter()
            .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter)
            .filter(|(key, _, _, _)| key.key().name() == name)
            .filter(|(key, _, _, _)| {
                key.key()
                    .labels()
                    .any(|l| l.key() == label.0 && l.value() == label.1)
            })
            .map(|(_, _, _, value)| match value {
                DebugValue::Counter(v) => *v,
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, Duration::from_millis(5));
        record_http_request("GET", "/private/session", 401, Duration::from_millis(10));
        record_http_request("GET", "/v1/readme", 404, Duration::from_millis(150));
        record_http_request("GET", "/private/download/resume", 504, Duration::from_secs(30));
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(204), "success");
        assert_eq!(categorize_status_code(299), "success");

        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");

        assert_eq!(categorize_status_code(401), "error");
        assert_eq!(categorize_status_code(404), "error");
        assert_eq!(categorize_status_code(500), "error");
    }

    #[test]
    fn test_normalize_endpoint_known_paths() {
        assert_eq!(normalize_endpoint("/"), "/");
        assert_eq!(normalize_endpoint("/health"), "/health");
        assert_eq!(normalize_endpoint("/ready"), "/ready");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
        assert_eq!(
            normalize_endpoint("/private/download/resume"),
            "/private/download/resume"
        );
        assert_eq!(normalize_endpoint("/private/session"), "/private/session");
        assert_eq!(normalize_endpoint("/v1/readme"), "/v1/readme");
    }

    #[test]
    fn test_normalize_endpoint_unknown_paths() {
        assert_eq!(normalize_endpoint("/private"), "/other");
        assert_eq!(normalize_endpoint("/private/download/resume/x"), "/other");
        assert_eq!(normalize_endpoint("/wp-login.php"), "/other");
    }

    #[test]
    fn test_token_verification_counter_labels() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_token_verification("valid");
            record_token_verification("invalid");
            record_token_verification("invalid");
            record_token_verification("unavailable");
        });

        let snapshot = snapshotter.snapshot().into_vec();
        assert_eq!(
            counter_value(
                &snapshot,
                "portfolio_token_verifications_total",
                ("result", "invalid")
            ),
            2
        );
        assert_eq!(
            counter_value(
                &snapshot,
                "portfolio_token_verifications_total",
                ("result", "unavailable")
            ),
            1
        );
    }

    #[test]
    fn test_service_counters_are_recorded() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_jwks_refresh("success");
            record_readme_fetch("not_found");
            record_code_block_highlighted("supported");
            record_code_block_highlighted("plaintext");
        });

        let snapshot = snapshotter.snapshot().into_vec();
        assert_eq!(
            counter_value(
                &snapshot,
                "portfolio_jwks_refresh_total",
                ("status", "success")
            ),
            1
        );
        assert_eq!(
            counter_value(
                &snapshot,
                "portfolio_readme_fetch_total",
                ("status", "not_found")
            ),
            1
        );
        assert_eq!(
            counter_value(
                &snapshot,
                "portfolio_code_blocks_highlighted_total",
                ("language", "plaintext")
            ),
            1
        );
    }
}
