//! Middleware for the portfolio service.
//!
//! # Components
//!
//! - `auth` - Access assertion check for private routes
//! - `http_metrics` - HTTP request metrics for every response

pub mod auth;
pub mod http_metrics;

pub use auth::{require_access, AuthState, ClaimsExt};
pub use http_metrics::http_metrics_middleware;
