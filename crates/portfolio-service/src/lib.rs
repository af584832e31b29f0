//! Portfolio Service Library
//!
//! Server-side core of the dcln.me portfolio:
//!
//! - Verification of Cloudflare Access assertions for private routes
//! - Syntax highlighting of code blocks in GitHub README HTML
//! - README retrieval from the GitHub REST API
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/*.rs -> handlers/*.rs -> services/*.rs, auth/*.rs, highlight/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Access assertion verification and key caching
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `highlight` - README code block highlighting
//! - `middleware` - Access and metrics middleware
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup
//! - `services` - GitHub client

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod highlight;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod services;
