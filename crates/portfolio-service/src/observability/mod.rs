//! Observability module for the portfolio service.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
