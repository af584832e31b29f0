//! Shared building blocks for the portfolio crates.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (segment parsing, kid extraction, time windows)
pub mod jwt;
