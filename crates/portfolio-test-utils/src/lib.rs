//! # Portfolio Test Utilities
//!
//! Shared test utilities for the portfolio service.
//!
//! This crate provides:
//! - Deterministic RSA fixtures (fixed keys for reproducible signatures)
//! - Claims builder (`TestTokenBuilder`)
//! - Server test harness (`TestPortfolioServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use portfolio_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let keypair = TestKeypair::new(KEYPAIR_ALPHA, "key-1");
//!     let token = keypair.sign(&TestTokenBuilder::new().with_email("a@b.c").build());
//!
//!     let server = TestPortfolioServer::spawn(HashMap::new()).await?;
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
