//! Service layer for the portfolio service.
//!
//! # Components
//!
//! - `github` - README retrieval from the GitHub REST API

pub mod github;

pub use github::{parse_repo_url, render_readme, GitHubClient, RepoRef};
