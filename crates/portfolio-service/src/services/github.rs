//! GitHub README retrieval.
//!
//! READMEs are requested with the `application/vnd.github.html` media type so
//! GitHub returns the already-rendered HTML; the only post-processing done
//! here is code block highlighting.
//!
//! Any failure (bad URL, non-success status, network error) yields `None` and
//! a warning in the logs. A missing README is not an error for callers.

use crate::config::Config;
use crate::errors::ServiceError;
use crate::highlight::Highlighter;
use crate::observability::metrics;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::time::Duration;
use tracing::{error, instrument, warn};

/// Timeout for GitHub API requests in seconds.
const GITHUB_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Media type for pre-rendered README HTML.
pub const GITHUB_HTML_MEDIA_TYPE: &str = "application/vnd.github.html";

/// Owner and name of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Parse a repository URL such as `https://github.com/owner/repo`.
///
/// Accepts `http`/`https`, `github.com` or `www.github.com`, a trailing
/// `.git`, and extra path segments (`/tree/main/...`). Returns `None` for
/// anything else.
pub fn parse_repo_url(url: &str) -> Option<RepoRef> {
    let parsed = Url::parse(url.trim()).ok()?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let host = parsed.host_str()?.to_ascii_lowercase();
    if host != "github.com" && host != "www.github.com" {
        return None;
    }

    let mut segments = parsed.path_segments()?;
    let owner = segments.next().filter(|s| !s.is_empty())?;
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return None;
    }

    Some(RepoRef {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

/// HTTP client for the GitHub REST API.
#[derive(Clone)]
pub struct GitHubClient {
    /// HTTP client with configured timeouts.
    client: Client,

    /// API base URL without trailing slash.
    api_base: String,

    /// Sent as `User-Agent`; GitHub rejects requests without one.
    user_agent: String,

    /// Optional token for the higher authenticated rate limit.
    token: Option<SecretString>,
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_base", &self.api_base)
            .field("user_agent", &self.user_agent)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl GitHubClient {
    /// Create a new GitHub client.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Internal` if the HTTP client cannot be built.
    pub fn new(
        api_base: String,
        user_agent: String,
        token: Option<SecretString>,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(GITHUB_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                error!(target: "portfolio.services.github", error = %e, "Failed to build HTTP client");
                ServiceError::Internal
            })?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            user_agent,
            token,
        })
    }

    /// Create a client from service configuration.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Internal` if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        Self::new(
            config.github_api_url.clone(),
            config.github_user_agent.clone(),
            config.github_token.clone(),
        )
    }

    /// API URL of a repository's README.
    pub fn readme_api_url(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}/readme", self.api_base, repo.owner, repo.repo)
    }

    /// Fetch a repository's README as rendered HTML.
    ///
    /// Returns `None` if the URL is not a GitHub repository URL or the README
    /// cannot be retrieved.
    #[instrument(skip_all, fields(repo_url = %repo_url))]
    pub async fn fetch_readme_html(&self, repo_url: &str) -> Option<String> {
        let Some(repo) = parse_repo_url(repo_url) else {
            warn!(target: "portfolio.services.github", "Not a GitHub repository URL");
            metrics::record_readme_fetch("invalid_url");
            return None;
        };

        let mut request = self
            .client
            .get(self.readme_api_url(&repo))
            .header(ACCEPT, GITHUB_HTML_MEDIA_TYPE)
            .header(USER_AGENT, &self.user_agent);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(target: "portfolio.services.github", repo = %repo, error = %e, "README request failed");
                metrics::record_readme_fetch("error");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(target: "portfolio.services.github", repo = %repo, status = %status, "GitHub returned error for README");
            metrics::record_readme_fetch(if status == StatusCode::NOT_FOUND {
                "not_found"
            } else {
                "error"
            });
            return None;
        }

        match response.text().await {
            Ok(html) => {
                metrics::record_readme_fetch("success");
                Some(html)
            }
            Err(e) => {
                warn!(target: "portfolio.services.github", repo = %repo, error = %e, "Failed to read README body");
                metrics::record_readme_fetch("error");
                None
            }
        }
    }
}

/// Fetch a README and highlight its code blocks.
///
/// Highlighting runs inline; call from a blocking context or accept the CPU
/// cost on the current task.
pub async fn render_readme(
    client: &GitHubClient,
    highlighter: &Highlighter,
    repo_url: &str,
) -> Option<String> {
    let html = client.fetch_readme_html(repo_url).await?;
    Some(highlighter.highlight(&html))
}
