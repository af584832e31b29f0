//! Test server harness for E2E testing
//!
//! Provides `TestPortfolioServer` for spawning real service instances in tests.

use metrics_exporter_prometheus::PrometheusBuilder;
use portfolio_service::auth::TokenVerifier;
use portfolio_service::config::Config;
use portfolio_service::highlight::Highlighter;
use portfolio_service::routes::{self, AppState};
use portfolio_service::services::GitHubClient;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the portfolio service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> Result<()> {
///     let server = TestPortfolioServer::spawn(HashMap::new()).await?;
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestPortfolioServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestPortfolioServer {
    /// Spawn a server configured from `vars` layered over test defaults.
    ///
    /// The server binds to a random port on 127.0.0.1. Point
    /// `CF_ACCESS_TEAM_DOMAIN` and `GITHUB_API_URL` at mock servers to control
    /// the upstreams.
    pub async fn spawn(vars: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let mut merged = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            (
                "CF_ACCESS_TEAM_DOMAIN".to_string(),
                "http://127.0.0.1:1".to_string(),
            ),
            (
                "GITHUB_API_URL".to_string(),
                "http://127.0.0.1:1".to_string(),
            ),
        ]);
        merged.extend(vars);

        let config = Config::from_vars(&merged)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        Self::spawn_with_config(config).await
    }

    /// Spawn a server with an explicit configuration.
    pub async fn spawn_with_config(config: Config) -> Result<Self, anyhow::Error> {
        let verifier = Arc::new(TokenVerifier::from_config(&config));
        let github = GitHubClient::from_config(&config)
            .map_err(|e| anyhow::anyhow!("Failed to create GitHub client: {}", e))?;
        let highlighter = Highlighter::new()
            .map_err(|e| anyhow::anyhow!("Failed to load highlighter: {}", e))?;

        let state = Arc::new(AppState {
            config: config.clone(),
            verifier,
            github,
            highlighter: Arc::new(highlighter),
        });

        // Recorder is built but not installed; tests only need the handle
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestPortfolioServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
