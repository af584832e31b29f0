//! Portfolio Service
//!
//! Entry point for the dcln.me portfolio backend: private resume download
//! behind Cloudflare Access, and highlighted README rendering.

use portfolio_service::auth::TokenVerifier;
use portfolio_service::config::Config;
use portfolio_service::highlight::Highlighter;
use portfolio_service::observability::metrics::init_metrics_recorder;
use portfolio_service::routes::{self, AppState};
use portfolio_service::services::GitHubClient;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portfolio_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Portfolio Service");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        cf_access_team_domain = %config.cf_access_team_domain,
        jwks_cache_ttl_seconds = config.jwks_cache_ttl_seconds,
        jwt_nbf_tolerance_seconds = config.jwt_nbf_tolerance_seconds,
        resume_configured = config.resume_path.is_some(),
        "Configuration loaded successfully"
    );

    // Metrics recorder must exist before anything records
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let verifier = Arc::new(TokenVerifier::from_config(&config));

    let github = GitHubClient::from_config(&config).map_err(|e| {
        error!("Failed to create GitHub client: {}", e);
        e
    })?;

    // Grammar and theme loading is CPU-bound
    let highlighter = tokio::task::spawn_blocking(Highlighter::new)
        .await?
        .map_err(|e| {
            error!("Failed to load syntax highlighter: {}", e);
            e
        })?;

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let state = Arc::new(AppState {
        config,
        verifier,
        github,
        highlighter: Arc::new(highlighter),
    });

    let app = routes::build_routes(state, metrics_handle);

    info!("Portfolio Service listening on {}", addr);

    // Start server with graceful shutdown support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Portfolio Service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    let drain_secs: u64 = std::env::var("DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (DRAIN_SECONDS=0)");
    }
}
