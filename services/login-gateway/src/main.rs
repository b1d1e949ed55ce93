//! Login Gateway
//!
//! Single-binary Rust service that:
//! 1. Starts a Twitter handshake at `/auth` and hands the client a session cookie
//! 2. Completes it at `/callback` when the provider redirects back
//! 3. Answers who-am-I lookups at `/me` for the life of the login

mod config;
mod cookies;
mod metrics;
mod routes;

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use handshake::{Accessor, Coordinator};
use provider::TwitterProvider;
use session_store::{FileStore, MemoryStore, SessionStore, SystemClock};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, SessionBackend};
use crate::routes::{AppState, build_router};

/// How long in-flight requests get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting login-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        callback_url = %config.provider.callback_url,
        backend = ?config.session.backend,
        pending_ttl_secs = config.session.pending_ttl_secs,
        authenticated_ttl_secs = config.session.authenticated_ttl_secs,
        "configuration loaded"
    );

    let consumer_secret = config
        .provider
        .consumer_secret
        .clone()
        .context("consumer secret missing after config load")?;

    let provider = Arc::new(TwitterProvider::new(
        reqwest::Client::new(),
        config.provider.consumer_key.clone(),
        consumer_secret,
        config.provider.callback_url.clone(),
        config.provider.endpoints(),
        Duration::from_secs(config.provider.timeout_secs),
    ));

    let clock = Arc::new(SystemClock);
    let store: Arc<dyn SessionStore> = match config.session.backend {
        SessionBackend::Memory => Arc::new(MemoryStore::new(clock)),
        SessionBackend::File => {
            let path = config
                .session
                .file_path
                .as_ref()
                .context("file backend requires session.file_path")?;
            Arc::new(
                FileStore::load(path.clone(), clock)
                    .await
                    .with_context(|| format!("failed to load session file {}", path.display()))?,
            )
        }
    };

    let coordinator = Arc::new(Coordinator::new(
        store.clone(),
        provider,
        Duration::from_secs(config.session.pending_ttl_secs),
        Duration::from_secs(config.session.authenticated_ttl_secs),
    ));
    let accessor = Arc::new(Accessor::new(store));

    let app_state = AppState {
        coordinator,
        accessor,
        cookie_name: config.session.cookie_name.clone(),
        cookie_secure: config.session.cookie_secure,
        pending_ttl_secs: config.session.pending_ttl_secs,
        authenticated_ttl_secs: config.session.authenticated_ttl_secs,
        allowed_origin: config.server.allowed_origin.clone(),
        prometheus: prometheus_handle,
        started_at: Instant::now(),
        requests_total: Arc::new(AtomicU64::new(0)),
        errors_total: Arc::new(AtomicU64::new(0)),
    };

    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;

    info!(addr = %listen_addr, "accepting requests");

    // Graceful shutdown with drain timeout enforcement:
    // 1. shutdown_signal() fires on SIGTERM/SIGINT
    // 2. axum stops accepting new connections and drains in-flight requests
    // 3. We enforce DRAIN_TIMEOUT so a slow client cannot block process exit
    //
    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts. We achieve this by notifying the server to drain, then
    // racing the drain against the timeout.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    // Wait for the OS signal
    shutdown_signal().await;

    // Signal the server to begin draining
    let _ = shutdown_tx.send(());

    // Now enforce the drain timeout — this timer starts at signal receipt
    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
