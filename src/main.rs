//! Frameworks Cache - signed document cache for governance content
//!
//! Serves governance documents over HTTP from a signed TTL/LRU cache.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frameworks_cache::api::{create_router, AppState};
use frameworks_cache::cache::TtlCache;
use frameworks_cache::content::{ContentService, FrontmatterParser, HttpFetcher};
use frameworks_cache::resilience::CircuitBreaker;
use frameworks_cache::{spawn_cleanup_task, Config};

/// Main entry point for the document cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the signed cache, breakers and content service
/// 4. Start background TTL cleanup task when enabled
/// 5. Serve the HTTP API until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "frameworks_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Frameworks Cache Server");

    let config = Config::from_env();
    info!(
        max_entries = config.max_entries,
        default_ttl = ?config.default_ttl,
        compression = config.compression,
        port = config.server_port,
        "configuration loaded"
    );

    let secret = config
        .secret_key()
        .context("a signing key is required to start the cache")?;
    let base_url = config
        .content_base_url
        .clone()
        .context("CONTENT_BASE_URL is not set")?;

    let cache = TtlCache::from_settings(&config.cache_settings(), secret);
    let fetcher = HttpFetcher::new(config.fetch_timeout).context("building HTTP client")?;
    let service = ContentService::new(
        cache.clone(),
        Arc::new(CircuitBreaker::new("fetch", config.fetch_breaker.clone())),
        Arc::new(CircuitBreaker::new("cache", config.cache_breaker.clone())),
        Arc::new(fetcher),
        Arc::new(FrontmatterParser),
        base_url,
    );
    info!("Content service initialized");

    let cleanup_handle = config
        .cleanup_enabled
        .then(|| spawn_cleanup_task(cache, config.cleanup_interval));

    let app = create_router(AppState::new(service));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the sweep.
async fn shutdown_signal(cleanup_handle: Option<tokio::task::JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
        info!("Cleanup task stopped");
    }
}
