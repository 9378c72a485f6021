//! labshell REST API server.
//!
//! Run with: cargo run -p labshell-server
//!
//! Then query http://localhost:3000/api/health.

mod config;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use chrono::Utc;
use labshell_core::SessionStorage;
use labshell_session::{MemoryStorage, demo_sessions};
use labshell_transport::{AppState, RateLimiter, build_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let storage: Arc<dyn SessionStorage> = if config.seed_demo_sessions {
        let sessions = demo_sessions(Utc::now());
        tracing::info!("Seeding {} demo sessions", sessions.len());
        Arc::new(MemoryStorage::with_sessions(sessions))
    } else {
        Arc::new(MemoryStorage::new())
    };

    let state = AppState::new(storage).with_rate_limiter(RateLimiter::new(
        config.rate_limit_max,
        config.rate_limit_window,
    ));
    let app = build_router(state);

    // Start server
    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(
        "labshell API v{} listening on http://{addr}",
        env!("CARGO_PKG_VERSION")
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for SIGINT: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
