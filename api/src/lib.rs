//! Quakeboard API Server
//!
//! This crate provides the HTTP server for the Quakeboard earthquake
//! monitoring dashboard. It ingests station quality metrics and feed entries,
//! and serves rankings, feed views and whole-dashboard snapshots.
//!
//! # Architecture
//!
//! The API server is built on Axum and Tokio, providing:
//! - REST API for metric and feed ingestion
//! - Ranking, feed and snapshot queries
//! - A server-sent event stream that pushes a snapshot after every change
//!
//! # Example
//!
//! ```no_run
//! use api::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
pub mod monitor;
mod routes;
pub mod state;

pub use config::{Config, LogFormat};
pub use state::AppState;

use anyhow::Result;
use axum::Router;
use monitor::LivenessMonitor;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted request body, in bytes.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Runs the Quakeboard API server.
///
/// This function initializes the server with configuration from environment variables
/// and starts listening for incoming connections. It handles graceful shutdown on
/// SIGTERM/SIGINT signals.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    run_server_with_config(config).await
}

/// Runs the Quakeboard API server with the provided configuration.
///
/// This is useful for testing or when you want to provide configuration programmatically.
///
/// # Errors
///
/// Returns an error if:
/// - The configured address is invalid
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server_with_config(config: Config) -> Result<()> {
    let addr = config.socket_addr()?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        feed_capacity = config.dashboard.feeds.capacity,
        staleness_secs = config.dashboard.feeds.staleness_secs,
        auto_watch = config.dashboard.auto_watch,
        "Quakeboard API server starting"
    );

    let state = AppState::from_config(config.dashboard);
    let monitor = tokio::spawn(LivenessMonitor::new(state.clone(), config.liveness_interval).run());

    let app = create_router(state);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Listening for connections");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    monitor.abort();
    served?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes(state.clone()))
        .merge(routes::rankings_routes(state.clone()))
        .merge(routes::feeds_routes(state.clone()))
        .merge(routes::snapshot_routes(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
