//! Health check endpoint.
//!
//! Provides a liveness check for load balancers, extended with the staleness
//! of each feed channel so operators can spot a silent upstream.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use shared::models::FeedSource;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status (always "healthy" if reachable).
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Current dashboard change counter.
    pub dashboard_version: u64,
    /// Channels that have not been updated within the staleness horizon.
    pub stale_feeds: Vec<FeedSource>,
}

/// Creates the health check routes.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

/// Health check handler.
///
/// Stale feeds do not make the service unhealthy; they are reported so the
/// caller can decide.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let dashboard = state.dashboard();
    let stale_feeds = FeedSource::ALL
        .into_iter()
        .filter(|&source| dashboard.get_feed(source).map_or(true, |view| view.is_stale))
        .collect();

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "quakeboard-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        dashboard_version: dashboard.version(),
        stale_feeds,
    })
}
