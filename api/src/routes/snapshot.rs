//! Dashboard snapshot endpoints.
//!
//! `GET /api/v1/snapshot` returns the current snapshot. The stream endpoint
//! pushes a fresh snapshot as a server-sent event after every change notice.

use crate::routes::{ApiError, ApiFailure};
use crate::state::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use shared::models::DashboardSnapshot;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

/// Creates the snapshot routes.
pub fn snapshot_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/snapshot", get(get_snapshot))
        .route("/api/v1/snapshot/stream", get(stream_snapshots))
        .with_state(state)
}

async fn get_snapshot(
    State(state): State<AppState>,
) -> Result<Json<DashboardSnapshot>, ApiFailure> {
    let snapshot = state
        .dashboard()
        .get_snapshot()
        .map_err(|e| ApiError::storage(&e))?;
    Ok(Json(snapshot))
}

/// Composes the current snapshot as an SSE event.
fn snapshot_event(state: &AppState) -> Option<Event> {
    let snapshot = match state.dashboard().get_snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::error!(error = %e, "Failed to compose snapshot for stream");
            return None;
        }
    };

    Event::default()
        .event("snapshot")
        .id(snapshot.version.to_string())
        .json_data(&snapshot)
        .map_err(|e| tracing::error!(error = %e, "Failed to encode snapshot event"))
        .ok()
}

/// Handler for the snapshot stream.
///
/// The current snapshot is sent on connect. Notices missed by a lagging
/// client are not replayed; the next snapshot already reflects them.
async fn stream_snapshots(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.dashboard().subscribe();
    tracing::debug!("Snapshot stream client connected");

    let initial = tokio_stream::iter(snapshot_event(&state).map(Ok::<_, Infallible>));

    let updates = BroadcastStream::new(receiver).filter_map(move |notice| {
        if let Err(BroadcastStreamRecvError::Lagged(skipped)) = notice {
            tracing::warn!(skipped, "Snapshot stream client lagged behind");
        }
        snapshot_event(&state).map(Ok)
    });

    Sse::new(initial.chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
