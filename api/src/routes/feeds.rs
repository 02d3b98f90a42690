//! Earthquake feed ingestion and query endpoints.

use crate::routes::{json_rejection, ApiError, ApiFailure, OneOrMany, ValidationErrorDetail};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::models::{FeedEntry, FeedSource, FeedView};
use shared::storage::FeedSubmitOutcome;

/// Response for feed ingestion.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeedIngestResponse {
    /// Number of entries inserted.
    pub accepted: usize,
    /// Number of entries already present in their channel.
    pub duplicates: usize,
    /// Message describing the result.
    pub message: String,
}

/// Creates the feed routes.
pub fn feeds_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/feeds", post(ingest_feed_entries))
        .route("/api/v1/feeds/{source}", get(get_feed))
        .with_state(state)
}

/// Handler for feed ingestion.
///
/// Accepts a single entry or a batch. The whole request is rejected with 422
/// if any entry is invalid. Returns 201 if at least one entry was inserted and
/// 200 if every entry was a duplicate.
async fn ingest_feed_entries(
    State(state): State<AppState>,
    payload: Result<Json<OneOrMany<FeedEntry>>, JsonRejection>,
) -> Result<(StatusCode, Json<FeedIngestResponse>), ApiFailure> {
    let Json(request) = payload.map_err(|rejection| json_rejection(&rejection))?;
    let entries: Vec<FeedEntry> = request.into_vec().into_iter().map(FeedEntry::classified).collect();

    if entries.is_empty() {
        return Err(ApiError::response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "empty_batch",
            "At least one feed entry is required",
        ));
    }

    let failures: Vec<ValidationErrorDetail> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            entry.validate_entry().err().map(|e| ValidationErrorDetail {
                index,
                message: e.to_string(),
            })
        })
        .collect();

    if !failures.is_empty() {
        return Err(ApiError::validation(failures, "feed entry"));
    }

    let received_at = Utc::now();
    let mut accepted = 0;
    let mut duplicates = 0;
    for entry in entries {
        match state
            .dashboard()
            .push_feed_entry_at(entry, received_at)
            .map_err(|e| ApiError::storage(&e))?
        {
            FeedSubmitOutcome::Accepted => accepted += 1,
            FeedSubmitOutcome::Duplicate => duplicates += 1,
        }
    }

    let status = if accepted > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(FeedIngestResponse {
            accepted,
            duplicates,
            message: format!("Accepted {accepted} feed entry/entries, {duplicates} duplicate(s)"),
        }),
    ))
}

async fn get_feed(
    State(state): State<AppState>,
    Path(source): Path<String>,
) -> Result<Json<FeedView>, ApiFailure> {
    let source: FeedSource = source
        .parse()
        .map_err(|e: shared::models::UnknownFeedSource| {
            ApiError::response(StatusCode::NOT_FOUND, "unknown_feed_source", e.to_string())
        })?;

    let view = state
        .dashboard()
        .get_feed(source)
        .map_err(|e| ApiError::storage(&e))?;

    Ok(Json(view))
}
