//! Station metric ingestion, ranking and watch-list endpoints.

use crate::routes::{json_rejection, ApiError, ApiFailure, OneOrMany, ValidationErrorDetail};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::models::{RankedStation, RawStationMeasurement, StationMetric};
use shared::ranking::pinned_station;
use shared::storage::MetricSubmitOutcome;

/// Response for station metric ingestion.
#[derive(Debug, Serialize, Deserialize)]
pub struct StationMetricIngestResponse {
    /// Number of metrics that replaced the stored state.
    pub accepted: usize,
    /// Number of metrics that were older than the stored state.
    pub superseded: usize,
    /// Message describing the result.
    pub message: String,
}

/// Query parameters for rankings.
#[derive(Debug, Deserialize)]
pub struct RankingParams {
    /// Station the user pinned, if any.
    pub pin: Option<String>,
}

/// Ranking of one event with the derived selection.
#[derive(Debug, Serialize, Deserialize)]
pub struct RankingResponse {
    /// Event identifier.
    pub event_id: String,
    /// Ranked stations, rank 1 first.
    pub stations: Vec<RankedStation>,
    /// Station to highlight.
    pub selected: Option<String>,
    /// Whether the pin named a station in the ranking.
    pub pinned: bool,
    /// Whether the event is on the watch list.
    pub watched: bool,
}

/// Response for watch-list changes.
#[derive(Debug, Serialize, Deserialize)]
pub struct WatchResponse {
    /// Event identifier.
    pub event_id: String,
    /// Whether the event is watched after the request.
    pub watched: bool,
    /// Whether the request changed the watch list.
    pub changed: bool,
}

/// Response listing the watched events.
#[derive(Debug, Serialize, Deserialize)]
pub struct WatchListResponse {
    /// Watched event ids in ascending order.
    pub events: Vec<String>,
}

/// Creates the station metric, ranking and watch-list routes.
pub fn rankings_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/station-metrics", post(ingest_station_metrics))
        .route("/api/v1/rankings/{event_id}", get(get_ranking))
        .route("/api/v1/watch", get(list_watched))
        .route(
            "/api/v1/watch/{event_id}",
            post(watch_event).delete(unwatch_event),
        )
        .with_state(state)
}

/// Handler for station metric ingestion.
///
/// Accepts a single measurement or a batch. The whole request is rejected with
/// 422 if any measurement is invalid. Returns 201 if at least one metric was
/// accepted and 200 if every metric was superseded.
async fn ingest_station_metrics(
    State(state): State<AppState>,
    payload: Result<Json<OneOrMany<RawStationMeasurement>>, JsonRejection>,
) -> Result<(StatusCode, Json<StationMetricIngestResponse>), ApiFailure> {
    let Json(request) = payload.map_err(|rejection| json_rejection(&rejection))?;
    let raw = request.into_vec();

    if raw.is_empty() {
        return Err(ApiError::response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "empty_batch",
            "At least one station metric is required",
        ));
    }

    let received_at = Utc::now();
    let mut metrics: Vec<StationMetric> = Vec::with_capacity(raw.len());
    let mut failures = Vec::new();
    for (index, measurement) in raw.into_iter().enumerate() {
        match measurement.normalize(received_at) {
            Ok(metric) => metrics.push(metric),
            Err(e) => failures.push(ValidationErrorDetail {
                index,
                message: e.to_string(),
            }),
        }
    }

    if !failures.is_empty() {
        return Err(ApiError::validation(failures, "station metric"));
    }

    let mut accepted = 0;
    let mut superseded = 0;
    for metric in metrics {
        match state
            .dashboard()
            .push_station_metric(metric)
            .map_err(|e| ApiError::storage(&e))?
        {
            MetricSubmitOutcome::Accepted => accepted += 1,
            MetricSubmitOutcome::Superseded => superseded += 1,
        }
    }

    let status = if accepted > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(StationMetricIngestResponse {
            accepted,
            superseded,
            message: format!("Accepted {accepted} station metric(s), {superseded} superseded"),
        }),
    ))
}

async fn get_ranking(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Query(params): Query<RankingParams>,
) -> Result<Json<RankingResponse>, ApiFailure> {
    let event_id = event_id.trim().to_string();
    let stations = state
        .dashboard()
        .get_ranking(&event_id)
        .map_err(|e| ApiError::storage(&e))?;

    let pinned_to = pinned_station(&stations, params.pin.as_deref());
    let pinned = pinned_to.is_some();
    let selected = pinned_to
        .or_else(|| stations.first())
        .map(|s| s.station_id.clone());
    let watched = state.dashboard().watched().contains(&event_id);

    Ok(Json(RankingResponse {
        event_id,
        stations,
        selected,
        pinned,
        watched,
    }))
}

async fn watch_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<(StatusCode, Json<WatchResponse>), ApiFailure> {
    let event_id = event_id.trim().to_string();
    if event_id.is_empty() {
        return Err(ApiError::response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_event_id",
            "Event id cannot be empty",
        ));
    }

    let changed = state.dashboard().watch(&event_id);
    let status = if changed {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(WatchResponse {
            event_id,
            watched: true,
            changed,
        }),
    ))
}

async fn unwatch_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Json<WatchResponse> {
    let event_id = event_id.trim().to_string();
    let changed = state.dashboard().unwatch(&event_id);

    Json(WatchResponse {
        event_id,
        watched: false,
        changed,
    })
}

async fn list_watched(State(state): State<AppState>) -> Json<WatchListResponse> {
    Json(WatchListResponse {
        events: state.dashboard().watched(),
    })
}
