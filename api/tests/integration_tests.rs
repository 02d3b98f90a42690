//! Integration tests for Quakeboard API.
//!
//! These tests verify the complete flow of ingesting station metrics and
//! feed entries and reading rankings, feeds and snapshots through the HTTP API.

use api::{create_router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};

/// Creates a test router with fresh in-memory stores.
fn test_app() -> (Router, AppState) {
    let state = AppState::with_in_memory_store();
    let router = create_router(state.clone());
    (router, state)
}

/// Sends a request and returns the status and parsed JSON body.
async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}

/// Helper to make a POST request with JSON body.
async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
    )
    .await
}

/// Helper to make a GET request.
async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

/// Helper to make a DELETE request.
async fn delete(app: Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

fn station_ids(ranking: &Value) -> Vec<String> {
    ranking["stations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["station_id"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// STATION METRIC TESTS
// ============================================================================

mod station_metrics {
    use super::*;

    #[tokio::test]
    async fn test_three_station_scenario() {
        let (app, _state) = test_app();

        let metrics = json!([
            {"station_id": "A", "event_id": "E1", "origin_time_offset_sec": 0.1,
             "lat_offset_deg": 0.1, "lon_offset_deg": 0.1, "rms_residual_sec": 0.2,
             "phase_count": 20, "azimuthal_gap_deg": 40.0},
            {"station_id": "B", "event_id": "E1", "origin_time_offset_sec": 0.5,
             "lat_offset_deg": 0.3, "lon_offset_deg": 0.2, "rms_residual_sec": 0.4,
             "phase_count": 10, "azimuthal_gap_deg": 90.0},
            {"station_id": "C", "event_id": "E1", "origin_time_offset_sec": 0.1,
             "lat_offset_deg": 0.1, "lon_offset_deg": 0.1, "rms_residual_sec": 0.2,
             "phase_count": 25, "azimuthal_gap_deg": 40.0}
        ]);
        let (status, body) = post_json(app.clone(), "/api/v1/station-metrics", metrics).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["accepted"], 3);

        let (status, ranking) = get(app, "/api/v1/rankings/E1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(station_ids(&ranking), ["C", "A", "B"]);
        assert_eq!(ranking["selected"], "C");
        assert_eq!(ranking["stations"][0]["rank"], 1);
    }

    #[tokio::test]
    async fn test_submission_order_does_not_matter() {
        let (app_a, _) = test_app();
        let (app_b, _) = test_app();
        let a = json!({"station_id": "LEM", "event_id": "E2", "rms_residual_sec": 0.3, "phase_count": 12});
        let b = json!({"station_id": "KLI", "event_id": "E2", "rms_residual_sec": 0.3, "phase_count": 12});

        post_json(app_a.clone(), "/api/v1/station-metrics", a.clone()).await;
        post_json(app_a.clone(), "/api/v1/station-metrics", b.clone()).await;
        post_json(app_b.clone(), "/api/v1/station-metrics", b).await;
        post_json(app_b.clone(), "/api/v1/station-metrics", a).await;

        let (_, first) = get(app_a, "/api/v1/rankings/E2").await;
        let (_, second) = get(app_b, "/api/v1/rankings/E2").await;
        assert_eq!(station_ids(&first), station_ids(&second));
        // Full tie: broken by station id.
        assert_eq!(station_ids(&first), ["KLI", "LEM"]);
    }

    #[tokio::test]
    async fn test_older_measurement_is_superseded() {
        let (app, _state) = test_app();
        let newer = json!({"station_id": "KLI", "event_id": "E3", "rms_residual_sec": 0.1,
                           "observed_at": "2025-05-14T03:00:10Z"});
        let older = json!({"station_id": "KLI", "event_id": "E3", "rms_residual_sec": 0.9,
                           "observed_at": "2025-05-14T03:00:00Z"});

        let (status, _) = post_json(app.clone(), "/api/v1/station-metrics", newer).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = post_json(app.clone(), "/api/v1/station-metrics", older).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["superseded"], 1);

        let (_, ranking) = get(app, "/api/v1/rankings/E3").await;
        assert_eq!(ranking["stations"][0]["metric"]["rms_residual_sec"], 0.1);
    }

    #[tokio::test]
    async fn test_invalid_batch_is_rejected_whole() {
        let (app, state) = test_app();
        let metrics = json!([
            {"station_id": "KLI", "event_id": "E4"},
            {"station_id": "", "event_id": "E4"},
            {"station_id": "LEM", "event_id": "E4", "phase_count": -1}
        ]);

        let (status, body) = post_json(app, "/api/v1/station-metrics", metrics).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_failed");
        assert_eq!(body["details"].as_array().unwrap().len(), 2);
        assert_eq!(body["details"][0]["index"], 1);
        assert!(state.dashboard().get_ranking("E4").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let (app, _state) = test_app();
        let (status, body) = send(
            app,
            Request::builder()
                .method("POST")
                .uri("/api/v1/station-metrics")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_json");
    }
}

// ============================================================================
// WATCH LIST TESTS
// ============================================================================

mod watch {
    use super::*;

    #[tokio::test]
    async fn test_first_metric_auto_watches_event() {
        let (app, _state) = test_app();
        post_json(
            app.clone(),
            "/api/v1/station-metrics",
            json!({"station_id": "KLI", "event_id": "E9"}),
        )
        .await;

        let (status, body) = get(app, "/api/v1/watch").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["events"], json!(["E9"]));
    }

    #[tokio::test]
    async fn test_unwatched_event_leaves_snapshot() {
        let (app, _state) = test_app();
        post_json(
            app.clone(),
            "/api/v1/station-metrics",
            json!({"station_id": "KLI", "event_id": "E9"}),
        )
        .await;

        let (status, body) = delete(app.clone(), "/api/v1/watch/E9").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], true);

        let (_, snapshot) = get(app.clone(), "/api/v1/snapshot").await;
        assert_eq!(snapshot["rankings"], json!([]));

        // The ranking itself is still available on demand.
        let (_, ranking) = get(app, "/api/v1/rankings/E9").await;
        assert_eq!(station_ids(&ranking), ["KLI"]);
        assert_eq!(ranking["watched"], false);
    }

    #[tokio::test]
    async fn test_watch_event_without_metrics() {
        let (app, _state) = test_app();
        let (status, _) = post_json(app.clone(), "/api/v1/watch/E10", Value::Null).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, snapshot) = get(app, "/api/v1/snapshot").await;
        assert_eq!(snapshot["rankings"][0]["event_id"], "E10");
        assert_eq!(snapshot["rankings"][0]["stations"], json!([]));
        assert_eq!(snapshot["rankings"][0]["selected"], Value::Null);
    }
}

// ============================================================================
// FEED TESTS
// ============================================================================

mod feeds {
    use super::*;

    fn entry(minute: u32, magnitude: f64) -> Value {
        json!({
            "feed_source": "ESDX",
            "location_label": "Balai 2 Ciputat",
            "magnitude": magnitude,
            "event_time": format!("2025-05-14T03:{minute:02}:00Z")
        })
    }

    #[tokio::test]
    async fn test_cap_keeps_five_newest() {
        let (app, _state) = test_app();
        let batch: Vec<Value> = (0..6).map(|m| entry(m, 3.0)).collect();

        let (status, body) = post_json(app.clone(), "/api/v1/feeds", json!(batch)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["accepted"], 6);

        let (status, view) = get(app, "/api/v1/feeds/ESDX").await;
        assert_eq!(status, StatusCode::OK);
        let times: Vec<&str> = view["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["event_time"].as_str().unwrap())
            .collect();
        assert_eq!(
            times,
            [
                "2025-05-14T03:05:00Z",
                "2025-05-14T03:04:00Z",
                "2025-05-14T03:03:00Z",
                "2025-05-14T03:02:00Z",
                "2025-05-14T03:01:00Z"
            ]
        );
    }

    #[tokio::test]
    async fn test_severity_tiers() {
        let (app, _state) = test_app();
        let batch = json!([entry(0, 5.2), entry(1, 2.3), entry(2, 1.0)]);
        post_json(app.clone(), "/api/v1/feeds", batch).await;

        let (_, view) = get(app, "/api/v1/feeds/ESDX").await;
        let tiers: Vec<&str> = view["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["severity_tier"].as_str().unwrap())
            .collect();
        assert_eq!(tiers, ["INFO", "LOW", "HIGH"]);
        assert_eq!(view["tally"]["high"], 1);
    }

    #[tokio::test]
    async fn test_duplicate_is_idempotent() {
        let (app, _state) = test_app();
        post_json(app.clone(), "/api/v1/feeds", entry(7, 3.9)).await;
        let (status, body) = post_json(app.clone(), "/api/v1/feeds", entry(7, 3.9)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["duplicates"], 1);
        let (_, view) = get(app, "/api/v1/feeds/ESDX").await;
        assert_eq!(view["entries"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_feed_source() {
        let (app, _state) = test_app();
        let (status, body) = get(app, "/api/v1/feeds/GEOFON").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "unknown_feed_source");
    }
}

// ============================================================================
// SNAPSHOT TESTS
// ============================================================================

mod snapshot {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_combines_rankings_and_feeds() {
        let (app, _state) = test_app();
        post_json(
            app.clone(),
            "/api/v1/station-metrics",
            json!({"station_id": "pgr ii", "event_id": "E1", "phase_count": 14}),
        )
        .await;
        post_json(
            app.clone(),
            "/api/v1/feeds",
            json!([
                {"feed_source": "ESDX", "location_label": "Balai 2 Ciputat",
                 "magnitude": 3.1, "event_time": "2025-05-14T03:00:00Z"},
                {"feed_source": "ESDX_STATION", "location_label": "BMKG Kepahiang",
                 "magnitude": 4.4, "event_time": "2025-05-14T03:09:00Z"}
            ]),
        )
        .await;

        let (status, snapshot) = get(app, "/api/v1/snapshot").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["rankings"][0]["selected"], "PGR II");
        assert_eq!(snapshot["feeds"].as_array().unwrap().len(), 2);
        assert_eq!(snapshot["feeds"][0]["source"], "ESDX");
        assert_eq!(snapshot["feeds"][0]["is_stale"], false);
        assert_eq!(snapshot["latest_event"]["location_label"], "BMKG Kepahiang");
        assert!(snapshot["version"].as_u64().unwrap() >= 4);
    }

    #[tokio::test]
    async fn test_version_only_moves_on_change() {
        let (app, _state) = test_app();
        let metric = json!({"station_id": "KLI", "event_id": "E1",
                            "observed_at": "2025-05-14T03:00:00Z"});
        post_json(app.clone(), "/api/v1/station-metrics", metric.clone()).await;
        let (_, before) = get(app.clone(), "/api/v1/snapshot").await;

        post_json(app.clone(), "/api/v1/station-metrics", metric).await;
        let (_, after) = get(app, "/api/v1/snapshot").await;

        assert_eq!(before["version"], after["version"]);
    }
}

// ============================================================================
// HEALTH TESTS
// ============================================================================

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let (app, _state) = test_app();
        let (status, body) = get(app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "quakeboard-api");
    }
}
