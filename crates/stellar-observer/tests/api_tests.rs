//! Integration tests for the economy API endpoints.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. The engine runs on a paused Tokio clock with a
//! long tick period, so the world stays at the seed unless a test advances
//! time.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use stellar_core::{EconomyConfig, RuntimeCapability, RuntimeMode, StarterGalaxy, TickEngine};
use stellar_observer::router::build_router;
use stellar_observer::state::AppState;
use stellar_types::{PlayerId, SystemId};
use tower::ServiceExt;

/// Every starter-galaxy id the tests address.
struct Ids {
    system: SystemId,
    player: PlayerId,
}

async fn make_state(mode: RuntimeMode, tick_interval_ms: u64) -> (Arc<AppState>, Ids) {
    let galaxy = StarterGalaxy::new();
    let ids = Ids {
        system: *galaxy.world().markets.keys().next().unwrap(),
        player: *galaxy.world().fleets.keys().next().unwrap(),
    };
    let mut config = EconomyConfig::default();
    config.engine.tick_interval_ms = tick_interval_ms;
    config.engine.snapshot_interval_ticks = 2;

    let engine = Arc::new(TickEngine::new(config, Arc::new(galaxy)).unwrap());
    engine
        .start(RuntimeCapability::LongLivedServer)
        .await
        .unwrap();
    (Arc::new(AppState::new(engine, mode)), ids)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(state: &Arc<AppState>, method: &str, uri: &str) -> (StatusCode, Value) {
    let app = build_router(Arc::clone(state));
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// =========================================================================
// Economy endpoints
// =========================================================================

#[tokio::test(start_paused = true)]
async fn status_reports_running_engine() {
    let (state, _) = make_state(RuntimeMode::Production, 5000).await;
    let (status, json) = send(&state, "GET", "/api/economy/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "running");
    assert_eq!(json["data"]["tick"], 0);
    assert_eq!(json["data"]["systems"], 5);
    assert_eq!(json["data"]["fleets"], 2);
    state.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn lists_every_market() {
    let (state, _) = make_state(RuntimeMode::Production, 5000).await;
    let (status, json) = send(&state, "GET", "/api/economy/markets").await;

    assert_eq!(status, StatusCode::OK);
    let markets = json["data"].as_array().unwrap();
    assert_eq!(markets.len(), 5);
    assert_eq!(json["data"][0]["goods"].as_object().unwrap().len(), 7);
    state.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn single_market_by_system_id() {
    let (state, ids) = make_state(RuntimeMode::Production, 5000).await;
    let uri = format!("/api/economy/markets/{}", ids.system);
    let (status, json) = send(&state, "GET", &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["system_id"], ids.system.to_string());
    state.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_market_is_not_found() {
    let (state, _) = make_state(RuntimeMode::Production, 5000).await;
    let uri = format!("/api/economy/markets/{}", SystemId::new());
    let (status, json) = send(&state, "GET", &uri).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("system"));
    state.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_uuid_is_bad_request() {
    let (state, _) = make_state(RuntimeMode::Production, 5000).await;
    let (status, json) = send(&state, "GET", "/api/economy/fleets/not-a-uuid").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
    state.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn fleet_by_player_id() {
    let (state, ids) = make_state(RuntimeMode::Production, 5000).await;
    let uri = format!("/api/economy/fleets/{}", ids.player);
    let (status, json) = send(&state, "GET", &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["player_id"], ids.player.to_string());

    let (status, _) = send(&state, "GET", "/api/economy/fleets").await;
    assert_eq!(status, StatusCode::OK);
    state.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn missions_filter_by_player() {
    let (state, _) = make_state(RuntimeMode::Production, 5000).await;
    let (_, all) = send(&state, "GET", "/api/economy/missions").await;
    let missions = all["data"].as_array().unwrap();
    assert_eq!(missions.len(), 1);
    let owner = all["data"][0]["player_id"].as_str().unwrap().to_owned();

    let (status, mine) = send(
        &state,
        "GET",
        &format!("/api/economy/missions?player_id={owner}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["data"].as_array().unwrap().len(), 1);

    let stranger = PlayerId::new();
    let (_, none) = send(
        &state,
        "GET",
        &format!("/api/economy/missions?player_id={stranger}"),
    )
    .await;
    assert!(none["data"].as_array().unwrap().is_empty());

    let (status, _) = send(&state, "GET", "/api/economy/missions?player_id=nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    state.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn events_start_empty() {
    let (state, _) = make_state(RuntimeMode::Production, 5000).await;
    let (status, json) = send(&state, "GET", "/api/economy/events").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].as_array().unwrap().is_empty());
    state.engine.shutdown().await;
}

// =========================================================================
// Admin endpoints
// =========================================================================

#[tokio::test(start_paused = true)]
async fn admin_is_forbidden_in_production() {
    let (state, _) = make_state(RuntimeMode::Production, 1000).await;
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(state.engine.current_tick(), 3);

    let (status, json) = send(&state, "POST", "/api/admin/economy/reset").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "forbidden");
    assert_eq!(state.engine.current_tick(), 3);
    assert!(!state.engine.snapshot_histories().await.is_empty());

    let (status, _) = send(&state, "GET", "/api/admin/economy/snapshots").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    state.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_admin_path_is_forbidden_in_production() {
    let (state, _) = make_state(RuntimeMode::Production, 5000).await;
    let (status, json) = send(&state, "GET", "/api/admin/economy/bogus").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "forbidden");
    state.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_admin_path_is_not_found_in_development() {
    let (state, _) = make_state(RuntimeMode::Development, 5000).await;
    let (status, json) = send(&state, "GET", "/api/admin/economy/bogus").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());
    state.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn admin_snapshots_in_development() {
    let (state, ids) = make_state(RuntimeMode::Development, 1000).await;
    tokio::time::sleep(Duration::from_millis(4_500)).await;

    let (status, json) = send(&state, "GET", "/api/admin/economy/snapshots").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_object().unwrap().len(), 5);

    let uri = format!("/api/admin/economy/snapshots/{}", ids.system);
    let (status, json) = send(&state, "GET", &uri).await;
    assert_eq!(status, StatusCode::OK);
    let ticks: Vec<u64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["tick"].as_u64().unwrap())
        .collect();
    assert_eq!(ticks, vec![2, 4]);

    let uri = format!("/api/admin/economy/snapshots/{}", SystemId::new());
    let (status, json) = send(&state, "GET", &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].as_array().unwrap().is_empty());
    state.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn admin_reset_in_development() {
    let (state, _) = make_state(RuntimeMode::Development, 1000).await;
    tokio::time::sleep(Duration::from_millis(4_500)).await;
    assert_eq!(state.engine.current_tick(), 4);

    let (status, json) = send(&state, "POST", "/api/admin/economy/reset").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["previous_tick"], 4);
    assert_eq!(json["data"]["snapshots_cleared"], 10);
    assert_eq!(state.engine.current_tick(), 0);
    assert!(state.engine.snapshot_histories().await.is_empty());
    state.engine.shutdown().await;
}

#[tokio::test]
async fn reset_before_start_is_internal_error() {
    let engine = Arc::new(
        TickEngine::new(EconomyConfig::default(), Arc::new(StarterGalaxy::new())).unwrap(),
    );
    let state = Arc::new(AppState::new(engine, RuntimeMode::Development));
    let (status, json) = send(&state, "POST", "/api/admin/economy/reset").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].is_string());
}
