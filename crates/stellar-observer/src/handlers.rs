//! Read-only economy endpoints.
//!
//! Every handler reads through the engine's shared gate, so responses
//! always reflect one completed tick. Successful responses are wrapped as
//! `{ "data": ... }`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/economy/status` | Engine status and tick |
//! | `GET` | `/api/economy/markets` | All markets |
//! | `GET` | `/api/economy/markets/{system_id}` | One market |
//! | `GET` | `/api/economy/events` | Active world events |
//! | `GET` | `/api/economy/fleets` | All fleets |
//! | `GET` | `/api/economy/fleets/{player_id}` | One player's fleet |
//! | `GET` | `/api/economy/missions` | Trade missions (`?player_id=` filter) |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Serialize;
use stellar_types::{
    ActiveEvent, EngineStatusReport, FleetState, MarketState, PlayerId, SystemId,
    TradeMissionState,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Success envelope: `{ "data": ... }`.
#[derive(Debug, Clone, Serialize)]
pub struct Data<T> {
    /// The response payload.
    pub data: T,
}

/// Wrap a payload in the success envelope.
pub const fn data<T>(payload: T) -> Json<Data<T>> {
    Json(Data { data: payload })
}

/// Parse a UUID path or query segment.
pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse::<Uuid>()
        .map_err(|e| ApiError::InvalidUuid(format!("{raw}: {e}")))
}

/// Query parameters for `GET /api/economy/missions`.
#[derive(Debug, serde::Deserialize)]
pub struct MissionsQuery {
    /// Only return this player's missions.
    pub player_id: Option<String>,
}

/// `GET /api/economy/status`
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<Data<EngineStatusReport>> {
    data(state.engine.status_report().await)
}

/// `GET /api/economy/markets`
pub async fn list_markets(State(state): State<Arc<AppState>>) -> Json<Data<Vec<MarketState>>> {
    data(state.engine.markets().await)
}

/// `GET /api/economy/markets/{system_id}`
pub async fn get_market(
    State(state): State<Arc<AppState>>,
    Path(system_id): Path<String>,
) -> Result<Json<Data<MarketState>>, ApiError> {
    let id = SystemId::from(parse_uuid(&system_id)?);
    state
        .engine
        .market(id)
        .await
        .map(data)
        .ok_or_else(|| ApiError::NotFound(format!("system {id}")))
}

/// `GET /api/economy/events`
pub async fn list_events(State(state): State<Arc<AppState>>) -> Json<Data<Vec<ActiveEvent>>> {
    data(state.engine.active_events().await)
}

/// `GET /api/economy/fleets`
pub async fn list_fleets(State(state): State<Arc<AppState>>) -> Json<Data<Vec<FleetState>>> {
    data(state.engine.fleets().await)
}

/// `GET /api/economy/fleets/{player_id}`
pub async fn get_fleet(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> Result<Json<Data<FleetState>>, ApiError> {
    let id = PlayerId::from(parse_uuid(&player_id)?);
    state
        .engine
        .fleet(id)
        .await
        .map(data)
        .ok_or_else(|| ApiError::NotFound(format!("fleet for player {id}")))
}

/// `GET /api/economy/missions`
pub async fn list_missions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MissionsQuery>,
) -> Result<Json<Data<Vec<TradeMissionState>>>, ApiError> {
    let player = query
        .player_id
        .as_deref()
        .map(parse_uuid)
        .transpose()?
        .map(PlayerId::from);
    Ok(data(state.engine.missions(player).await))
}
