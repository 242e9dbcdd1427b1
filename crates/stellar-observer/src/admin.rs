//! Administrative endpoints, reachable only in development mode.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/admin/economy/snapshots` | Every system's snapshot history |
//! | `GET` | `/api/admin/economy/snapshots/{system_id}` | One system's history |
//! | `POST` | `/api/admin/economy/reset` | Restore the seed world |
//!
//! Outside development every path under the admin prefix answers `403`
//! before any handler runs, so a forbidden reset never touches engine state
//! and unknown admin paths look the same as real ones.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use stellar_types::{MarketSnapshot, ResetReport, SystemId};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::handlers::{Data, data, parse_uuid};
use crate::state::AppState;

/// Reject admin requests unless the runtime mode is development.
pub async fn require_development(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.mode.is_development() {
        warn!(path = %request.uri().path(), "Admin request rejected outside development mode");
        return Err(ApiError::Forbidden);
    }
    Ok(next.run(request).await)
}

/// `GET /api/admin/economy/snapshots`
pub async fn list_snapshots(
    State(state): State<Arc<AppState>>,
) -> Json<Data<BTreeMap<SystemId, Vec<MarketSnapshot>>>> {
    data(state.engine.snapshot_histories().await)
}

/// `GET /api/admin/economy/snapshots/{system_id}`
///
/// A system with no captured history yields an empty list.
pub async fn system_snapshots(
    State(state): State<Arc<AppState>>,
    Path(system_id): Path<String>,
) -> Result<Json<Data<Vec<MarketSnapshot>>>, ApiError> {
    let id = SystemId::from(parse_uuid(&system_id)?);
    Ok(data(state.engine.snapshot_history(id).await))
}

/// `POST /api/admin/economy/reset`
pub async fn reset_economy(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Data<ResetReport>>, ApiError> {
    let report = state
        .engine
        .reset()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(
        previous_tick = report.previous_tick,
        snapshots_cleared = report.snapshots_cleared,
        "Economy reset via admin API"
    );
    Ok(data(report))
}
