//! Axum router construction for the economy API.
//!
//! Assembles the read-only economy routes and the guarded admin routes
//! into a single [`Router`] with CORS and request tracing enabled.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::error::ApiError;
use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /api/economy/status` -- engine status and current tick
/// - `GET /api/economy/markets` -- all markets
/// - `GET /api/economy/markets/{system_id}` -- single market
/// - `GET /api/economy/events` -- active world events
/// - `GET /api/economy/fleets` -- all fleets
/// - `GET /api/economy/fleets/{player_id}` -- single fleet
/// - `GET /api/economy/missions` -- trade missions
/// - `/api/admin/economy/*` -- snapshot history and reset, development only;
///   every path under the prefix, known or not, is guarded
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin_routes = Router::new()
        .route("/snapshots", get(admin::list_snapshots))
        .route("/snapshots/{system_id}", get(admin::system_snapshots))
        .route("/reset", post(admin::reset_economy))
        // Unmatched admin paths; only reached past the guard in development.
        .fallback(|| async { ApiError::NotFound(String::from("admin route")) })
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            admin::require_development,
        ));

    Router::new()
        .route("/api/economy/status", get(handlers::get_status))
        .route("/api/economy/markets", get(handlers::list_markets))
        .route("/api/economy/markets/{system_id}", get(handlers::get_market))
        .route("/api/economy/events", get(handlers::list_events))
        .route("/api/economy/fleets", get(handlers::list_fleets))
        .route("/api/economy/fleets/{player_id}", get(handlers::get_fleet))
        .route("/api/economy/missions", get(handlers::list_missions))
        .nest("/api/admin/economy", admin_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
