//! Shared application state for the economy API.

use std::sync::Arc;

use stellar_core::{RuntimeMode, TickEngine};

/// Shared state injected into every handler via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The tick engine every read and admin call goes through.
    pub engine: Arc<TickEngine>,
    /// Runtime mode; the admin surface is reachable only in development.
    pub mode: RuntimeMode,
}

impl AppState {
    /// Create application state over a shared engine.
    pub const fn new(engine: Arc<TickEngine>, mode: RuntimeMode) -> Self {
        Self { engine, mode }
    }
}
