//! Shared type definitions for the Stellar Exchange economy simulation.
//!
//! This crate is the single source of truth for the types that cross crate
//! boundaries: the tick engine mutates them, the persistence layer stores
//! them, and the economy API serializes them. Types flow downstream to
//! `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Goods, event kinds and scopes, mission and engine status
//! - [`structs`] -- Markets, events, fleets, missions, world state, snapshots,
//!   and engine reports

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{EngineStatus, EventKind, EventScope, Good, MissionStatus};
pub use ids::{EventId, FleetId, MissionId, PlayerId, SystemId};
pub use structs::{
    ActiveEvent, EngineStatusReport, FleetPosition, FleetState, GoodMarket, MarketSnapshot,
    MarketState, ResetReport, TradeMissionState, WorldState, WorldView,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. The files are written to the `bindings/`
        // directory relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::PlayerId::export_all();
        let _ = crate::ids::SystemId::export_all();
        let _ = crate::ids::FleetId::export_all();
        let _ = crate::ids::MissionId::export_all();
        let _ = crate::ids::EventId::export_all();

        // Enums
        let _ = crate::enums::Good::export_all();
        let _ = crate::enums::EventKind::export_all();
        let _ = crate::enums::EventScope::export_all();
        let _ = crate::enums::MissionStatus::export_all();
        let _ = crate::enums::EngineStatus::export_all();

        // Structs
        let _ = crate::structs::GoodMarket::export_all();
        let _ = crate::structs::MarketState::export_all();
        let _ = crate::structs::ActiveEvent::export_all();
        let _ = crate::structs::FleetPosition::export_all();
        let _ = crate::structs::FleetState::export_all();
        let _ = crate::structs::TradeMissionState::export_all();
        let _ = crate::structs::WorldState::export_all();
        let _ = crate::structs::MarketSnapshot::export_all();
        let _ = crate::structs::EngineStatusReport::export_all();
        let _ = crate::structs::ResetReport::export_all();
        let _ = crate::structs::WorldView::export_all();
    }
}
