//! Core entity structs for the Stellar Exchange economy.
//!
//! [`WorldState`] aggregates every slice the tick engine mutates: per-system
//! markets, active world events, per-player fleets, and trade missions.
//! Prices and supply/demand factors are [`Decimal`] so repeated ticks never
//! accumulate floating-point drift.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EngineStatus, EventKind, EventScope, Good, MissionStatus};
use crate::ids::{EventId, FleetId, MissionId, PlayerId, SystemId};

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// Pricing state for one good on one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GoodMarket {
    /// Long-run equilibrium price.
    #[ts(as = "String")]
    pub base_price: Decimal,
    /// Price quoted to traders this tick.
    #[ts(as = "String")]
    pub current_price: Decimal,
    /// Relative supply factor (1.0 = balanced).
    #[ts(as = "String")]
    pub supply: Decimal,
    /// Relative demand factor (1.0 = balanced).
    #[ts(as = "String")]
    pub demand: Decimal,
}

impl GoodMarket {
    /// A balanced market trading at its base price.
    pub const fn balanced(base_price: Decimal) -> Self {
        Self {
            base_price,
            current_price: base_price,
            supply: Decimal::ONE,
            demand: Decimal::ONE,
        }
    }
}

/// The market of a single star system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarketState {
    /// The system this market belongs to.
    pub system_id: SystemId,
    /// Human-readable system name.
    pub name: String,
    /// Pricing state per tradable good.
    pub goods: BTreeMap<Good, GoodMarket>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A world event currently influencing the economy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActiveEvent {
    /// Unique event identifier.
    pub id: EventId,
    /// What the event does.
    pub kind: EventKind,
    /// Where the event applies.
    pub scope: EventScope,
    /// Tick on which the event began.
    pub started_at_tick: u64,
    /// First tick on which the event is no longer active.
    pub expires_at_tick: u64,
}

impl ActiveEvent {
    /// Whether the event has run its course at `tick`.
    pub const fn is_expired(&self, tick: u64) -> bool {
        self.expires_at_tick <= tick
    }

    /// Whether the event covers the given system.
    pub fn affects(&self, system_id: SystemId) -> bool {
        self.scope.covers(system_id)
    }
}

// ---------------------------------------------------------------------------
// Fleets and missions
// ---------------------------------------------------------------------------

/// Where a fleet is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "status", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum FleetPosition {
    /// Docked at a system's station.
    Docked {
        /// The system the fleet is docked at.
        system_id: SystemId,
    },
    /// Travelling between two systems.
    InTransit {
        /// Departure system.
        from: SystemId,
        /// Destination system.
        to: SystemId,
        /// Ticks of travel completed so far.
        progress: u32,
        /// Ticks the whole journey takes.
        duration: u32,
    },
}

/// A player's fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FleetState {
    /// Unique fleet identifier.
    pub fleet_id: FleetId,
    /// Owning player.
    pub player_id: PlayerId,
    /// Display name of the fleet.
    pub name: String,
    /// Current position.
    pub position: FleetPosition,
}

impl FleetState {
    /// Whether the fleet is between systems.
    pub const fn is_in_transit(&self) -> bool {
        matches!(self.position, FleetPosition::InTransit { .. })
    }

    /// The system the fleet is docked at, if any.
    pub const fn docked_at(&self) -> Option<SystemId> {
        match self.position {
            FleetPosition::Docked { system_id } => Some(system_id),
            FleetPosition::InTransit { .. } => None,
        }
    }
}

/// A player's cargo-delivery contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TradeMissionState {
    /// Unique mission identifier.
    pub mission_id: MissionId,
    /// Player who accepted the mission.
    pub player_id: PlayerId,
    /// Fleet carrying the cargo.
    pub fleet_id: FleetId,
    /// Good being delivered.
    pub good: Good,
    /// Units of cargo.
    pub quantity: u32,
    /// System the cargo must reach.
    pub destination: SystemId,
    /// Ticks of work completed.
    pub progress: u32,
    /// Ticks of work needed before delivery.
    pub required_ticks: u32,
    /// Last tick on which delivery still counts.
    pub deadline_tick: u64,
    /// Current status.
    pub status: MissionStatus,
}

// ---------------------------------------------------------------------------
// Aggregate world state
// ---------------------------------------------------------------------------

/// The complete mutable economy advanced by the tick engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldState {
    /// Markets keyed by star system.
    pub markets: BTreeMap<SystemId, MarketState>,
    /// Events currently in effect.
    pub events: Vec<ActiveEvent>,
    /// Fleets keyed by owning player.
    pub fleets: BTreeMap<PlayerId, FleetState>,
    /// Trade missions keyed by mission ID.
    pub missions: BTreeMap<MissionId, TradeMissionState>,
}

impl WorldState {
    /// Events covering the given system, in activation order.
    pub fn events_affecting(&self, system_id: SystemId) -> impl Iterator<Item = &ActiveEvent> {
        self.events.iter().filter(move |event| event.affects(system_id))
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// An immutable, tick-tagged capture of one system's market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarketSnapshot {
    /// The captured system.
    pub system_id: SystemId,
    /// Tick counter value at capture time.
    pub tick: u64,
    /// Wall-clock capture time.
    pub captured_at: DateTime<Utc>,
    /// Copy of the system's goods at capture time.
    pub goods: BTreeMap<Good, GoodMarket>,
}

// ---------------------------------------------------------------------------
// Engine reports
// ---------------------------------------------------------------------------

/// Point-in-time engine status served to operators and clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EngineStatusReport {
    /// Lifecycle status of the engine.
    pub status: EngineStatus,
    /// Last completed tick.
    pub tick: u64,
    /// Real-time milliseconds between ticks.
    pub tick_interval_ms: u64,
    /// Number of star systems with a market.
    pub systems: u32,
    /// Number of world events in effect.
    pub active_events: u32,
    /// Number of fleets.
    pub fleets: u32,
    /// Number of trade missions still active.
    pub active_missions: u32,
}

/// What an administrative reset discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResetReport {
    /// Tick the engine was on before the reset.
    pub previous_tick: u64,
    /// Snapshots removed across all systems.
    pub snapshots_cleared: u64,
    /// World events removed.
    pub events_cleared: u64,
    /// Wall-clock time of the reset.
    pub reset_at: DateTime<Utc>,
}

/// A consistent view of the whole world as of one completed tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldView {
    /// The tick this view was taken at.
    pub tick: u64,
    /// The world as of that tick.
    pub world: WorldState,
}
