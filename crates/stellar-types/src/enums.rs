//! Enumeration types for the Stellar Exchange economy.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::SystemId;

// ---------------------------------------------------------------------------
// Tradable goods
// ---------------------------------------------------------------------------

/// A good that can be bought and sold on a star system's market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Good {
    /// Unrefined asteroid ore.
    Ore,
    /// Starship fuel.
    Fuel,
    /// Foodstuffs for station crews.
    Food,
    /// Potable water.
    Water,
    /// Consumer and ship electronics.
    Electronics,
    /// Medical supplies.
    Medicine,
    /// High-value luxury goods.
    Luxuries,
}

impl Good {
    /// Every tradable good, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Ore,
        Self::Fuel,
        Self::Food,
        Self::Water,
        Self::Electronics,
        Self::Medicine,
        Self::Luxuries,
    ];

    /// Stable lowercase name used in storage and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ore => "ore",
            Self::Fuel => "fuel",
            Self::Food => "food",
            Self::Water => "water",
            Self::Electronics => "electronics",
            Self::Medicine => "medicine",
            Self::Luxuries => "luxuries",
        }
    }

    /// Parse a good from its stable name. Returns `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|good| good.as_str() == name)
    }
}

impl core::fmt::Display for Good {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// World events
// ---------------------------------------------------------------------------

/// What a world event does to the economy while it is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// A single good is scarce; its price climbs.
    Shortage {
        /// The scarce good.
        good: Good,
    },
    /// A single good is overabundant; its price falls.
    Surplus {
        /// The overabundant good.
        good: Good,
    },
    /// Trade restrictions raise every price in scope.
    Embargo,
    /// Economic boom lifts demand for every good in scope.
    Boom,
    /// Pirates prey on inbound traffic; fleets bound for the scope stall.
    PirateRaid,
}

impl EventKind {
    /// Stable lowercase name used in storage and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Shortage { .. } => "shortage",
            Self::Surplus { .. } => "surplus",
            Self::Embargo => "embargo",
            Self::Boom => "boom",
            Self::PirateRaid => "pirate_raid",
        }
    }
}

/// Where a world event applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "scope", content = "system_id", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventScope {
    /// A single star system.
    System(SystemId),
    /// Every star system.
    Galaxy,
}

impl EventScope {
    /// Whether this scope covers the given system.
    pub fn covers(self, system_id: SystemId) -> bool {
        match self {
            Self::System(id) => id == system_id,
            Self::Galaxy => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Missions and engine lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle status of a trade mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MissionStatus {
    /// The mission is still progressing.
    Active,
    /// Cargo was delivered before the deadline.
    Completed,
    /// The deadline passed or the fleet was lost.
    Failed,
}

impl MissionStatus {
    /// Stable lowercase name used in storage and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a status from its stable name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Lifecycle status of the tick engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EngineStatus {
    /// The engine has been constructed but its loop has not been spawned.
    NotStarted,
    /// The scheduling loop is advancing the world.
    Running,
    /// The scheduling loop has been shut down.
    Stopped,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn good_names_round_trip() {
        for good in Good::ALL {
            assert_eq!(Good::parse(good.as_str()), Some(good));
        }
        assert_eq!(Good::parse("unobtainium"), None);
    }

    #[test]
    fn galaxy_scope_covers_every_system() {
        assert!(EventScope::Galaxy.covers(SystemId::new()));
    }

    #[test]
    fn system_scope_covers_only_its_system() {
        let here = SystemId::new();
        let scope = EventScope::System(here);
        assert!(scope.covers(here));
        assert!(!scope.covers(SystemId::new()));
    }

    #[test]
    fn event_kind_serializes_with_type_tag() {
        let json = serde_json::to_value(EventKind::Shortage { good: Good::Fuel }).unwrap();
        assert_eq!(json["type"], "shortage");
        assert_eq!(json["good"], "fuel");
    }

    #[test]
    fn engine_status_serializes_snake_case() {
        let json = serde_json::to_string(&EngineStatus::NotStarted).unwrap();
        assert_eq!(json, "\"not_started\"");
    }
}
