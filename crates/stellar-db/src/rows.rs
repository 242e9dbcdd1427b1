//! Row types for the economy tables and their conversion to and from the
//! domain types in `stellar-types`.
//!
//! Unsigned domain integers are stored in signed `PostgreSQL` columns. A
//! negative value read back is reported as [`DbError::Corrupt`] rather
//! than wrapped.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use stellar_types::{
    ActiveEvent, EventId, FleetId, FleetState, Good, GoodMarket, MarketState, MissionId,
    MissionStatus, PlayerId, SystemId, TradeMissionState, WorldState,
};
use uuid::Uuid;

use crate::error::DbError;

/// A row of `star_systems`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SystemRow {
    /// System ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
}

/// A row of `market_goods`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MarketGoodRow {
    /// Owning system.
    pub system_id: Uuid,
    /// Stable good name.
    pub good: String,
    /// Long-run equilibrium price.
    pub base_price: Decimal,
    /// Current quoted price.
    pub current_price: Decimal,
    /// Supply factor.
    pub supply: Decimal,
    /// Demand factor.
    pub demand: Decimal,
}

/// A row of `fleets`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FleetRow {
    /// Fleet ID.
    pub id: Uuid,
    /// Owning player.
    pub player_id: Uuid,
    /// Display name.
    pub name: String,
    /// JSON-encoded [`stellar_types::FleetPosition`].
    pub position: serde_json::Value,
}

/// A row of `trade_missions`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MissionRow {
    /// Mission ID.
    pub id: Uuid,
    /// Owning player.
    pub player_id: Uuid,
    /// Carrying fleet.
    pub fleet_id: Uuid,
    /// Stable good name.
    pub good: String,
    /// Units of cargo.
    pub quantity: i32,
    /// Destination system.
    pub destination: Uuid,
    /// Ticks of work completed.
    pub progress: i32,
    /// Ticks of work required.
    pub required_ticks: i32,
    /// Last tick on which delivery counts.
    pub deadline_tick: i64,
    /// Stable status name.
    pub status: String,
}

/// A row of `world_events`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Event ID.
    pub id: Uuid,
    /// JSON-encoded [`stellar_types::EventKind`].
    pub kind: serde_json::Value,
    /// JSON-encoded [`stellar_types::EventScope`].
    pub scope: serde_json::Value,
    /// Start tick.
    pub started_at_tick: i64,
    /// Expiry tick.
    pub expires_at_tick: i64,
}

// =========================================================================
// Integer conversions
// =========================================================================

/// Read a non-negative `INTEGER` column as `u32`.
pub(crate) fn to_u32(value: i32, column: &str) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|e| DbError::Corrupt(format!("{column} = {value}: {e}")))
}

/// Read a non-negative `BIGINT` column as `u64`.
pub(crate) fn to_u64(value: i64, column: &str) -> Result<u64, DbError> {
    u64::try_from(value).map_err(|e| DbError::Corrupt(format!("{column} = {value}: {e}")))
}

/// Store a `u32` in an `INTEGER` column.
pub(crate) fn to_i32(value: u32, column: &str) -> Result<i32, DbError> {
    i32::try_from(value).map_err(|e| DbError::Corrupt(format!("{column} = {value}: {e}")))
}

/// Store a `u64` in a `BIGINT` column.
pub(crate) fn to_i64(value: u64, column: &str) -> Result<i64, DbError> {
    i64::try_from(value).map_err(|e| DbError::Corrupt(format!("{column} = {value}: {e}")))
}

fn parse_good(name: &str) -> Result<Good, DbError> {
    Good::parse(name).ok_or_else(|| DbError::Corrupt(format!("unknown good {name:?}")))
}

// =========================================================================
// Row -> domain
// =========================================================================

impl FleetRow {
    /// Convert to a [`FleetState`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if the position JSON is invalid.
    pub fn into_fleet(self) -> Result<FleetState, DbError> {
        Ok(FleetState {
            fleet_id: FleetId::from(self.id),
            player_id: PlayerId::from(self.player_id),
            name: self.name,
            position: serde_json::from_value(self.position)?,
        })
    }
}

impl MissionRow {
    /// Convert to a [`TradeMissionState`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Corrupt`] for unknown goods or statuses and
    /// negative counters.
    pub fn into_mission(self) -> Result<TradeMissionState, DbError> {
        Ok(TradeMissionState {
            mission_id: MissionId::from(self.id),
            player_id: PlayerId::from(self.player_id),
            fleet_id: FleetId::from(self.fleet_id),
            good: parse_good(&self.good)?,
            quantity: to_u32(self.quantity, "quantity")?,
            destination: SystemId::from(self.destination),
            progress: to_u32(self.progress, "progress")?,
            required_ticks: to_u32(self.required_ticks, "required_ticks")?,
            deadline_tick: to_u64(self.deadline_tick, "deadline_tick")?,
            status: MissionStatus::parse(&self.status)
                .ok_or_else(|| DbError::Corrupt(format!("unknown status {:?}", self.status)))?,
        })
    }
}

impl EventRow {
    /// Convert to an [`ActiveEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] for invalid JSON or
    /// [`DbError::Corrupt`] for negative ticks.
    pub fn into_event(self) -> Result<ActiveEvent, DbError> {
        Ok(ActiveEvent {
            id: EventId::from(self.id),
            kind: serde_json::from_value(self.kind)?,
            scope: serde_json::from_value(self.scope)?,
            started_at_tick: to_u64(self.started_at_tick, "started_at_tick")?,
            expires_at_tick: to_u64(self.expires_at_tick, "expires_at_tick")?,
        })
    }
}

/// Assemble a [`WorldState`] from the rows of every economy table.
///
/// # Errors
///
/// Returns [`DbError::Corrupt`] if a good row references a missing system,
/// or any row conversion error.
pub fn assemble_world(
    systems: Vec<SystemRow>,
    goods: Vec<MarketGoodRow>,
    fleets: Vec<FleetRow>,
    missions: Vec<MissionRow>,
    events: Vec<EventRow>,
) -> Result<WorldState, DbError> {
    let mut markets: BTreeMap<SystemId, MarketState> = systems
        .into_iter()
        .map(|row| {
            let system_id = SystemId::from(row.id);
            (
                system_id,
                MarketState {
                    system_id,
                    name: row.name,
                    goods: BTreeMap::new(),
                },
            )
        })
        .collect();

    for row in goods {
        let system_id = SystemId::from(row.system_id);
        let market = markets
            .get_mut(&system_id)
            .ok_or_else(|| DbError::Corrupt(format!("goods row for unknown system {system_id}")))?;
        market.goods.insert(
            parse_good(&row.good)?,
            GoodMarket {
                base_price: row.base_price,
                current_price: row.current_price,
                supply: row.supply,
                demand: row.demand,
            },
        );
    }

    let fleets = fleets
        .into_iter()
        .map(|row| row.into_fleet().map(|fleet| (fleet.player_id, fleet)))
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    let missions = missions
        .into_iter()
        .map(|row| row.into_mission().map(|m| (m.mission_id, m)))
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    let events = events
        .into_iter()
        .map(EventRow::into_event)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WorldState {
        markets,
        events,
        fleets,
        missions,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stellar_types::{EventKind, EventScope, FleetPosition};

    use super::*;

    #[test]
    fn assembles_world_from_rows() {
        let system = Uuid::now_v7();
        let player = Uuid::now_v7();
        let fleet = Uuid::now_v7();
        let world = assemble_world(
            vec![SystemRow {
                id: system,
                name: String::from("Sol"),
            }],
            vec![MarketGoodRow {
                system_id: system,
                good: String::from("fuel"),
                base_price: Decimal::new(30, 0),
                current_price: Decimal::new(31, 0),
                supply: Decimal::ONE,
                demand: Decimal::ONE,
            }],
            vec![FleetRow {
                id: fleet,
                player_id: player,
                name: String::from("Heron"),
                position: serde_json::json!({ "status": "docked", "system_id": system }),
            }],
            vec![MissionRow {
                id: Uuid::now_v7(),
                player_id: player,
                fleet_id: fleet,
                good: String::from("fuel"),
                quantity: 10,
                destination: system,
                progress: 1,
                required_ticks: 3,
                deadline_tick: 40,
                status: String::from("active"),
            }],
            vec![EventRow {
                id: Uuid::now_v7(),
                kind: serde_json::json!({ "type": "shortage", "good": "fuel" }),
                scope: serde_json::json!({ "scope": "galaxy" }),
                started_at_tick: 2,
                expires_at_tick: 9,
            }],
        )
        .unwrap();

        let market = world.markets.get(&SystemId::from(system)).unwrap();
        assert_eq!(
            market.goods.get(&Good::Fuel).unwrap().current_price,
            Decimal::new(31, 0)
        );
        let fleet_state = world.fleets.get(&PlayerId::from(player)).unwrap();
        assert_eq!(
            fleet_state.position,
            FleetPosition::Docked {
                system_id: SystemId::from(system)
            }
        );
        assert_eq!(world.missions.len(), 1);
        let event = world.events.first().unwrap();
        assert_eq!(event.kind, EventKind::Shortage { good: Good::Fuel });
        assert_eq!(event.scope, EventScope::Galaxy);
    }

    #[test]
    fn goods_for_unknown_system_are_corrupt() {
        let result = assemble_world(
            Vec::new(),
            vec![MarketGoodRow {
                system_id: Uuid::now_v7(),
                good: String::from("ore"),
                base_price: Decimal::ONE,
                current_price: Decimal::ONE,
                supply: Decimal::ONE,
                demand: Decimal::ONE,
            }],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        assert!(matches!(result, Err(DbError::Corrupt(_))));
    }

    #[test]
    fn negative_counters_are_corrupt() {
        assert!(to_u32(-1, "progress").is_err());
        assert!(to_u64(-5, "deadline_tick").is_err());
        assert_eq!(to_i64(7, "tick").unwrap(), 7);
        assert!(to_i32(u32::MAX, "quantity").is_err());
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let row = MissionRow {
            id: Uuid::now_v7(),
            player_id: Uuid::now_v7(),
            fleet_id: Uuid::now_v7(),
            good: String::from("ore"),
            quantity: 1,
            destination: Uuid::now_v7(),
            progress: 0,
            required_ticks: 1,
            deadline_tick: 1,
            status: String::from("abandoned"),
        };
        assert!(matches!(row.into_mission(), Err(DbError::Corrupt(_))));
    }
}
