//! Seed sources: where the initial [`WorldState`] comes from.
//!
//! The engine loads its seed exactly once, on the first successful
//! `start()`, and keeps a copy so `reset()` can restore it. A seed carries
//! the tick it was committed at, so a restarted engine resumes counting
//! where the persisted world left off. A database-backed
//! source lives in `stellar-db`; [`StarterGalaxy`] is the built-in
//! in-memory galaxy used when no database is configured.

use std::collections::BTreeMap;

use futures::future::{self, BoxFuture};
use rust_decimal::Decimal;
use stellar_types::{
    FleetId, FleetPosition, FleetState, Good, GoodMarket, MarketState, MissionId, MissionStatus,
    PlayerId, SystemId, TradeMissionState, WorldState,
};

/// Errors that can occur while loading the seed world.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// The backing store could not be reached or queried.
    #[error("seed source unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// The loaded data does not form a valid world.
    #[error("invalid seed data: {reason}")]
    Invalid {
        /// What is wrong with the data.
        reason: String,
    },
}

/// A loaded world and the tick it was committed at.
///
/// Event expiries and mission deadlines in `world` are absolute ticks on
/// the same clock as `tick`.
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    /// The world to run.
    pub world: WorldState,
    /// The last committed tick; 0 for a fresh world.
    pub tick: u64,
}

impl Seed {
    /// A world that has never ticked.
    pub const fn fresh(world: WorldState) -> Self {
        Self { world, tick: 0 }
    }

    /// A world persisted at `tick`.
    pub const fn resumed(world: WorldState, tick: u64) -> Self {
        Self { world, tick }
    }

    /// The world with every tick stamp shifted back by `tick`, so that it
    /// replays from tick 0 with the same remaining durations. Stamps already
    /// in the past clamp to 0.
    pub fn rebased(&self) -> WorldState {
        let mut world = self.world.clone();
        for event in &mut world.events {
            event.started_at_tick = event.started_at_tick.saturating_sub(self.tick);
            event.expires_at_tick = event.expires_at_tick.saturating_sub(self.tick);
        }
        for mission in world.missions.values_mut() {
            mission.deadline_tick = mission.deadline_tick.saturating_sub(self.tick);
        }
        world
    }
}

/// A provider of the initial world.
pub trait SeedSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Load the seed world and its committed tick.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError`] if the world cannot be loaded.
    fn load(&self) -> BoxFuture<'_, Result<Seed, SeedError>>;
}

/// Base prices of each good before the per-system factor.
const BASE_PRICES: [(Good, i64); 7] = [
    (Good::Ore, 12),
    (Good::Fuel, 30),
    (Good::Food, 18),
    (Good::Water, 8),
    (Good::Electronics, 120),
    (Good::Medicine, 90),
    (Good::Luxuries, 250),
];

/// Starter systems and their price factor in percent.
const SYSTEMS: [(&str, i64); 5] = [
    ("Sol", 100),
    ("Vega", 110),
    ("Altair", 90),
    ("Sirius", 125),
    ("Rigel", 80),
];

/// A small built-in galaxy: five systems, two player fleets and one active
/// trade mission.
#[derive(Debug, Clone)]
pub struct StarterGalaxy {
    /// The world handed out on every load.
    world: WorldState,
    /// The tick the world is reported as committed at.
    tick: u64,
}

impl StarterGalaxy {
    /// Build the starter galaxy. Entity IDs are generated once here, so
    /// every load of the same instance returns an identical world.
    pub fn new() -> Self {
        let mut world = WorldState::default();
        let mut system_ids = Vec::with_capacity(SYSTEMS.len());

        for (name, factor) in SYSTEMS {
            let system_id = SystemId::new();
            let goods = BASE_PRICES
                .iter()
                .map(|(good, price)| {
                    let base = Decimal::from(*price)
                        .checked_mul(Decimal::new(factor, 2))
                        .unwrap_or_else(|| Decimal::from(*price))
                        .round_dp(2);
                    (*good, GoodMarket::balanced(base))
                })
                .collect();
            world.markets.insert(
                system_id,
                MarketState {
                    system_id,
                    name: name.to_owned(),
                    goods,
                },
            );
            system_ids.push(system_id);
        }

        if let [sol, vega, altair, ..] = system_ids.as_slice() {
            let docked_player = PlayerId::new();
            world.fleets.insert(
                docked_player,
                FleetState {
                    fleet_id: FleetId::new(),
                    player_id: docked_player,
                    name: String::from("Meridian"),
                    position: FleetPosition::Docked { system_id: *sol },
                },
            );

            let hauler_player = PlayerId::new();
            let hauler = FleetId::new();
            world.fleets.insert(
                hauler_player,
                FleetState {
                    fleet_id: hauler,
                    player_id: hauler_player,
                    name: String::from("Long Haul"),
                    position: FleetPosition::InTransit {
                        from: *vega,
                        to: *altair,
                        progress: 0,
                        duration: 6,
                    },
                },
            );

            let mission_id = MissionId::new();
            world.missions.insert(
                mission_id,
                TradeMissionState {
                    mission_id,
                    player_id: hauler_player,
                    fleet_id: hauler,
                    good: Good::Medicine,
                    quantity: 25,
                    destination: *altair,
                    progress: 0,
                    required_ticks: 4,
                    deadline_tick: 30,
                    status: MissionStatus::Active,
                },
            );
        }

        Self { world, tick: 0 }
    }

    /// A source that returns a caller-provided world.
    pub const fn from_world(world: WorldState) -> Self {
        Self { world, tick: 0 }
    }

    /// Report the world as committed at `tick`, as a restarted server
    /// would see it.
    #[must_use]
    pub const fn at_tick(mut self, tick: u64) -> Self {
        self.tick = tick;
        self
    }

    /// The world this source hands out.
    pub const fn world(&self) -> &WorldState {
        &self.world
    }
}

impl Default for StarterGalaxy {
    fn default() -> Self {
        Self::new()
    }
}

impl SeedSource for StarterGalaxy {
    fn name(&self) -> &'static str {
        "starter_galaxy"
    }

    fn load(&self) -> BoxFuture<'_, Result<Seed, SeedError>> {
        Box::pin(future::ready(Ok(Seed::resumed(self.world.clone(), self.tick))))
    }
}

/// Names of the goods in a market, for validation messages.
fn missing_goods(market: &MarketState) -> Vec<Good> {
    Good::ALL
        .into_iter()
        .filter(|good| !market.goods.contains_key(good))
        .collect()
}

/// Check that a loaded world is internally consistent: every market is
/// keyed by its own system ID and lists every good, and every fleet and
/// mission points at known systems and fleets.
///
/// # Errors
///
/// Returns [`SeedError::Invalid`] describing the first problem found.
pub fn validate_world(world: &WorldState) -> Result<(), SeedError> {
    for (system_id, market) in &world.markets {
        if *system_id != market.system_id {
            return Err(SeedError::Invalid {
                reason: format!("market keyed by {system_id} belongs to {}", market.system_id),
            });
        }
        let missing = missing_goods(market);
        if !missing.is_empty() {
            return Err(SeedError::Invalid {
                reason: format!("market {} is missing goods {missing:?}", market.name),
            });
        }
    }

    let fleet_ids: BTreeMap<FleetId, PlayerId> = world
        .fleets
        .values()
        .map(|fleet| (fleet.fleet_id, fleet.player_id))
        .collect();
    for mission in world.missions.values() {
        if !world.markets.contains_key(&mission.destination) {
            return Err(SeedError::Invalid {
                reason: format!(
                    "mission {} targets unknown system {}",
                    mission.mission_id, mission.destination
                ),
            });
        }
        if mission.status == MissionStatus::Active && !fleet_ids.contains_key(&mission.fleet_id) {
            return Err(SeedError::Invalid {
                reason: format!(
                    "active mission {} references unknown fleet {}",
                    mission.mission_id, mission.fleet_id
                ),
            });
        }
    }
    Ok(())
}
