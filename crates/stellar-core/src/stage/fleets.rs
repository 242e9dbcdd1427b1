//! Fleet and trade-mission progression.
//!
//! In-transit fleets advance one tick of travel per tick and dock when the
//! journey is complete. A pirate raid covering the destination stalls every
//! fleet bound there. Active missions then advance against the fleets'
//! new positions: a mission completes once its work is done and its fleet
//! is docked at the destination, and fails when the deadline passes or its
//! fleet no longer exists.

use std::collections::BTreeMap;

use stellar_types::{
    EventKind, FleetPosition, FleetState, MissionId, MissionStatus, PlayerId, SystemId,
    TradeMissionState, WorldState,
};
use tracing::{debug, info};

use super::{Stage, StageError, StageReport};

/// Fleets and missions after this tick's progression.
#[derive(Debug, Clone)]
pub struct FleetSlice {
    /// Every fleet, keyed by owning player.
    pub fleets: BTreeMap<PlayerId, FleetState>,
    /// Missions that were active at the start of the tick.
    pub missions: BTreeMap<MissionId, TradeMissionState>,
    /// Fleets that docked this tick.
    pub arrived: u32,
}

/// Moves fleets and progresses trade missions.
#[derive(Debug, Clone, Copy, Default)]
pub struct FleetProgression;

impl FleetProgression {
    /// Fail with [`StageError::UnknownSystem`] unless `system_id` has a market.
    fn ensure_known(world: &WorldState, system_id: SystemId) -> Result<(), StageError> {
        if world.markets.contains_key(&system_id) {
            Ok(())
        } else {
            Err(StageError::UnknownSystem { system_id })
        }
    }

    /// Whether a pirate raid currently covers `system_id`.
    fn raided(world: &WorldState, system_id: SystemId) -> bool {
        world
            .events_affecting(system_id)
            .any(|event| event.kind == EventKind::PirateRaid)
    }

    /// Advance one fleet. Returns the new state and whether it docked.
    fn advance_fleet(
        world: &WorldState,
        fleet: &FleetState,
    ) -> Result<(FleetState, bool), StageError> {
        match fleet.position {
            FleetPosition::Docked { system_id } => {
                Self::ensure_known(world, system_id)?;
                Ok((fleet.clone(), false))
            }
            FleetPosition::InTransit {
                from,
                to,
                progress,
                duration,
            } => {
                Self::ensure_known(world, from)?;
                Self::ensure_known(world, to)?;
                if Self::raided(world, to) {
                    return Ok((fleet.clone(), false));
                }

                let progress = progress
                    .checked_add(1)
                    .ok_or_else(|| StageError::overflow("fleet travel progress"))?;
                let (position, arrived) = if progress >= duration {
                    (FleetPosition::Docked { system_id: to }, true)
                } else {
                    (
                        FleetPosition::InTransit {
                            from,
                            to,
                            progress,
                            duration,
                        },
                        false,
                    )
                };
                Ok((
                    FleetState {
                        position,
                        ..fleet.clone()
                    },
                    arrived,
                ))
            }
        }
    }

    /// Advance one active mission against the already-moved fleets.
    fn advance_mission(
        world: &WorldState,
        fleets: &BTreeMap<PlayerId, FleetState>,
        mission: &TradeMissionState,
        tick: u64,
    ) -> Result<TradeMissionState, StageError> {
        Self::ensure_known(world, mission.destination)?;

        let fleet = fleets
            .values()
            .find(|fleet| fleet.fleet_id == mission.fleet_id);
        let progress = mission
            .progress
            .checked_add(1)
            .ok_or_else(|| StageError::overflow("mission progress"))?
            .min(mission.required_ticks);

        let status = match fleet {
            None => MissionStatus::Failed,
            Some(_) if tick > mission.deadline_tick => MissionStatus::Failed,
            Some(fleet)
                if progress >= mission.required_ticks
                    && fleet.docked_at() == Some(mission.destination) =>
            {
                MissionStatus::Completed
            }
            Some(_) => MissionStatus::Active,
        };

        Ok(TradeMissionState {
            progress,
            status,
            ..mission.clone()
        })
    }
}

impl Stage for FleetProgression {
    type Slice = FleetSlice;

    fn name(&self) -> &'static str {
        "fleet_progression"
    }

    fn run(&self, world: &WorldState, tick: u64) -> Result<FleetSlice, StageError> {
        let mut fleets = BTreeMap::new();
        let mut arrived: u32 = 0;
        for (player_id, fleet) in &world.fleets {
            let (next, docked) = Self::advance_fleet(world, fleet)?;
            if docked {
                debug!(tick, fleet_id = %next.fleet_id, "Fleet arrived");
                arrived = arrived.saturating_add(1);
            }
            fleets.insert(*player_id, next);
        }

        let mut missions = BTreeMap::new();
        for (mission_id, mission) in &world.missions {
            if mission.status != MissionStatus::Active {
                continue;
            }
            missions.insert(
                *mission_id,
                Self::advance_mission(world, &fleets, mission, tick)?,
            );
        }

        Ok(FleetSlice {
            fleets,
            missions,
            arrived,
        })
    }

    fn commit(&self, world: &mut WorldState, slice: FleetSlice) -> StageReport {
        let mut report = StageReport {
            fleets_arrived: slice.arrived,
            ..StageReport::default()
        };
        world.fleets = slice.fleets;

        for (mission_id, mission) in slice.missions {
            match mission.status {
                MissionStatus::Completed => {
                    info!(%mission_id, player_id = %mission.player_id, good = %mission.good, "Trade mission completed");
                    report.missions_completed = report.missions_completed.saturating_add(1);
                }
                MissionStatus::Failed => {
                    info!(%mission_id, player_id = %mission.player_id, "Trade mission failed");
                    report.missions_failed = report.missions_failed.saturating_add(1);
                }
                MissionStatus::Active => {}
            }
            world.missions.insert(mission_id, mission);
        }
        report
    }
}
