//! Event lifecycle: expire finished world events and roll for new ones.
//!
//! The roll uses a random generator seeded from the configured event seed
//! and the tick number, so replaying the same ticks from the same seed
//! starts the same events.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stellar_types::{ActiveEvent, EventId, EventKind, EventScope, Good, WorldState};
use tracing::info;

use super::{Stage, StageError, StageReport};
use crate::config::EventConfig;

/// Golden-ratio multiplier used to spread tick numbers across seeds.
const TICK_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// One in this many new events is galaxy-wide; the rest hit one system.
const GALAXY_SCOPE_ODDS: u32 = 4;

/// Events after this tick's lifecycle pass.
#[derive(Debug, Clone)]
pub struct EventSlice {
    /// Events still active, in activation order.
    pub retained: Vec<ActiveEvent>,
    /// How many events expired this tick.
    pub expired: u32,
    /// The event that started this tick, if any.
    pub started: Option<ActiveEvent>,
}

/// Expires and triggers world events.
#[derive(Debug, Clone)]
pub struct EventLifecycle {
    /// Triggering policy.
    config: EventConfig,
}

impl EventLifecycle {
    /// Create the stage with the given policy.
    pub const fn new(config: EventConfig) -> Self {
        Self { config }
    }

    /// Deterministic generator for `tick`.
    fn rng_for(&self, tick: u64) -> StdRng {
        StdRng::seed_from_u64(self.config.seed ^ tick.wrapping_mul(TICK_SEED_MIX))
    }

    /// Roll for a new event on `tick`.
    fn roll(
        &self,
        world: &WorldState,
        active: usize,
        tick: u64,
    ) -> Result<Option<ActiveEvent>, StageError> {
        if active >= self.config.max_active || self.config.trigger_chance_percent == 0 {
            return Ok(None);
        }

        let mut rng = self.rng_for(tick);
        if !rng.random_ratio(self.config.trigger_chance_percent.min(100), 100) {
            return Ok(None);
        }

        let good = Good::ALL
            .get(rng.random_range(0..Good::ALL.len()))
            .copied()
            .unwrap_or(Good::Ore);
        let kind = match rng.random_range(0..5_u8) {
            0 => EventKind::Shortage { good },
            1 => EventKind::Surplus { good },
            2 => EventKind::Embargo,
            3 => EventKind::Boom,
            _ => EventKind::PirateRaid,
        };

        let galaxy_wide = rng.random_ratio(1, GALAXY_SCOPE_ODDS);
        let scope = if galaxy_wide || world.markets.is_empty() {
            EventScope::Galaxy
        } else {
            world
                .markets
                .keys()
                .nth(rng.random_range(0..world.markets.len()))
                .map_or(EventScope::Galaxy, |id| EventScope::System(*id))
        };

        let duration =
            rng.random_range(self.config.min_duration_ticks..=self.config.max_duration_ticks);
        let expires_at_tick = tick
            .checked_add(duration)
            .ok_or_else(|| StageError::overflow("event expiry tick"))?;
        let id = EventId::from(uuid::Builder::from_random_bytes(rng.random()).into_uuid());

        Ok(Some(ActiveEvent {
            id,
            kind,
            scope,
            started_at_tick: tick,
            expires_at_tick,
        }))
    }
}

impl Stage for EventLifecycle {
    type Slice = EventSlice;

    fn name(&self) -> &'static str {
        "event_lifecycle"
    }

    fn run(&self, world: &WorldState, tick: u64) -> Result<EventSlice, StageError> {
        let (retained, expired): (Vec<ActiveEvent>, Vec<ActiveEvent>) = world
            .events
            .iter()
            .cloned()
            .partition(|event| !event.is_expired(tick));
        let started = self.roll(world, retained.len(), tick)?;

        Ok(EventSlice {
            retained,
            expired: u32::try_from(expired.len()).unwrap_or(u32::MAX),
            started,
        })
    }

    fn commit(&self, world: &mut WorldState, slice: EventSlice) -> StageReport {
        let mut events = slice.retained;
        let events_started = if let Some(event) = slice.started {
            info!(
                event_id = %event.id,
                kind = event.kind.name(),
                scope = ?event.scope,
                expires_at_tick = event.expires_at_tick,
                "World event started"
            );
            events.push(event);
            1
        } else {
            0
        };
        world.events = events;

        StageReport {
            events_started,
            events_expired: slice.expired,
            ..StageReport::default()
        }
    }
}
