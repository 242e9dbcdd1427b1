//! Simulation stages applied in a fixed order on every tick.
//!
//! A [`Stage`] is split into a pure `run` step that reads the world and
//! computes a slice of new state, and a `commit` step that writes the slice
//! back. A failing `run` therefore leaves the world untouched for that stage:
//! the pipeline records the failure and moves on to the next stage, which
//! reads the state left by the stages that did succeed.
//!
//! The default pipeline is [`MarketPricing`] → [`EventLifecycle`] →
//! [`FleetProgression`].

pub mod events;
pub mod fleets;
pub mod market;

use stellar_types::{SystemId, WorldState};
use tracing::warn;

pub use events::EventLifecycle;
pub use fleets::FleetProgression;
pub use market::MarketPricing;

use crate::config::EconomyConfig;

/// Errors a stage can raise while computing its slice.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// Decimal arithmetic overflowed.
    #[error("arithmetic overflow in {context}")]
    Overflow {
        /// What was being computed.
        context: String,
    },

    /// The world references a star system that has no market.
    #[error("unknown system {system_id}")]
    UnknownSystem {
        /// The missing system.
        system_id: SystemId,
    },

    /// Any other stage-specific failure.
    #[error("{message}")]
    Failed {
        /// Description of the failure.
        message: String,
    },
}

impl StageError {
    /// Shorthand for an [`StageError::Overflow`].
    pub fn overflow(context: impl Into<String>) -> Self {
        Self::Overflow {
            context: context.into(),
        }
    }
}

/// Counts a committed stage reports back to the tick summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Goods whose price was recomputed.
    pub prices_updated: u32,
    /// World events that began this tick.
    pub events_started: u32,
    /// World events that expired this tick.
    pub events_expired: u32,
    /// Fleets that docked at their destination this tick.
    pub fleets_arrived: u32,
    /// Trade missions completed this tick.
    pub missions_completed: u32,
    /// Trade missions failed this tick.
    pub missions_failed: u32,
}

/// One deterministic transformation of the world.
pub trait Stage: Send + Sync {
    /// The portion of world state this stage produces.
    type Slice;

    /// Stable stage name for logs and summaries.
    fn name(&self) -> &'static str;

    /// Compute this stage's slice from the current world and tick number.
    ///
    /// # Errors
    ///
    /// Returns [`StageError`] if the slice cannot be computed; the world is
    /// left unchanged for this stage.
    fn run(&self, world: &WorldState, tick: u64) -> Result<Self::Slice, StageError>;

    /// Write a computed slice back into the world.
    fn commit(&self, world: &mut WorldState, slice: Self::Slice) -> StageReport;
}

/// Object-safe form of [`Stage`], so stages with different slice types can
/// share one pipeline.
pub trait DynStage: Send + Sync {
    /// Stable stage name.
    fn name(&self) -> &'static str;

    /// Run and commit in one step.
    ///
    /// # Errors
    ///
    /// Returns the stage's [`StageError`]; nothing is committed in that case.
    fn apply(&self, world: &mut WorldState, tick: u64) -> Result<StageReport, StageError>;
}

impl<S: Stage> DynStage for S {
    fn name(&self) -> &'static str {
        Stage::name(self)
    }

    fn apply(&self, world: &mut WorldState, tick: u64) -> Result<StageReport, StageError> {
        let slice = self.run(world, tick)?;
        Ok(self.commit(world, slice))
    }
}

/// What happened to one stage during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    /// The stage name.
    pub stage: &'static str,
    /// Its report, or the error message if it failed.
    pub result: Result<StageReport, String>,
}

impl StageOutcome {
    /// Whether the stage committed.
    pub const fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// An ordered list of stages.
pub struct StagePipeline {
    /// Stages in execution order.
    stages: Vec<Box<dyn DynStage>>,
}

impl core::fmt::Debug for StagePipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|stage| stage.name()))
            .finish()
    }
}

impl StagePipeline {
    /// An empty pipeline.
    pub fn empty() -> Self {
        Self { stages: Vec::new() }
    }

    /// The default pipeline: market pricing, event lifecycle, fleet and
    /// mission progression.
    pub fn standard(config: &EconomyConfig) -> Self {
        Self::empty()
            .with(MarketPricing::new(config.market.clone()))
            .with(EventLifecycle::new(config.events.clone()))
            .with(FleetProgression)
    }

    /// Append a stage.
    #[must_use]
    pub fn with(mut self, stage: impl DynStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Stage names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Apply every stage in order. A failing stage is logged and skipped.
    pub fn apply(&self, world: &mut WorldState, tick: u64) -> Vec<StageOutcome> {
        self.stages
            .iter()
            .map(|stage| {
                let result = stage.apply(world, tick).map_err(|err| {
                    warn!(tick, stage = stage.name(), %err, "Stage failed, slice discarded");
                    err.to_string()
                });
                StageOutcome {
                    stage: stage.name(),
                    result,
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stellar_types::{FleetId, FleetPosition, FleetState, PlayerId};

    use super::*;

    /// A stage that always fails.
    struct Broken;

    impl Stage for Broken {
        type Slice = ();

        fn name(&self) -> &'static str {
            "broken"
        }

        fn run(&self, _world: &WorldState, _tick: u64) -> Result<(), StageError> {
            Err(StageError::Failed {
                message: String::from("boom"),
            })
        }

        fn commit(&self, _world: &mut WorldState, _slice: ()) -> StageReport {
            StageReport::default()
        }
    }

    /// A stage that renames every fleet, to observe ordering.
    struct Rename(&'static str);

    impl Stage for Rename {
        type Slice = String;

        fn name(&self) -> &'static str {
            "rename"
        }

        fn run(&self, world: &WorldState, _tick: u64) -> Result<String, StageError> {
            let previous = world
                .fleets
                .values()
                .next()
                .map(|f| f.name.clone())
                .unwrap_or_default();
            Ok(format!("{previous}{}", self.0))
        }

        fn commit(&self, world: &mut WorldState, slice: String) -> StageReport {
            for fleet in world.fleets.values_mut() {
                fleet.name.clone_from(&slice);
            }
            StageReport::default()
        }
    }

    fn world_with_fleet() -> WorldState {
        let player_id = PlayerId::new();
        let mut world = WorldState::default();
        world.fleets.insert(
            player_id,
            FleetState {
                fleet_id: FleetId::new(),
                player_id,
                name: String::new(),
                position: FleetPosition::Docked {
                    system_id: SystemId::new(),
                },
            },
        );
        world
    }

    #[test]
    fn stages_see_earlier_commits() {
        let pipeline = StagePipeline::empty().with(Rename("a")).with(Rename("b"));
        let mut world = world_with_fleet();
        let outcomes = pipeline.apply(&mut world, 1);
        assert!(outcomes.iter().all(StageOutcome::succeeded));
        assert_eq!(world.fleets.values().next().unwrap().name, "ab");
    }

    #[test]
    fn failing_stage_does_not_stop_later_stages() {
        let pipeline = StagePipeline::empty()
            .with(Rename("a"))
            .with(Broken)
            .with(Rename("c"));
        let mut world = world_with_fleet();
        let outcomes = pipeline.apply(&mut world, 1);

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.first().unwrap().succeeded());
        assert_eq!(outcomes.get(1).unwrap().result, Err(String::from("boom")));
        assert!(outcomes.get(2).unwrap().succeeded());
        assert_eq!(world.fleets.values().next().unwrap().name, "ac");
    }

    #[test]
    fn standard_pipeline_order() {
        let pipeline = StagePipeline::standard(&EconomyConfig::default());
        assert_eq!(
            pipeline.names(),
            vec!["market_pricing", "event_lifecycle", "fleet_progression"]
        );
    }
}
