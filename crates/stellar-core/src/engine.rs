//! The tick engine: lifecycle, single-flight tick execution, reset, and
//! read accessors.
//!
//! A [`TickEngine`] is constructed once, wrapped in an [`Arc`], and shared
//! with every collaborator (the HTTP surface, the binary, tests). Nothing
//! about it is global: two engines in one process are fully independent.
//!
//! # Lifecycle
//!
//! ```text
//! NotStarted --start(LongLivedServer)--> Running --shutdown--> Stopped
//!                                          |  ^
//!                                          +--+ reset
//! ```
//!
//! `start` serializes on a lifecycle mutex, so concurrent callers spawn
//! exactly one scheduling loop. Ticks and resets both take the exclusive
//! world gate; accessors take the shared gate and always see the state as
//! of a completed tick.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::Utc;
use stellar_types::{
    ActiveEvent, EngineStatus, EngineStatusReport, FleetState, MarketSnapshot, MarketState,
    MissionStatus, PlayerId, ResetReport, SystemId, TradeMissionState, WorldView,
};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{ClockError, ClockSource};
use crate::config::{ConfigError, EconomyConfig, RuntimeCapability};
use crate::persist::{TickRecord, TickSink, WriteBehind};
use crate::runner;
use crate::seed::{self, SeedError, SeedSource};
use crate::snapshot::SnapshotError;
use crate::stage::StagePipeline;
use crate::store::WorldStore;
use crate::tick::{self, TickError, TickSummary};

/// Errors returned by engine lifecycle and administrative operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The configuration failed validation.
    #[error("invalid engine configuration: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The snapshot store could not be created.
    #[error("snapshot store error: {source}")]
    Snapshot {
        /// The underlying snapshot error.
        #[from]
        source: SnapshotError,
    },

    /// The clock source could not be created.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The seed world could not be loaded.
    #[error("seed error: {source}")]
    Seed {
        /// The underlying seed error.
        #[from]
        source: SeedError,
    },

    /// The operation needs a seeded engine.
    #[error("engine has not been started")]
    NotStarted,

    /// The engine was shut down and cannot be started again.
    #[error("engine has been stopped")]
    Stopped,
}

/// What a call to [`TickEngine::start`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The seed was loaded and the scheduling loop spawned.
    Started,
    /// The engine was already running; nothing changed.
    AlreadyRunning,
    /// The caller is not a long-lived server; nothing changed.
    Skipped,
}

const STATUS_NOT_STARTED: u8 = 0;
const STATUS_RUNNING: u8 = 1;
const STATUS_STOPPED: u8 = 2;

const fn encode_status(status: EngineStatus) -> u8 {
    match status {
        EngineStatus::NotStarted => STATUS_NOT_STARTED,
        EngineStatus::Running => STATUS_RUNNING,
        EngineStatus::Stopped => STATUS_STOPPED,
    }
}

const fn decode_status(raw: u8) -> EngineStatus {
    match raw {
        STATUS_RUNNING => EngineStatus::Running,
        STATUS_STOPPED => EngineStatus::Stopped,
        _ => EngineStatus::NotStarted,
    }
}

/// State owned by whoever holds the lifecycle mutex.
#[derive(Debug, Default)]
struct Lifecycle {
    /// Signals the scheduling loop to stop.
    shutdown: Option<watch::Sender<bool>>,
    /// The scheduling loop task.
    task: Option<JoinHandle<()>>,
}

/// The economy's tick engine.
pub struct TickEngine {
    /// Validated configuration.
    config: EconomyConfig,
    /// Where the initial world comes from.
    seed_source: Arc<dyn SeedSource>,
    /// Optional write-behind destination.
    sink: Option<Arc<dyn TickSink>>,
    /// Stages run on every tick.
    pipeline: StagePipeline,
    /// The world gate.
    store: WorldStore,
    /// Lock-free mirror of the lifecycle status.
    status: AtomicU8,
    /// Serializes start and shutdown.
    lifecycle: Mutex<Lifecycle>,
}

impl core::fmt::Debug for TickEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TickEngine")
            .field("status", &self.status())
            .field("tick", &self.current_tick())
            .field("seed_source", &self.seed_source.name())
            .field("sink", &self.sink.as_ref().map(|s| s.name()))
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl TickEngine {
    /// Create an engine with the standard stage pipeline and no sink.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if `config` fails validation.
    pub fn new(config: EconomyConfig, seed_source: Arc<dyn SeedSource>) -> Result<Self, EngineError> {
        config.validate()?;
        let store = WorldStore::new(config.engine.max_snapshots)?;
        let pipeline = StagePipeline::standard(&config);
        Ok(Self {
            config,
            seed_source,
            sink: None,
            pipeline,
            store,
            status: AtomicU8::new(encode_status(EngineStatus::NotStarted)),
            lifecycle: Mutex::new(Lifecycle::default()),
        })
    }

    /// Replace the stage pipeline.
    #[must_use]
    pub fn with_stages(mut self, pipeline: StagePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Persist every committed tick to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn TickSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The configuration this engine runs with.
    pub const fn config(&self) -> &EconomyConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start the engine if the caller is a long-lived server.
    ///
    /// Idempotent: a second call while running returns
    /// [`StartOutcome::AlreadyRunning`] and never spawns a second loop. A
    /// short-lived caller gets [`StartOutcome::Skipped`] and nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Seed`] if the seed cannot be loaded (status
    /// stays `NotStarted`), or [`EngineError::Stopped`] after shutdown.
    pub async fn start(
        self: &Arc<Self>,
        capability: RuntimeCapability,
    ) -> Result<StartOutcome, EngineError> {
        if capability == RuntimeCapability::ShortLived {
            debug!("Short-lived runtime, tick engine not started");
            return Ok(StartOutcome::Skipped);
        }

        let mut lifecycle = self.lifecycle.lock().await;
        match self.status() {
            EngineStatus::Running => return Ok(StartOutcome::AlreadyRunning),
            EngineStatus::Stopped => return Err(EngineError::Stopped),
            EngineStatus::NotStarted => {}
        }

        let loaded = self.seed_source.load().await?;
        seed::validate_world(&loaded.world)?;
        let clock = ClockSource::new(self.config.engine.tick_period())?;

        let (systems, fleets, missions, resumed_at) = (
            loaded.world.markets.len(),
            loaded.world.fleets.len(),
            loaded.world.missions.len(),
            loaded.tick,
        );
        {
            let mut inner = self.store.write().await;
            inner.install_seed(loaded);
            self.store.publish(&inner);
        }
        self.set_status(EngineStatus::Running);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let writer = self.sink.clone().map(WriteBehind::spawn);
        let task = tokio::spawn(runner::run_loop(
            Arc::clone(self),
            clock,
            shutdown_rx,
            writer,
        ));
        lifecycle.shutdown = Some(shutdown_tx);
        lifecycle.task = Some(task);

        info!(
            seed_source = self.seed_source.name(),
            systems,
            fleets,
            missions,
            resumed_at,
            tick_interval_ms = self.config.engine.tick_interval_ms,
            "Tick engine started"
        );
        Ok(StartOutcome::Started)
    }

    /// Stop the scheduling loop and wait for it to exit.
    ///
    /// Only the lifecycle owner (the binary) should call this. A no-op
    /// unless the engine is running.
    pub async fn shutdown(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if self.status() != EngineStatus::Running {
            return;
        }

        if let Some(tx) = lifecycle.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = lifecycle.task.take() {
            if let Err(err) = task.await {
                warn!(%err, "Scheduling loop panicked");
            }
        }
        self.set_status(EngineStatus::Stopped);
        info!(tick = self.current_tick(), "Tick engine stopped");
    }

    /// Current lifecycle status.
    pub fn status(&self) -> EngineStatus {
        decode_status(self.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: EngineStatus) {
        self.status.store(encode_status(status), Ordering::Release);
    }

    // -----------------------------------------------------------------------
    // Tick execution
    // -----------------------------------------------------------------------

    /// Execute one tick under the exclusive gate.
    ///
    /// Returns the summary and, when `want_record` is set, a copy of the
    /// committed world for the write-behind sink.
    pub(crate) async fn run_tick(
        &self,
        want_record: bool,
    ) -> Result<(TickSummary, Option<TickRecord>), TickError> {
        let mut inner = self.store.write().await;
        let summary = tick::execute(
            &mut inner,
            &self.pipeline,
            self.config.engine.snapshot_interval_ticks,
        )?;
        self.store.publish(&inner);

        let record = want_record.then(|| TickRecord {
            tick: summary.tick,
            world: Arc::new(inner.world.clone()),
            committed_at: Utc::now(),
        });
        drop(inner);
        Ok((summary, record))
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Restore the seed world, zero the tick counter, and clear every
    /// snapshot history.
    ///
    /// Waits for any in-progress tick; no tick observes a partial reset.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotStarted`] if no seed has been loaded yet.
    pub async fn reset(&self) -> Result<ResetReport, EngineError> {
        let mut inner = self.store.write().await;
        let seed = inner.seed.clone().ok_or(EngineError::NotStarted)?;

        let report = ResetReport {
            previous_tick: inner.counter.tick(),
            snapshots_cleared: u64::try_from(inner.snapshots.len()).unwrap_or(u64::MAX),
            events_cleared: u64::try_from(inner.world.events.len()).unwrap_or(u64::MAX),
            reset_at: Utc::now(),
        };
        inner.world = (*seed).clone();
        inner.counter.reset();
        inner.snapshots.clear();
        self.store.publish(&inner);
        drop(inner);

        info!(
            previous_tick = report.previous_tick,
            snapshots_cleared = report.snapshots_cleared,
            "Economy reset to seed"
        );
        Ok(report)
    }

    /// Every system's snapshot history, oldest first.
    pub async fn snapshot_histories(&self) -> BTreeMap<SystemId, Vec<MarketSnapshot>> {
        self.store.read().await.snapshots.read_all()
    }

    /// One system's snapshot history, oldest first. Empty if unknown.
    pub async fn snapshot_history(&self, system_id: SystemId) -> Vec<MarketSnapshot> {
        self.store.read().await.snapshots.read(system_id)
    }

    // -----------------------------------------------------------------------
    // Read accessors
    // -----------------------------------------------------------------------

    /// The last completed tick. Lock-free.
    pub fn current_tick(&self) -> u64 {
        self.store.published_tick()
    }

    /// Status, tick, and world counts in one consistent read.
    pub async fn status_report(&self) -> EngineStatusReport {
        let inner = self.store.read().await;
        let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        EngineStatusReport {
            status: self.status(),
            tick: inner.counter.tick(),
            tick_interval_ms: self.config.engine.tick_interval_ms,
            systems: count(inner.world.markets.len()),
            active_events: count(inner.world.events.len()),
            fleets: count(inner.world.fleets.len()),
            active_missions: count(
                inner
                    .world
                    .missions
                    .values()
                    .filter(|m| m.status == MissionStatus::Active)
                    .count(),
            ),
        }
    }

    /// World events in effect, in activation order.
    pub async fn active_events(&self) -> Vec<ActiveEvent> {
        self.store.read().await.world.events.clone()
    }

    /// Every fleet, ordered by owning player.
    pub async fn fleets(&self) -> Vec<FleetState> {
        self.store.read().await.world.fleets.values().cloned().collect()
    }

    /// A player's fleet.
    pub async fn fleet(&self, player_id: PlayerId) -> Option<FleetState> {
        self.store.read().await.world.fleets.get(&player_id).cloned()
    }

    /// Every market, ordered by system.
    pub async fn markets(&self) -> Vec<MarketState> {
        self.store.read().await.world.markets.values().cloned().collect()
    }

    /// One system's market.
    pub async fn market(&self, system_id: SystemId) -> Option<MarketState> {
        self.store.read().await.world.markets.get(&system_id).cloned()
    }

    /// Trade missions, optionally only those of one player.
    pub async fn missions(&self, player_id: Option<PlayerId>) -> Vec<TradeMissionState> {
        self.store
            .read()
            .await
            .world
            .missions
            .values()
            .filter(|m| player_id.is_none_or(|p| m.player_id == p))
            .cloned()
            .collect()
    }

    /// The whole world and its tick from one consistent read.
    pub async fn view(&self) -> WorldView {
        let inner = self.store.read().await;
        WorldView {
            tick: inner.counter.tick(),
            world: inner.world.clone(),
        }
    }
}
