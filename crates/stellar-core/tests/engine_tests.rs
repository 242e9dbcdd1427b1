//! Engine-level behavior: idempotent start, snapshot cadence, reset
//! atomicity, consistent reads and write-behind persistence.
//!
//! Scheduling tests run on a paused Tokio clock so a minute of simulated
//! time takes no wall-clock time.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use stellar_core::stage::{Stage, StageError, StagePipeline, StageReport};
use stellar_core::{
    EconomyConfig, MemorySink, RuntimeCapability, StartOutcome, StarterGalaxy, TickEngine,
    TickSink,
};
use stellar_types::{ActiveEvent, EngineStatus, EventId, EventKind, EventScope, WorldState};

fn config(tick_interval_ms: u64) -> EconomyConfig {
    let mut config = EconomyConfig::default();
    config.engine.tick_interval_ms = tick_interval_ms;
    config
}

fn engine_with(config: EconomyConfig, galaxy: StarterGalaxy) -> Arc<TickEngine> {
    Arc::new(TickEngine::new(config, Arc::new(galaxy)).unwrap())
}

async fn snapshot_ticks(engine: &TickEngine) -> Vec<Vec<u64>> {
    engine
        .snapshot_histories()
        .await
        .values()
        .map(|history| history.iter().map(|s| s.tick).collect())
        .collect()
}

// =========================================================================
// Start
// =========================================================================

#[tokio::test(start_paused = true)]
async fn concurrent_starts_spawn_one_loop() {
    let racing = engine_with(config(1000), StarterGalaxy::new());
    let single = engine_with(config(1000), StarterGalaxy::new());

    let outcomes = futures::future::join_all(
        (0..8).map(|_| racing.start(RuntimeCapability::LongLivedServer)),
    )
    .await;
    single.start(RuntimeCapability::LongLivedServer).await.unwrap();

    let started = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(StartOutcome::Started)))
        .count();
    let already = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(StartOutcome::AlreadyRunning)))
        .count();
    assert_eq!(started, 1);
    assert_eq!(already, 7);
    assert_eq!(racing.status(), EngineStatus::Running);

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(racing.current_tick(), 10);
    assert_eq!(racing.current_tick(), single.current_tick());

    racing.shutdown().await;
    single.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn first_tick_waits_a_full_period() {
    let engine = engine_with(config(5000), StarterGalaxy::new());
    engine.start(RuntimeCapability::LongLivedServer).await.unwrap();
    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert_eq!(engine.current_tick(), 0);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(engine.current_tick(), 1);
    engine.shutdown().await;
}

// =========================================================================
// Snapshots
// =========================================================================

#[tokio::test(start_paused = true)]
async fn sixty_ticks_keep_the_last_two_snapshots() {
    let mut cfg = config(1000);
    cfg.engine.snapshot_interval_ticks = 20;
    cfg.engine.max_snapshots = 2;
    let engine = engine_with(cfg, StarterGalaxy::new());
    engine.start(RuntimeCapability::LongLivedServer).await.unwrap();

    tokio::time::sleep(Duration::from_millis(60_500)).await;
    assert_eq!(engine.current_tick(), 60);

    let histories = snapshot_ticks(&engine).await;
    assert_eq!(histories.len(), 5);
    for ticks in histories {
        assert_eq!(ticks, vec![40, 60]);
    }
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_system_history_is_empty() {
    let engine = engine_with(config(1000), StarterGalaxy::new());
    engine.start(RuntimeCapability::LongLivedServer).await.unwrap();
    let history = engine
        .snapshot_history(stellar_types::SystemId::new())
        .await;
    assert!(history.is_empty());
    engine.shutdown().await;
}

// =========================================================================
// Reset
// =========================================================================

#[tokio::test(start_paused = true)]
async fn reset_right_after_start_leaves_tick_zero() {
    let galaxy = StarterGalaxy::new();
    let seed = galaxy.world().clone();
    let engine = engine_with(config(5000), galaxy);
    engine.start(RuntimeCapability::LongLivedServer).await.unwrap();

    let report = engine.reset().await.unwrap();
    assert_eq!(report.previous_tick, 0);
    assert_eq!(engine.current_tick(), 0);

    let view = engine.view().await;
    assert_eq!(view.tick, 0);
    assert_eq!(view.world, seed);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn reset_restores_seed_and_clears_history() {
    let galaxy = StarterGalaxy::new();
    let seed = galaxy.world().clone();
    let mut cfg = config(1000);
    cfg.engine.snapshot_interval_ticks = 5;
    let engine = engine_with(cfg, galaxy);
    engine.start(RuntimeCapability::LongLivedServer).await.unwrap();

    tokio::time::sleep(Duration::from_millis(12_500)).await;
    assert_eq!(engine.current_tick(), 12);

    let report = engine.reset().await.unwrap();
    assert_eq!(report.previous_tick, 12);
    assert_eq!(report.snapshots_cleared, 10);
    assert_eq!(engine.current_tick(), 0);
    assert!(engine.snapshot_histories().await.is_empty());
    assert_eq!(engine.view().await.world, seed);
    assert_eq!(engine.status(), EngineStatus::Running);

    // The loop keeps running and counts up from zero again.
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(engine.current_tick(), 1);
    engine.shutdown().await;
}

/// Holds the write gate for a while on tick 1, then stamps names like
/// [`StampNames`].
struct SlowFirstTick {
    entered: Arc<AtomicBool>,
}

impl Stage for SlowFirstTick {
    type Slice = String;

    fn name(&self) -> &'static str {
        "slow_first_tick"
    }

    fn run(&self, _world: &WorldState, tick: u64) -> Result<String, StageError> {
        if tick == 1 {
            self.entered.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(100));
        }
        Ok(tick.to_string())
    }

    fn commit(&self, world: &mut WorldState, slice: String) -> StageReport {
        StampNames.commit(world, slice)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reset_waits_for_the_running_tick() {
    let galaxy = StarterGalaxy::new();
    let seed = galaxy.world().clone();
    let entered = Arc::new(AtomicBool::new(false));
    let engine = Arc::new(
        TickEngine::new(config(200), Arc::new(galaxy))
            .unwrap()
            .with_stages(StagePipeline::empty().with(SlowFirstTick {
                entered: Arc::clone(&entered),
            })),
    );
    engine.start(RuntimeCapability::LongLivedServer).await.unwrap();

    while !entered.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    // Tick 1 is inside its stage and holds the write gate.
    let report = engine.reset().await.unwrap();
    assert_eq!(report.previous_tick, 1);

    let view = engine.view().await;
    assert_eq!(view.tick, 0);
    assert_eq!(view.world, seed);
    engine.shutdown().await;
}

// =========================================================================
// Resuming a persisted world
// =========================================================================

fn resumed_galaxy() -> StarterGalaxy {
    let mut world = StarterGalaxy::new().world().clone();
    world.events.push(ActiveEvent {
        id: EventId::new(),
        kind: EventKind::Boom,
        scope: EventScope::Galaxy,
        started_at_tick: 1000,
        expires_at_tick: 1005,
    });
    StarterGalaxy::from_world(world).at_tick(1000)
}

fn quiet_config(tick_interval_ms: u64) -> EconomyConfig {
    let mut cfg = config(tick_interval_ms);
    cfg.events.trigger_chance_percent = 0;
    cfg
}

#[tokio::test(start_paused = true)]
async fn resumed_world_keeps_counting_from_its_tick() {
    let engine = engine_with(quiet_config(1000), resumed_galaxy());
    engine.start(RuntimeCapability::LongLivedServer).await.unwrap();
    assert_eq!(engine.current_tick(), 1000);

    tokio::time::sleep(Duration::from_millis(4_500)).await;
    assert_eq!(engine.current_tick(), 1004);
    assert_eq!(engine.active_events().await.len(), 1);

    // The five-tick event ends on schedule, not a thousand ticks late.
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(engine.current_tick(), 1005);
    assert!(engine.active_events().await.is_empty());
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn reset_of_resumed_world_replays_from_zero() {
    let engine = engine_with(quiet_config(1000), resumed_galaxy());
    engine.start(RuntimeCapability::LongLivedServer).await.unwrap();
    tokio::time::sleep(Duration::from_millis(6_500)).await;

    let report = engine.reset().await.unwrap();
    assert_eq!(report.previous_tick, 1006);
    assert_eq!(engine.current_tick(), 0);
    let events = engine.active_events().await;
    let boom = events.first().unwrap();
    assert_eq!((boom.started_at_tick, boom.expires_at_tick), (0, 5));

    tokio::time::sleep(Duration::from_millis(5_000)).await;
    assert_eq!(engine.current_tick(), 5);
    assert!(engine.active_events().await.is_empty());
    engine.shutdown().await;
}

// =========================================================================
// Consistent reads
// =========================================================================

/// Stamps the tick number into every market and fleet name.
struct StampNames;

impl Stage for StampNames {
    type Slice = String;

    fn name(&self) -> &'static str {
        "stamp_names"
    }

    fn run(&self, _world: &WorldState, tick: u64) -> Result<String, StageError> {
        Ok(tick.to_string())
    }

    fn commit(&self, world: &mut WorldState, slice: String) -> StageReport {
        for market in world.markets.values_mut() {
            market.name.clone_from(&slice);
        }
        for fleet in world.fleets.values_mut() {
            fleet.name.clone_from(&slice);
        }
        StageReport::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_a_partial_tick() {
    let engine = Arc::new(
        TickEngine::new(config(2), Arc::new(StarterGalaxy::new()))
            .unwrap()
            .with_stages(StagePipeline::empty().with(StampNames)),
    );
    engine.start(RuntimeCapability::LongLivedServer).await.unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                for _ in 0..200 {
                    let view = engine.view().await;
                    if view.tick > 0 {
                        let expected = view.tick.to_string();
                        assert!(view.world.markets.values().all(|m| m.name == expected));
                        assert!(view.world.fleets.values().all(|f| f.name == expected));
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for reader in readers {
        reader.await.unwrap();
    }
    engine.shutdown().await;
}

// =========================================================================
// Persistence
// =========================================================================

#[tokio::test(start_paused = true)]
async fn committed_ticks_reach_the_sink() {
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(
        TickEngine::new(config(1000), Arc::new(StarterGalaxy::new()))
            .unwrap()
            .with_sink(Arc::clone(&sink) as Arc<dyn TickSink>),
    );
    engine.start(RuntimeCapability::LongLivedServer).await.unwrap();
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    engine.shutdown().await;

    let ticks = sink.ticks().await;
    assert_eq!(ticks.last(), Some(&3));
    assert!(ticks.windows(2).all(|w| w.first() < w.last()));
    assert!(sink.latest().await.is_some());
}
