//! Single-tick execution.
//!
//! [`execute`] runs one tick against state the caller already holds
//! exclusively:
//!
//! 1. Advance the tick counter, so stages see this tick's number.
//! 2. Run the stage pipeline in order. A failing stage is skipped.
//! 3. On snapshot ticks, capture every system's market. A failed capture
//!    is logged and the tick continues.
//!
//! Publishing the counter, releasing the gate, and persistence are the
//! engine's job.

use tracing::{debug, warn};

use crate::clock::ClockError;
use crate::stage::{StageOutcome, StagePipeline, StageReport};
use crate::store::WorldInner;

/// Errors that abort a tick before any state changes.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The tick counter could not advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// Report of one completed tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick that was executed.
    pub tick: u64,
    /// Per-stage outcome, in execution order.
    pub stages: Vec<StageOutcome>,
    /// Snapshots captured this tick.
    pub snapshots_captured: u32,
    /// Snapshot captures that failed this tick.
    pub snapshot_failures: u32,
    /// Totals across every stage that committed.
    pub totals: StageReport,
}

impl TickSummary {
    /// Number of stages that failed.
    pub fn failed_stages(&self) -> usize {
        self.stages.iter().filter(|s| !s.succeeded()).count()
    }
}

/// Add `report` into `totals`.
fn accumulate(totals: &mut StageReport, report: &StageReport) {
    totals.prices_updated = totals.prices_updated.saturating_add(report.prices_updated);
    totals.events_started = totals.events_started.saturating_add(report.events_started);
    totals.events_expired = totals.events_expired.saturating_add(report.events_expired);
    totals.fleets_arrived = totals.fleets_arrived.saturating_add(report.fleets_arrived);
    totals.missions_completed = totals
        .missions_completed
        .saturating_add(report.missions_completed);
    totals.missions_failed = totals.missions_failed.saturating_add(report.missions_failed);
}

/// Execute one tick against exclusively held state.
///
/// # Errors
///
/// Returns [`TickError::Clock`] if the counter cannot advance; the world is
/// untouched in that case.
pub fn execute(
    inner: &mut WorldInner,
    pipeline: &StagePipeline,
    snapshot_interval: u64,
) -> Result<TickSummary, TickError> {
    let tick = inner.counter.advance()?;

    let stages = pipeline.apply(&mut inner.world, tick);
    let mut totals = StageReport::default();
    for report in stages.iter().filter_map(|outcome| outcome.result.as_ref().ok()) {
        accumulate(&mut totals, report);
    }

    let mut snapshots_captured: u32 = 0;
    let mut snapshot_failures: u32 = 0;
    if inner.counter.is_snapshot_tick(snapshot_interval) {
        for market in inner.world.markets.values() {
            match inner.snapshots.capture(market, tick) {
                Ok(()) => snapshots_captured = snapshots_captured.saturating_add(1),
                Err(err) => {
                    warn!(tick, system_id = %market.system_id, %err, "Snapshot capture failed");
                    snapshot_failures = snapshot_failures.saturating_add(1);
                }
            }
        }
        debug!(tick, snapshots_captured, "Market snapshots captured");
    }

    Ok(TickSummary {
        tick,
        stages,
        snapshots_captured,
        snapshot_failures,
        totals,
    })
}
