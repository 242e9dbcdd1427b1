//! The scheduling loop.
//!
//! One loop task runs per started engine. Each clock firing executes exactly
//! one tick; firings missed while a tick (or a reset) held the gate are
//! skipped by the clock rather than replayed. The loop exits when the
//! shutdown signal flips or its sender is dropped, then flushes the
//! write-behind writer.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::clock::ClockSource;
use crate::engine::TickEngine;
use crate::persist::WriteBehind;

/// Drive `engine` from `clock` until `shutdown` fires.
pub(crate) async fn run_loop(
    engine: Arc<TickEngine>,
    mut clock: ClockSource,
    mut shutdown: watch::Receiver<bool>,
    writer: Option<WriteBehind>,
) {
    info!(
        period_ms = u64::try_from(clock.period().as_millis()).unwrap_or(u64::MAX),
        "Scheduling loop started"
    );

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = clock.fire() => {
                match engine.run_tick(writer.is_some()).await {
                    Ok((summary, record)) => {
                        debug!(
                            tick = summary.tick,
                            failed_stages = summary.failed_stages(),
                            snapshots = summary.snapshots_captured,
                            events_started = summary.totals.events_started,
                            missions_completed = summary.totals.missions_completed,
                            "Tick completed"
                        );
                        if let (Some(writer), Some(record)) = (&writer, record) {
                            writer.submit(record);
                        }
                    }
                    Err(err) => warn!(%err, "Tick aborted"),
                }
            }
        }
    }

    if let Some(writer) = writer {
        writer.close().await;
    }
    info!(tick = engine.current_tick(), "Scheduling loop stopped");
}
