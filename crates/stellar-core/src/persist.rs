//! Write-behind persistence of committed ticks.
//!
//! After every tick the engine hands the committed world to a
//! [`WriteBehind`] writer, outside the world lock. The writer holds only
//! the latest record: if the sink is slower than the tick cadence,
//! intermediate ticks are superseded rather than queued, and a crash loses
//! at most the write in flight.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use stellar_types::WorldState;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Errors a sink can report.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The backing store rejected or failed the write.
    #[error("persistence backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },

    /// The record could not be encoded for storage.
    #[error("failed to encode tick record: {message}")]
    Encode {
        /// Description of the failure.
        message: String,
    },
}

/// A committed tick ready to be written.
#[derive(Debug, Clone)]
pub struct TickRecord {
    /// The tick that was committed.
    pub tick: u64,
    /// The world as of the end of that tick.
    pub world: Arc<WorldState>,
    /// Wall-clock commit time.
    pub committed_at: DateTime<Utc>,
}

/// A destination for committed ticks.
pub trait TickSink: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Write one committed tick.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if the write fails. The writer logs the
    /// error and keeps running.
    fn persist<'a>(&'a self, record: &'a TickRecord) -> BoxFuture<'a, Result<(), PersistError>>;
}

/// Background writer feeding a [`TickSink`] with the latest record.
#[derive(Debug)]
pub struct WriteBehind {
    /// Latest-value slot shared with the writer task.
    tx: watch::Sender<Option<Arc<TickRecord>>>,
    /// The writer task.
    task: JoinHandle<()>,
}

impl WriteBehind {
    /// Spawn the writer task for `sink`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(sink: Arc<dyn TickSink>) -> Self {
        let (tx, mut rx) = watch::channel::<Option<Arc<TickRecord>>>(None);
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let latest = rx.borrow_and_update().clone();
                let Some(record) = latest else {
                    continue;
                };
                match sink.persist(&record).await {
                    Ok(()) => debug!(tick = record.tick, sink = sink.name(), "Tick persisted"),
                    Err(err) => {
                        warn!(tick = record.tick, sink = sink.name(), %err, "Tick persistence failed");
                    }
                }
            }
            debug!(sink = sink.name(), "Write-behind writer stopped");
        });
        Self { tx, task }
    }

    /// Replace the pending record with `record`.
    pub fn submit(&self, record: TickRecord) {
        self.tx.send_replace(Some(Arc::new(record)));
    }

    /// Stop accepting records and wait for the last one to be written.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(err) = self.task.await {
            warn!(%err, "Write-behind writer panicked");
        }
    }
}

/// A sink that keeps persisted ticks in memory.
///
/// Useful for embedding the engine without a database, and in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Ticks written, in write order.
    ticks: Mutex<Vec<u64>>,
    /// The most recent world written.
    latest: Mutex<Option<Arc<WorldState>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks written so far, in write order.
    pub async fn ticks(&self) -> Vec<u64> {
        self.ticks.lock().await.clone()
    }

    /// The most recently written world.
    pub async fn latest(&self) -> Option<Arc<WorldState>> {
        self.latest.lock().await.clone()
    }
}

impl TickSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn persist<'a>(&'a self, record: &'a TickRecord) -> BoxFuture<'a, Result<(), PersistError>> {
        Box::pin(async move {
            self.ticks.lock().await.push(record.tick);
            *self.latest.lock().await = Some(Arc::clone(&record.world));
            Ok(())
        })
    }
}
