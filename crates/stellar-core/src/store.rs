//! The world state store: the single gate every read and write goes
//! through.
//!
//! [`WorldStore`] keeps the world, the tick counter, the snapshot histories
//! and the retained seed behind one [`tokio::sync::RwLock`]. Tokio's lock is
//! fair and write-preferring, so a tick or reset waiting for the write gate
//! blocks new readers instead of starving behind them. The published tick
//! is mirrored in an atomic that is only written while the write gate is
//! held.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use stellar_types::WorldState;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::clock::TickCounter;
use crate::seed::Seed;
use crate::snapshot::{SnapshotError, SnapshotStore};

/// Everything guarded by the world gate.
#[derive(Debug)]
pub struct WorldInner {
    /// The live world.
    pub world: WorldState,
    /// The logical clock.
    pub counter: TickCounter,
    /// Per-system market history.
    pub snapshots: SnapshotStore,
    /// The world restored by reset, rebased to tick 0; `None` until the
    /// first start.
    pub seed: Option<Arc<WorldState>>,
}

impl WorldInner {
    /// Install a freshly loaded seed, replacing any existing state.
    ///
    /// The live world resumes at the seed's committed tick. The copy kept
    /// for reset is rebased to tick 0, matching the counter after a reset.
    pub fn install_seed(&mut self, seed: Seed) {
        self.seed = Some(Arc::new(seed.rebased()));
        self.counter = TickCounter::from_tick(seed.tick);
        self.world = seed.world;
        self.snapshots.clear();
    }
}

/// The world gate plus the lock-free tick mirror.
#[derive(Debug)]
pub struct WorldStore {
    /// Guarded state.
    inner: RwLock<WorldInner>,
    /// Last published tick.
    published_tick: AtomicU64,
}

impl WorldStore {
    /// Create an empty, unseeded store.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::ZeroCapacity`] if `snapshot_capacity` is 0.
    pub fn new(snapshot_capacity: usize) -> Result<Self, SnapshotError> {
        Ok(Self {
            inner: RwLock::new(WorldInner {
                world: WorldState::default(),
                counter: TickCounter::new(),
                snapshots: SnapshotStore::new(snapshot_capacity)?,
                seed: None,
            }),
            published_tick: AtomicU64::new(0),
        })
    }

    /// Acquire the shared gate.
    pub async fn read(&self) -> RwLockReadGuard<'_, WorldInner> {
        self.inner.read().await
    }

    /// Acquire the exclusive gate.
    pub async fn write(&self) -> RwLockWriteGuard<'_, WorldInner> {
        self.inner.write().await
    }

    /// Publish the counter held by `guard` to lock-free readers.
    ///
    /// Taking the guard proves the caller holds the write gate.
    pub fn publish(&self, guard: &RwLockWriteGuard<'_, WorldInner>) {
        self.published_tick
            .store(guard.counter.tick(), Ordering::Release);
    }

    /// The last published tick, without touching the gate.
    pub fn published_tick(&self) -> u64 {
        self.published_tick.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_mirrors_counter() {
        let store = WorldStore::new(4).unwrap();
        {
            let mut guard = store.write().await;
            guard.counter.advance().unwrap();
            guard.counter.advance().unwrap();
            assert_eq!(store.published_tick(), 0);
            store.publish(&guard);
        }
        assert_eq!(store.published_tick(), 2);
        assert_eq!(store.read().await.counter.tick(), 2);
    }

    #[tokio::test]
    async fn install_seed_resets_dependents() {
        let store = WorldStore::new(4).unwrap();
        let mut guard = store.write().await;
        guard.counter.advance().unwrap();
        guard.install_seed(Seed::fresh(WorldState::default()));
        assert_eq!(guard.counter.tick(), 0);
        assert!(guard.snapshots.is_empty());
        assert!(guard.seed.is_some());
    }

    #[tokio::test]
    async fn resumed_seed_continues_its_tick() {
        let store = WorldStore::new(4).unwrap();
        let mut guard = store.write().await;
        guard.install_seed(Seed::resumed(WorldState::default(), 1000));
        assert_eq!(guard.counter.tick(), 1000);
        store.publish(&guard);
        drop(guard);
        assert_eq!(store.published_tick(), 1000);
    }

    #[tokio::test]
    async fn waiting_writer_blocks_new_readers() {
        let store = Arc::new(WorldStore::new(4).unwrap());
        let first_reader = store.read().await;

        let writer_store = Arc::clone(&store);
        let writer = tokio::spawn(async move {
            let mut guard = writer_store.write().await;
            guard.counter.advance().unwrap();
            writer_store.publish(&guard);
        });
        // Let the writer queue up behind the first reader.
        tokio::task::yield_now().await;

        let reader_store = Arc::clone(&store);
        let late_reader = tokio::spawn(async move { reader_store.read().await.counter.tick() });
        tokio::task::yield_now().await;

        drop(first_reader);
        writer.await.unwrap();
        // The late reader queued after the writer, so it sees the write.
        assert_eq!(late_reader.await.unwrap(), 1);
    }
}
