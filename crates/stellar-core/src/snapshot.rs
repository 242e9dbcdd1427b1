//! Bounded per-system history of market snapshots.
//!
//! Each system keeps at most `capacity` snapshots, oldest first. Capturing
//! into a full history evicts the oldest entry. Ticks within one history
//! are strictly increasing: a capture whose tick does not exceed the newest
//! stored tick is rejected and leaves the history unchanged.

use std::collections::{BTreeMap, VecDeque};

use chrono::Utc;
use stellar_types::{MarketSnapshot, MarketState, SystemId};

/// Errors raised by the snapshot store.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// A capture would break the strictly-increasing tick order.
    #[error("snapshot tick {tick} for system {system_id} is not after newest tick {newest}")]
    NonIncreasingTick {
        /// The system being captured.
        system_id: SystemId,
        /// The rejected tick.
        tick: u64,
        /// The newest tick already stored.
        newest: u64,
    },

    /// The store was configured with zero capacity.
    #[error("snapshot capacity must be at least 1")]
    ZeroCapacity,
}

/// Per-system bounded snapshot rings.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    /// Maximum snapshots per system.
    capacity: usize,
    /// Histories keyed by system, each oldest first.
    histories: BTreeMap<SystemId, VecDeque<MarketSnapshot>>,
}

impl SnapshotStore {
    /// Create an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::ZeroCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, SnapshotError> {
        if capacity == 0 {
            return Err(SnapshotError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            histories: BTreeMap::new(),
        })
    }

    /// Maximum snapshots retained per system.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a snapshot of `market` tagged with `tick`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NonIncreasingTick`] if `tick` is not
    /// strictly greater than the newest stored tick for this system.
    pub fn capture(&mut self, market: &MarketState, tick: u64) -> Result<(), SnapshotError> {
        let history = self.histories.entry(market.system_id).or_default();
        if let Some(newest) = history.back().map(|snapshot| snapshot.tick) {
            if tick <= newest {
                return Err(SnapshotError::NonIncreasingTick {
                    system_id: market.system_id,
                    tick,
                    newest,
                });
            }
        }

        while history.len() >= self.capacity {
            history.pop_front();
        }
        history.push_back(MarketSnapshot {
            system_id: market.system_id,
            tick,
            captured_at: Utc::now(),
            goods: market.goods.clone(),
        });
        Ok(())
    }

    /// The system's history, oldest first. Empty for unknown systems.
    pub fn read(&self, system_id: SystemId) -> Vec<MarketSnapshot> {
        self.histories
            .get(&system_id)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every system's history, oldest first.
    pub fn read_all(&self) -> BTreeMap<SystemId, Vec<MarketSnapshot>> {
        self.histories
            .iter()
            .map(|(id, history)| (*id, history.iter().cloned().collect()))
            .collect()
    }

    /// Total snapshots held across all systems.
    pub fn len(&self) -> usize {
        self.histories.values().map(VecDeque::len).sum()
    }

    /// Whether no snapshots are held.
    pub fn is_empty(&self) -> bool {
        self.histories.values().all(VecDeque::is_empty)
    }

    /// Drop every history.
    pub fn clear(&mut self) {
        self.histories.clear();
    }
}
