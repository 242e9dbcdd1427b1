//! Tick counter and wall-clock source for the economy.
//!
//! The [`TickCounter`] is the engine's logical clock: it advances exactly
//! once per completed tick and only moves backwards through
//! [`TickCounter::reset`]. The [`ClockSource`] is the only thing allowed to
//! drive advancement; it wraps a Tokio interval so that each firing hands
//! off to the single scheduling loop.
//!
//! # Design Principles
//!
//! - Advancement uses checked arithmetic (no silent overflow).
//! - Snapshot cadence is derived from the tick number, never stored.
//! - Missed firings are skipped, not replayed: a stalled process resumes
//!   with one tick per firing instead of a catch-up burst.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Invalid clock configuration (e.g. a zero period).
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Monotonic logical clock of the economy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickCounter {
    /// Number of completed ticks since start or the last reset.
    tick: u64,
}

impl TickCounter {
    /// Create a counter at tick 0.
    pub const fn new() -> Self {
        Self { tick: 0 }
    }

    /// Create a counter at an explicit tick (state restoration and tests).
    pub const fn from_tick(tick: u64) -> Self {
        Self { tick }
    }

    /// Advance the counter by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// Return the current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Return the counter to tick 0.
    pub const fn reset(&mut self) {
        self.tick = 0;
    }

    /// Whether the current tick is a snapshot tick for the given cadence.
    ///
    /// Tick 0 is never a snapshot tick: the first capture happens on the
    /// first multiple of `interval` after start or reset.
    pub fn is_snapshot_tick(&self, interval: u64) -> bool {
        self.tick > 0 && self.tick.checked_rem(interval) == Some(0)
    }
}

/// Fixed-period wall-clock source driving the scheduling loop.
///
/// The first firing happens one full period after construction, so a
/// freshly started engine never ticks immediately.
#[derive(Debug)]
pub struct ClockSource {
    /// Underlying Tokio interval.
    interval: Interval,
    /// Configured period between firings.
    period: Duration,
}

impl ClockSource {
    /// Create a clock source firing every `period`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `period` is zero.
    pub fn new(period: Duration) -> Result<Self, ClockError> {
        if period.is_zero() {
            return Err(ClockError::InvalidConfig {
                reason: "tick period must be greater than zero".to_owned(),
            });
        }

        let first = Instant::now()
            .checked_add(period)
            .ok_or_else(|| ClockError::InvalidConfig {
                reason: "tick period too large".to_owned(),
            })?;
        let mut interval = tokio::time::interval_at(first, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Ok(Self { interval, period })
    }

    /// Wait for the next firing. Returns the instant it was scheduled for.
    pub async fn fire(&mut self) -> Instant {
        self.interval.tick().await
    }

    /// Return the configured period.
    pub const fn period(&self) -> Duration {
        self.period
    }
}
