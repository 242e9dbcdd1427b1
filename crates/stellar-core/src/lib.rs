//! Tick engine for the Stellar Exchange economy.
//!
//! The engine advances a persistent space-trading economy at a fixed
//! wall-clock cadence, independent of request traffic. Each tick reprices
//! every market, expires and triggers world events, moves fleets and
//! progresses trade missions, and every N ticks captures a bounded market
//! history per star system.
//!
//! # Modules
//!
//! - [`clock`] -- Tick counter and the fixed-period clock source
//! - [`config`] -- YAML configuration with environment overrides
//! - [`store`] -- The world gate shared by ticks, resets and readers
//! - [`stage`] -- Simulation stages and the ordered pipeline
//! - [`snapshot`] -- Bounded per-system snapshot history
//! - [`seed`] -- Seed sources and the built-in starter galaxy
//! - [`persist`] -- Write-behind persistence of committed ticks
//! - [`tick`] -- Single-tick execution
//! - [`engine`] -- Lifecycle, reset and read accessors

pub mod clock;
pub mod config;
pub mod engine;
pub mod persist;
mod runner;
pub mod seed;
pub mod snapshot;
pub mod stage;
pub mod store;
pub mod tick;

pub use clock::{ClockError, ClockSource, TickCounter};
pub use config::{ConfigError, EconomyConfig, LogFormat, RuntimeCapability, RuntimeMode};
pub use engine::{EngineError, StartOutcome, TickEngine};
pub use persist::{MemorySink, PersistError, TickRecord, TickSink};
pub use seed::{Seed, SeedError, SeedSource, StarterGalaxy};
pub use snapshot::{SnapshotError, SnapshotStore};
pub use stage::{Stage, StageError, StagePipeline};
pub use tick::{TickError, TickSummary};
