//! `PostgreSQL` persistence for the Stellar Exchange economy.
//!
//! The tick engine talks to storage through two narrow seams defined in
//! `stellar-core`: a seed source read once at start, and a tick sink
//! written behind every committed tick. This crate implements both over
//! one [`sqlx`] pool.
//!
//! ```text
//! start()      --> PgSeedSource::load  <-- star_systems, market_goods,
//!                                          fleets, trade_missions, world_events
//! every tick   --> PgTickSink::persist --> same tables + economy_state
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- Connection pool and migrations
//! - [`rows`] -- Row types and conversion to domain types
//! - [`seed`] -- The seed source
//! - [`sink`] -- The write-behind tick sink
//! - [`error`] -- Shared error type

pub mod error;
pub mod postgres;
pub mod rows;
pub mod seed;
pub mod sink;

pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool};
pub use seed::PgSeedSource;
pub use sink::PgTickSink;
