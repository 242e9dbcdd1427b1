//! Loading the seed world from `PostgreSQL`.

use futures::future::BoxFuture;
use sqlx::PgPool;
use stellar_core::{Seed, SeedError, SeedSource};
use stellar_types::WorldState;

use crate::error::DbError;
use crate::rows::{EventRow, FleetRow, MarketGoodRow, MissionRow, SystemRow, assemble_world};
use crate::sink::committed_tick;

/// A [`SeedSource`] reading every economy table.
#[derive(Debug, Clone)]
pub struct PgSeedSource {
    pool: PgPool,
}

impl PgSeedSource {
    /// Create a seed source over `pool`.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read every table and assemble the world.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a query fails or a row is invalid.
    pub async fn load_world(&self) -> Result<WorldState, DbError> {
        let systems = sqlx::query_as::<_, SystemRow>(
            "SELECT id, name FROM star_systems ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let goods = sqlx::query_as::<_, MarketGoodRow>(
            "SELECT system_id, good, base_price, current_price, supply, demand
             FROM market_goods ORDER BY system_id, good",
        )
        .fetch_all(&self.pool)
        .await?;

        let fleets = sqlx::query_as::<_, FleetRow>(
            "SELECT id, player_id, name, position FROM fleets ORDER BY player_id",
        )
        .fetch_all(&self.pool)
        .await?;

        let missions = sqlx::query_as::<_, MissionRow>(
            "SELECT id, player_id, fleet_id, good, quantity, destination, progress,
                    required_ticks, deadline_tick, status
             FROM trade_missions ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let events = sqlx::query_as::<_, EventRow>(
            "SELECT id, kind, scope, started_at_tick, expires_at_tick
             FROM world_events ORDER BY started_at_tick, id",
        )
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(
            systems = systems.len(),
            fleets = fleets.len(),
            missions = missions.len(),
            events = events.len(),
            "Loaded economy seed rows"
        );

        assemble_world(systems, goods, fleets, missions, events)
    }

    /// Load the world together with the last tick persisted for it.
    ///
    /// An empty `economy_state` means the world has never ticked.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a query fails or a row is invalid.
    pub async fn load_seed(&self) -> Result<Seed, DbError> {
        let world = self.load_world().await?;
        let tick = committed_tick(&self.pool).await?.unwrap_or(0);
        if tick > 0 {
            tracing::info!(tick, "Resuming economy from persisted tick");
        }
        Ok(Seed::resumed(world, tick))
    }
}

impl SeedSource for PgSeedSource {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn load(&self) -> BoxFuture<'_, Result<Seed, SeedError>> {
        Box::pin(async move {
            self.load_seed().await.map_err(|err| match err {
                DbError::Corrupt(reason) => SeedError::Invalid { reason },
                DbError::Serialization(e) => SeedError::Invalid {
                    reason: e.to_string(),
                },
                other => SeedError::Unavailable {
                    message: other.to_string(),
                },
            })
        })
    }
}
