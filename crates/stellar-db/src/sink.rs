//! Write-behind persistence of committed ticks to `PostgreSQL`.
//!
//! Each record is written in a single transaction: market goods, fleets,
//! and missions are upserted, the world event table is replaced, and the
//! persisted tick number is updated. A failed write rolls back entirely,
//! so the tables always describe one committed tick.

use futures::future::BoxFuture;
use sqlx::PgPool;
use stellar_core::{PersistError, TickRecord, TickSink};

use crate::error::DbError;
use crate::rows::{to_i32, to_i64};

/// A [`TickSink`] writing to the economy tables.
#[derive(Debug, Clone)]
pub struct PgTickSink {
    pool: PgPool,
}

impl PgTickSink {
    /// Create a sink over `pool`.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write one record in a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if any statement fails; nothing is committed.
    pub async fn write(&self, record: &TickRecord) -> Result<(), DbError> {
        let world = &record.world;
        let mut tx = self.pool.begin().await?;

        for market in world.markets.values() {
            sqlx::query(
                "INSERT INTO star_systems (id, name) VALUES ($1, $2)
                 ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
            )
            .bind(market.system_id.into_inner())
            .bind(&market.name)
            .execute(&mut *tx)
            .await?;

            for (good, state) in &market.goods {
                sqlx::query(
                    "INSERT INTO market_goods
                       (system_id, good, base_price, current_price, supply, demand)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     ON CONFLICT (system_id, good) DO UPDATE SET
                       base_price = EXCLUDED.base_price,
                       current_price = EXCLUDED.current_price,
                       supply = EXCLUDED.supply,
                       demand = EXCLUDED.demand",
                )
                .bind(market.system_id.into_inner())
                .bind(good.as_str())
                .bind(state.base_price)
                .bind(state.current_price)
                .bind(state.supply)
                .bind(state.demand)
                .execute(&mut *tx)
                .await?;
            }
        }

        for fleet in world.fleets.values() {
            sqlx::query(
                "INSERT INTO fleets (id, player_id, name, position) VALUES ($1, $2, $3, $4)
                 ON CONFLICT (id) DO UPDATE SET
                   name = EXCLUDED.name,
                   position = EXCLUDED.position",
            )
            .bind(fleet.fleet_id.into_inner())
            .bind(fleet.player_id.into_inner())
            .bind(&fleet.name)
            .bind(serde_json::to_value(fleet.position)?)
            .execute(&mut *tx)
            .await?;
        }

        for mission in world.missions.values() {
            sqlx::query(
                "INSERT INTO trade_missions
                   (id, player_id, fleet_id, good, quantity, destination, progress,
                    required_ticks, deadline_tick, status)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 ON CONFLICT (id) DO UPDATE SET
                   progress = EXCLUDED.progress,
                   status = EXCLUDED.status",
            )
            .bind(mission.mission_id.into_inner())
            .bind(mission.player_id.into_inner())
            .bind(mission.fleet_id.into_inner())
            .bind(mission.good.as_str())
            .bind(to_i32(mission.quantity, "quantity")?)
            .bind(mission.destination.into_inner())
            .bind(to_i32(mission.progress, "progress")?)
            .bind(to_i32(mission.required_ticks, "required_ticks")?)
            .bind(to_i64(mission.deadline_tick, "deadline_tick")?)
            .bind(mission.status.as_str())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM world_events")
            .execute(&mut *tx)
            .await?;
        for event in &world.events {
            sqlx::query(
                "INSERT INTO world_events (id, kind, scope, started_at_tick, expires_at_tick)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(event.id.into_inner())
            .bind(serde_json::to_value(event.kind)?)
            .bind(serde_json::to_value(event.scope)?)
            .bind(to_i64(event.started_at_tick, "started_at_tick")?)
            .bind(to_i64(event.expires_at_tick, "expires_at_tick")?)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO economy_state (id, tick, updated_at) VALUES (1, $1, $2)
             ON CONFLICT (id) DO UPDATE SET tick = EXCLUDED.tick, updated_at = EXCLUDED.updated_at",
        )
        .bind(to_i64(record.tick, "tick")?)
        .bind(record.committed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// The last persisted tick, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn persisted_tick(&self) -> Result<Option<u64>, DbError> {
        committed_tick(&self.pool).await
    }
}

/// Read the tick recorded in `economy_state`, if any.
pub(crate) async fn committed_tick(pool: &PgPool) -> Result<Option<u64>, DbError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT tick FROM economy_state WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    row.map(|(tick,)| crate::rows::to_u64(tick, "tick"))
        .transpose()
}

impl TickSink for PgTickSink {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn persist<'a>(&'a self, record: &'a TickRecord) -> BoxFuture<'a, Result<(), PersistError>> {
        Box::pin(async move {
            self.write(record).await.map_err(|err| match err {
                DbError::Serialization(e) => PersistError::Encode {
                    message: e.to_string(),
                },
                other => PersistError::Backend {
                    message: other.to_string(),
                },
            })
        })
    }
}
