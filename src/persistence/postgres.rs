//! PostgreSQL implementation of the persistence layer.
//!
//! Entities are stored as JSONB documents keyed by their natural id. Rows
//! that no longer deserialize are logged and skipped on load rather than
//! failing startup.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{PersistedState, StateStore};
use crate::domain::{LadderType, RaidLaunch, RankKey, RankState, TriggerKind, TriggerRecord};
use crate::error::HeraldError;

/// PostgreSQL-backed [`StateStore`] using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::PersistenceError`] if the connection or a
    /// migration fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, HeraldError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| HeraldError::PersistenceError(e.to_string()))?;
        Ok(Self::new(pool))
    }

    async fn load_triggers(
        &self,
        kind: TriggerKind,
    ) -> Result<Vec<(String, Option<TriggerRecord>)>, HeraldError> {
        let sql = format!("SELECT id, record FROM {} ORDER BY id", kind.table());
        let rows = sqlx::query_as::<_, (String, Option<serde_json::Value>)>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, record)| match record {
                None => Some((id, None)),
                Some(json) => decode::<TriggerRecord>(kind.table(), &id, json)
                    .map(|record| (id, Some(record))),
            })
            .collect())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<serde_json::Value, HeraldError> {
    serde_json::to_value(value).map_err(|e| HeraldError::Internal(e.to_string()))
}

fn decode<T: DeserializeOwned>(table: &str, id: &str, json: serde_json::Value) -> Option<T> {
    match serde_json::from_value(json) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(table, id, error = %e, "skipping undecodable row");
            None
        }
    }
}

#[async_trait]
impl StateStore for PostgresStore {
    async fn save_trigger(
        &self,
        kind: TriggerKind,
        id: &str,
        record: Option<&TriggerRecord>,
    ) -> Result<(), HeraldError> {
        let json = record.map(encode).transpose()?;
        let sql = format!(
            "INSERT INTO {} (id, record, updated_at) VALUES ($1, $2, now()) \
             ON CONFLICT (id) DO UPDATE SET record = EXCLUDED.record, updated_at = now()",
            kind.table()
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(json)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_rank_state(&self, key: &RankKey, state: &RankState) -> Result<(), HeraldError> {
        sqlx::query(
            "INSERT INTO rank_tracking (player_id, ladder, state, updated_at) \
             VALUES ($1, $2, $3, now()) \
             ON CONFLICT (player_id, ladder) DO UPDATE SET state = EXCLUDED.state, updated_at = now()",
        )
        .bind(&key.player_id)
        .bind(key.ladder.as_str())
        .bind(encode(state)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_raid(&self, guild_id: &str, raid: &RaidLaunch) -> Result<(), HeraldError> {
        sqlx::query(
            "INSERT INTO raid_launches (guild_id, raid, updated_at) VALUES ($1, $2, now()) \
             ON CONFLICT (guild_id) DO UPDATE SET raid = EXCLUDED.raid, updated_at = now()",
        )
        .bind(guild_id)
        .bind(encode(raid)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<PersistedState, HeraldError> {
        let guild_triggers = self.load_triggers(TriggerKind::GuildReset).await?;
        let personal_triggers = self.load_triggers(TriggerKind::PersonalReset).await?;

        let rank_rows = sqlx::query_as::<_, (String, String, serde_json::Value)>(
            "SELECT player_id, ladder, state FROM rank_tracking ORDER BY player_id, ladder",
        )
        .fetch_all(&self.pool)
        .await?;
        let rank_states = rank_rows
            .into_iter()
            .filter_map(|(player_id, ladder, json)| {
                let ladder = match ladder.parse::<LadderType>() {
                    Ok(ladder) => ladder,
                    Err(e) => {
                        tracing::error!(%player_id, error = %e, "skipping rank row with unknown ladder");
                        return None;
                    }
                };
                let state = decode::<RankState>("rank_tracking", &player_id, json)?;
                Some((RankKey::new(player_id, ladder), state))
            })
            .collect();

        let raid_rows = sqlx::query_as::<_, (String, serde_json::Value)>(
            "SELECT guild_id, raid FROM raid_launches ORDER BY guild_id",
        )
        .fetch_all(&self.pool)
        .await?;
        let raids = raid_rows
            .into_iter()
            .filter_map(|(guild_id, json)| {
                decode::<RaidLaunch>("raid_launches", &guild_id, json).map(|raid| (guild_id, raid))
            })
            .collect();

        Ok(PersistedState {
            guild_triggers,
            personal_triggers,
            rank_states,
            raids,
        })
    }
}
