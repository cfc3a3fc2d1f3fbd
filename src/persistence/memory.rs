//! In-process [`StateStore`] holding the latest value of every entity.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PersistedState, StateStore};
use crate::domain::{RaidLaunch, RankKey, RankState, TriggerKind, TriggerRecord};
use crate::error::HeraldError;

#[derive(Debug, Default)]
struct Tables {
    guild_triggers: BTreeMap<String, Option<TriggerRecord>>,
    personal_triggers: BTreeMap<String, Option<TriggerRecord>>,
    rank_states: BTreeMap<RankKey, RankState>,
    raids: BTreeMap<String, RaidLaunch>,
}

/// Non-durable store with the same upsert semantics as [`PostgresStore`](super::PostgresStore).
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn save_trigger(
        &self,
        kind: TriggerKind,
        id: &str,
        record: Option<&TriggerRecord>,
    ) -> Result<(), HeraldError> {
        let mut tables = self.tables.write().await;
        let table = match kind {
            TriggerKind::GuildReset => &mut tables.guild_triggers,
            TriggerKind::PersonalReset => &mut tables.personal_triggers,
        };
        table.insert(id.to_string(), record.cloned());
        Ok(())
    }

    async fn save_rank_state(&self, key: &RankKey, state: &RankState) -> Result<(), HeraldError> {
        self.tables
            .write()
            .await
            .rank_states
            .insert(key.clone(), state.clone());
        Ok(())
    }

    async fn save_raid(&self, guild_id: &str, raid: &RaidLaunch) -> Result<(), HeraldError> {
        self.tables
            .write()
            .await
            .raids
            .insert(guild_id.to_string(), raid.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<PersistedState, HeraldError> {
        let tables = self.tables.read().await;
        Ok(PersistedState {
            guild_triggers: tables.guild_triggers.clone().into_iter().collect(),
            personal_triggers: tables.personal_triggers.clone().into_iter().collect(),
            rank_states: tables.rank_states.clone().into_iter().collect(),
            raids: tables.raids.clone().into_iter().collect(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{LadderType, NotifyTarget};

    #[tokio::test]
    async fn upserts_keep_the_latest_value() {
        let store = MemoryStore::new();
        let key = RankKey::new("u1", LadderType::FleetArena);
        let mut state = RankState::new("123456789", NotifyTarget::from("c"), Utc::now());
        tokio_test::assert_ok!(store.save_rank_state(&key, &state).await);
        state.self_rank = Some(4);
        tokio_test::assert_ok!(store.save_rank_state(&key, &state).await);

        let Ok(loaded) = store.load_all().await else {
            panic!("load failed");
        };
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.rank_states.first().map(|(_, s)| s.self_rank), Some(Some(4)));
    }

    #[tokio::test]
    async fn placeholders_round_trip() {
        let store = MemoryStore::new();
        tokio_test::assert_ok!(store.save_trigger(TriggerKind::GuildReset, "g1", None).await);
        let Ok(loaded) = store.load_all().await else {
            panic!("load failed");
        };
        assert_eq!(loaded.guild_triggers, vec![("g1".to_string(), None)]);
        assert!(loaded.personal_triggers.is_empty());
    }
}
