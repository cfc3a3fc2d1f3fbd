//! Persistence layer: keyed state tables behind the [`StateStore`] trait.
//!
//! Every write is a single upsert of one entity, so a crash leaves each
//! row either at its old or its new value. At startup [`StateStore::load_all`]
//! returns everything needed to rehydrate the registries.
//!
//! Implementations:
//! - [`PostgresStore`] for production, using `sqlx::PgPool`.
//! - [`MemoryStore`] for tests and local runs without a database.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{RaidLaunch, RankKey, RankState, TriggerKind, TriggerRecord};
use crate::error::HeraldError;

pub use memory::MemoryStore;
pub use models::PersistedState;
pub use postgres::PostgresStore;

/// Durable storage for triggers, rank tracking, and raid configuration.
#[async_trait]
pub trait StateStore: Send + Sync + std::fmt::Debug {
    /// Upserts the trigger slot `id` of `kind`. `None` stores a placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::PersistenceError`] on storage failure.
    async fn save_trigger(
        &self,
        kind: TriggerKind,
        id: &str,
        record: Option<&TriggerRecord>,
    ) -> Result<(), HeraldError>;

    /// Upserts one rank tracking record.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::PersistenceError`] on storage failure.
    async fn save_rank_state(&self, key: &RankKey, state: &RankState) -> Result<(), HeraldError>;

    /// Upserts one guild's raid configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::PersistenceError`] on storage failure.
    async fn save_raid(&self, guild_id: &str, raid: &RaidLaunch) -> Result<(), HeraldError>;

    /// Loads every stored entity.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::PersistenceError`] on storage failure.
    async fn load_all(&self) -> Result<PersistedState, HeraldError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Store double shared by unit tests.

    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    /// [`MemoryStore`] whose writes can be switched to fail.
    #[derive(Debug, Default)]
    pub struct FlakyStore {
        inner: MemoryStore,
        failing: AtomicBool,
    }

    impl FlakyStore {
        /// Makes every following write fail (`true`) or succeed again.
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), HeraldError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(HeraldError::PersistenceError("connection reset".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl StateStore for FlakyStore {
        async fn save_trigger(
            &self,
            kind: TriggerKind,
            id: &str,
            record: Option<&TriggerRecord>,
        ) -> Result<(), HeraldError> {
            self.check()?;
            self.inner.save_trigger(kind, id, record).await
        }

        async fn save_rank_state(&self, key: &RankKey, state: &RankState) -> Result<(), HeraldError> {
            self.check()?;
            self.inner.save_rank_state(key, state).await
        }

        async fn save_raid(&self, guild_id: &str, raid: &RaidLaunch) -> Result<(), HeraldError> {
            self.check()?;
            self.inner.save_raid(guild_id, raid).await
        }

        async fn load_all(&self) -> Result<PersistedState, HeraldError> {
            self.inner.load_all().await
        }
    }
}
