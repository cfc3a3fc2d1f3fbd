//! Schedule service: registration and lookup of resets and raid launches.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::{
    KeyedStore, NotifyTarget, RaidLaunch, TimeFormat, TriggerKind, TriggerRecord, TriggerRegistry,
};
use crate::error::HeraldError;
use crate::persistence::{PersistedState, StateStore};

/// Default tickets required per raid launch.
pub const DEFAULT_RAID_THRESHOLD: u64 = 180_000;

/// Caller input for a guild or personal reset registration.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResetRegistration {
    /// IANA timezone identifier, e.g. `America/New_York`.
    pub timezone: String,
    /// Hour in `time_format`.
    pub hour: u8,
    /// How `hour` is expressed.
    pub time_format: TimeFormat,
    /// Where notifications go.
    #[schema(value_type = String)]
    pub notify_target: NotifyTarget,
    /// Display label (guild name, or the member's name).
    pub label: String,
    /// For personal resets: the guild whose reset to cross-reference.
    #[serde(default)]
    pub linked_guild: Option<String>,
}

/// Caller input for a raid launch configuration.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RaidConfiguration {
    /// Guild name used in the launch message.
    pub label: String,
    /// Seconds after UTC midnight at which to launch.
    pub launch_offset_secs: u32,
    /// Tickets per launch; the configured default when omitted.
    #[serde(default)]
    pub threshold: Option<u64>,
    /// Where launch notifications go.
    #[schema(value_type = String)]
    pub notify_target: NotifyTarget,
}

/// Orchestration layer for reset triggers and raid launches.
///
/// Every mutation persists the new entity state before it becomes visible
/// in memory, so a failed write never leaves memory ahead of storage.
#[derive(Debug)]
pub struct ScheduleService {
    guilds: TriggerRegistry,
    personal: TriggerRegistry,
    raids: KeyedStore<String, RaidLaunch>,
    store: Option<Arc<dyn StateStore>>,
    raid_threshold: u64,
}

impl ScheduleService {
    /// Creates an empty service.
    #[must_use]
    pub fn new(store: Option<Arc<dyn StateStore>>, raid_threshold: u64) -> Self {
        Self {
            guilds: TriggerRegistry::new(TriggerKind::GuildReset),
            personal: TriggerRegistry::new(TriggerKind::PersonalReset),
            raids: KeyedStore::new(),
            store,
            raid_threshold: raid_threshold.max(1),
        }
    }

    /// Guild reset registry.
    #[must_use]
    pub const fn guilds(&self) -> &TriggerRegistry {
        &self.guilds
    }

    /// Personal reset registry.
    #[must_use]
    pub const fn personal(&self) -> &TriggerRegistry {
        &self.personal
    }

    fn registry(&self, kind: TriggerKind) -> &TriggerRegistry {
        match kind {
            TriggerKind::GuildReset => &self.guilds,
            TriggerKind::PersonalReset => &self.personal,
        }
    }

    async fn save_raid(&self, guild_id: &str, raid: &RaidLaunch) -> Result<(), HeraldError> {
        match &self.store {
            Some(store) => store.save_raid(guild_id, raid).await,
            None => Ok(()),
        }
    }

    async fn register(
        &self,
        kind: TriggerKind,
        id: &str,
        registration: ResetRegistration,
        now: DateTime<Utc>,
    ) -> Result<TriggerRecord, HeraldError> {
        if id.trim().is_empty() {
            return Err(HeraldError::InvalidRequest("id must not be empty".to_string()));
        }
        let mut record = TriggerRecord::new(
            kind,
            &registration.timezone,
            registration.hour,
            registration.time_format,
            registration.notify_target,
            registration.label,
            now,
        )?;
        if kind == TriggerKind::PersonalReset {
            record = record.with_linked_guild(registration.linked_guild);
        }

        if let Some(store) = &self.store {
            store.save_trigger(kind, id, Some(&record)).await?;
        }
        self.registry(kind).register(id, record.clone()).await?;

        tracing::info!(
            kind = ?kind,
            %id,
            timezone = %record.timezone,
            hour_24 = record.hour_24,
            dst_at_registration = record.dst_at_registration,
            "reset registered"
        );
        Ok(record)
    }

    async fn unregister(&self, kind: TriggerKind, id: &str) -> Result<bool, HeraldError> {
        if self.registry(kind).get(id).await.is_none() {
            return Ok(false);
        }
        if let Some(store) = &self.store {
            store.save_trigger(kind, id, None).await?;
        }
        let cleared = self.registry(kind).unregister(id).await;
        tracing::info!(kind = ?kind, %id, cleared, "reset unregistered");
        Ok(cleared)
    }

    /// Registers (or overwrites) the guild reset of `guild_id`.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::InvalidTimezone`], [`HeraldError::InvalidHour`]
    /// or [`HeraldError::InvalidRequest`] for bad input, and
    /// [`HeraldError::PersistenceError`] if the write fails.
    pub async fn register_guild_reset(
        &self,
        guild_id: &str,
        registration: ResetRegistration,
        now: DateTime<Utc>,
    ) -> Result<TriggerRecord, HeraldError> {
        self.register(TriggerKind::GuildReset, guild_id, registration, now)
            .await
    }

    /// Registers (or overwrites) the personal reset of `user_id`.
    ///
    /// # Errors
    ///
    /// Same as [`ScheduleService::register_guild_reset`].
    pub async fn register_personal_reset(
        &self,
        user_id: &str,
        registration: ResetRegistration,
        now: DateTime<Utc>,
    ) -> Result<TriggerRecord, HeraldError> {
        self.register(TriggerKind::PersonalReset, user_id, registration, now)
            .await
    }

    /// Clears the guild reset of `guild_id`. Returns `false` if none was
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::PersistenceError`] if the write fails.
    pub async fn unregister_guild_reset(&self, guild_id: &str) -> Result<bool, HeraldError> {
        self.unregister(TriggerKind::GuildReset, guild_id).await
    }

    /// Clears the personal reset of `user_id`. Returns `false` if none was
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::PersistenceError`] if the write fails.
    pub async fn unregister_personal_reset(&self, user_id: &str) -> Result<bool, HeraldError> {
        self.unregister(TriggerKind::PersonalReset, user_id).await
    }

    /// Next guild reset of `guild_id` strictly after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::TriggerNotFound`] if the guild has no reset.
    pub async fn next_guild_reset(
        &self,
        guild_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, HeraldError> {
        let record = self
            .guilds
            .get(guild_id)
            .await
            .ok_or_else(|| HeraldError::TriggerNotFound(guild_id.to_string()))?;
        record.next_occurrence(false, now)
    }

    /// Next personal reset of `user_id` strictly after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::TriggerNotFound`] if the user has no reset.
    pub async fn next_personal_reset(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, HeraldError> {
        let record = self
            .personal
            .get(user_id)
            .await
            .ok_or_else(|| HeraldError::TriggerNotFound(user_id.to_string()))?;
        record.next_occurrence(false, now)
    }

    /// Creates or updates the raid launch of `guild_id`. An existing ticket
    /// count is kept.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::InvalidRequest`] for bad input and
    /// [`HeraldError::PersistenceError`] if the write fails.
    pub async fn configure_raid(
        &self,
        guild_id: &str,
        config: RaidConfiguration,
    ) -> Result<RaidLaunch, HeraldError> {
        if guild_id.trim().is_empty() {
            return Err(HeraldError::InvalidRequest("guild id must not be empty".to_string()));
        }
        let mut raid = RaidLaunch::new(
            config.label,
            config.launch_offset_secs,
            config.threshold.unwrap_or(self.raid_threshold),
            config.notify_target,
        )?;

        let key = guild_id.to_string();
        let created = if self.raids.get(&key).await.is_none() {
            self.save_raid(guild_id, &raid).await?;
            self.raids.get_or_insert_with(key.clone(), || raid.clone()).await.1
        } else {
            false
        };

        // Already configured, possibly by a concurrent first call.
        if !created {
            let entry = self
                .raids
                .get(&key)
                .await
                .ok_or_else(|| HeraldError::RaidNotFound(guild_id.to_string()))?;
            let mut current = entry.lock().await;
            raid.tickets = current.tickets;
            self.save_raid(guild_id, &raid).await?;
            *current = raid.clone();
        }

        tracing::info!(%guild_id, offset_secs = raid.launch_offset_secs, threshold = raid.threshold, "raid launch configured");
        Ok(raid)
    }

    /// Sets the accumulated ticket count of `guild_id`'s raid.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::RaidNotFound`] if no raid is configured and
    /// [`HeraldError::PersistenceError`] if the write fails.
    pub async fn set_raid_tickets(
        &self,
        guild_id: &str,
        tickets: u64,
    ) -> Result<RaidLaunch, HeraldError> {
        let entry = self
            .raids
            .get(&guild_id.to_string())
            .await
            .ok_or_else(|| HeraldError::RaidNotFound(guild_id.to_string()))?;
        let mut current = entry.lock().await;
        let mut updated = current.clone();
        updated.tickets = tickets;
        self.save_raid(guild_id, &updated).await?;
        *current = updated.clone();
        Ok(updated)
    }

    /// Returns a copy of `guild_id`'s raid configuration.
    pub async fn raid(&self, guild_id: &str) -> Option<RaidLaunch> {
        let entry = self.raids.get(&guild_id.to_string()).await?;
        let raid = entry.lock().await.clone();
        Some(raid)
    }

    /// Guild ids with a configured raid.
    pub async fn raid_guilds(&self) -> Vec<String> {
        self.raids.keys().await
    }

    /// Launches `guild_id`'s raid if enough tickets have accumulated.
    ///
    /// The check, the decrement and the write happen under the guild's
    /// entry lock. Returns the updated configuration when a launch
    /// happened and `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::RaidNotFound`] if no raid is configured and
    /// [`HeraldError::PersistenceError`] if the write fails, in which case
    /// the ticket count is left unchanged.
    pub async fn launch_raid(&self, guild_id: &str) -> Result<Option<RaidLaunch>, HeraldError> {
        let entry = self
            .raids
            .get(&guild_id.to_string())
            .await
            .ok_or_else(|| HeraldError::RaidNotFound(guild_id.to_string()))?;
        let mut current = entry.lock().await;
        let mut launched = current.clone();
        if !launched.try_launch() {
            return Ok(None);
        }
        self.save_raid(guild_id, &launched).await?;
        *current = launched.clone();
        tracing::info!(%guild_id, tickets_remaining = launched.tickets, "raid launched");
        Ok(Some(launched))
    }

    /// Loads persisted triggers and raids into memory.
    pub async fn restore(&self, state: &PersistedState) {
        for (id, record) in &state.guild_triggers {
            self.guilds.restore(id.clone(), record.clone()).await;
        }
        for (id, record) in &state.personal_triggers {
            self.personal.restore(id.clone(), record.clone()).await;
        }
        for (guild_id, raid) in &state.raids {
            self.raids.insert(guild_id.clone(), raid.clone()).await;
        }
        tracing::info!(
            guild_resets = self.guilds.len().await,
            personal_resets = self.personal.len().await,
            raids = self.raids.len().await,
            "schedule restored"
        );
    }
}
