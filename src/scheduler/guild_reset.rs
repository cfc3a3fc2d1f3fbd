//! Guild reset announcements.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};

use super::runner::{Due, ScheduledTask, fire_window};
use crate::domain::{Notification, TriggerRecord, activity};
use crate::error::HeraldError;
use crate::service::ScheduleService;
use crate::sink::NotificationSink;

/// Announces each guild's activity of the day at its reset.
#[derive(Debug)]
pub struct GuildResetTask {
    schedule: Arc<ScheduleService>,
    sink: Arc<dyn NotificationSink>,
}

impl GuildResetTask {
    /// Creates the task.
    #[must_use]
    pub fn new(schedule: Arc<ScheduleService>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { schedule, sink }
    }
}

#[async_trait]
impl ScheduledTask for GuildResetTask {
    type Item = TriggerRecord;

    fn name(&self) -> &'static str {
        "guild_reset"
    }

    async fn due(&self, now: DateTime<Utc>) -> Vec<Due<TriggerRecord>> {
        let mut due = Vec::new();
        for (guild_id, record) in self.schedule.guilds().snapshot().await {
            match record.due_occurrence(fire_window(), now) {
                Ok(Some(occurrence)) => due.push(Due {
                    key: guild_id,
                    occurrence,
                    item: record,
                }),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(%guild_id, error = %e, "skipping guild reset with unusable schedule");
                }
            }
        }
        due
    }

    async fn fire(&self, due: &Due<TriggerRecord>, now: DateTime<Utc>) -> Result<(), HeraldError> {
        let record = &due.item;
        let weekday = due.occurrence.with_timezone(&record.timezone).weekday();
        let next = record.next_occurrence(false, now).ok();
        let message = activity::guild_message(&record.label, weekday, next);

        self.sink
            .deliver(&record.notify_target, &Notification::Activity(message))
            .await?;
        tracing::info!(guild_id = %due.key, %weekday, occurrence = %due.occurrence, "guild reset announced");
        Ok(())
    }
}
