//! Daily raid auto-launch.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::runner::{Due, ScheduledTask, fire_window};
use crate::domain::Notification;
use crate::error::HeraldError;
use crate::service::ScheduleService;
use crate::sink::NotificationSink;

/// Launches each guild's raid at its daily UTC instant once enough tickets
/// have accumulated.
#[derive(Debug)]
pub struct RaidLaunchTask {
    schedule: Arc<ScheduleService>,
    sink: Arc<dyn NotificationSink>,
}

impl RaidLaunchTask {
    /// Creates the task.
    #[must_use]
    pub fn new(schedule: Arc<ScheduleService>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { schedule, sink }
    }
}

#[async_trait]
impl ScheduledTask for RaidLaunchTask {
    type Item = ();

    fn name(&self) -> &'static str {
        "raid_launch"
    }

    async fn due(&self, now: DateTime<Utc>) -> Vec<Due<()>> {
        let mut due = Vec::new();
        for guild_id in self.schedule.raid_guilds().await {
            let Some(raid) = self.schedule.raid(&guild_id).await else {
                continue;
            };
            let launch = raid.launch_instant(now);
            if now >= launch && now < launch + fire_window() && raid.ready() {
                due.push(Due {
                    key: guild_id,
                    occurrence: launch,
                    item: (),
                });
            }
        }
        due
    }

    async fn fire(&self, due: &Due<()>, _now: DateTime<Utc>) -> Result<(), HeraldError> {
        let Some(raid) = self.schedule.launch_raid(&due.key).await? else {
            tracing::debug!(guild_id = %due.key, "raid no longer ready at launch");
            return Ok(());
        };

        let notification = Notification::RaidLaunch {
            label: raid.label.clone(),
            launched_at: due.occurrence,
            tickets_remaining: raid.tickets,
        };
        // The tickets are already spent; a failed announcement must not
        // launch a second time.
        if let Err(e) = self.sink.deliver(&raid.notify_target, &notification).await {
            tracing::warn!(guild_id = %due.key, error = %e, "raid launched but announcement failed");
        }
        Ok(())
    }
}
