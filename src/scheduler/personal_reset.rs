//! Personal reset reminders.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};

use super::runner::{Due, ScheduledTask, fire_window};
use crate::domain::{Notification, TriggerRecord, activity};
use crate::error::HeraldError;
use crate::service::ScheduleService;
use crate::sink::NotificationSink;

/// Reminds each member of the day's activity at their own reset, with the
/// linked guild's next reset for reference.
#[derive(Debug)]
pub struct PersonalResetTask {
    schedule: Arc<ScheduleService>,
    sink: Arc<dyn NotificationSink>,
}

impl PersonalResetTask {
    /// Creates the task.
    #[must_use]
    pub fn new(schedule: Arc<ScheduleService>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { schedule, sink }
    }
}

#[async_trait]
impl ScheduledTask for PersonalResetTask {
    type Item = TriggerRecord;

    fn name(&self) -> &'static str {
        "personal_reset"
    }

    async fn due(&self, now: DateTime<Utc>) -> Vec<Due<TriggerRecord>> {
        let mut due = Vec::new();
        for (user_id, record) in self.schedule.personal().snapshot().await {
            match record.due_occurrence(fire_window(), now) {
                Ok(Some(occurrence)) => due.push(Due {
                    key: user_id,
                    occurrence,
                    item: record,
                }),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(%user_id, error = %e, "skipping personal reset with unusable schedule");
                }
            }
        }
        due
    }

    async fn fire(&self, due: &Due<TriggerRecord>, now: DateTime<Utc>) -> Result<(), HeraldError> {
        let record = &due.item;
        let weekday = due.occurrence.with_timezone(&record.timezone).weekday();
        let guild_reset = match &record.linked_guild {
            Some(guild_id) => self.schedule.next_guild_reset(guild_id, now).await.ok(),
            None => None,
        };
        let message = activity::personal_message(&record.label, weekday, guild_reset);

        self.sink
            .deliver(&record.notify_target, &Notification::Activity(message))
            .await?;
        tracing::info!(user_id = %due.key, %weekday, "personal reset reminder sent");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::Weekday;

    use super::*;
    use crate::domain::{NotifyTarget, TimeFormat};
    use crate::scheduler::TaskRunner;
    use crate::service::ResetRegistration;
    use crate::sink::testing::RecordingSink;

    fn utc(s: &str) -> DateTime<Utc> {
        let Ok(t) = DateTime::parse_from_rfc3339(s) else {
            panic!("bad timestamp {s}");
        };
        t.with_timezone(&Utc)
    }

    fn registration(tz: &str, hour: u8, format: TimeFormat, linked: Option<&str>) -> ResetRegistration {
        ResetRegistration {
            timezone: tz.to_string(),
            hour,
            time_format: format,
            notify_target: NotifyTarget::from("dm-7"),
            label: "Rey".to_string(),
            linked_guild: linked.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn reminder_carries_the_linked_guild_reset() {
        let now = utc("2025-07-01T12:00:00Z");
        let schedule = Arc::new(ScheduleService::new(None, 180_000));
        let sink = Arc::new(RecordingSink::default());
        tokio_test::assert_ok!(
            schedule
                .register_guild_reset(
                    "g1",
                    registration("America/New_York", 18, TimeFormat::Military, None),
                    now,
                )
                .await
        );
        tokio_test::assert_ok!(
            schedule
                .register_personal_reset(
                    "u1",
                    registration("Europe/London", 7, TimeFormat::Am, Some("g1")),
                    now,
                )
                .await
        );

        let runner = TaskRunner::new(
            PersonalResetTask::new(Arc::clone(&schedule), Arc::clone(&sink) as Arc<dyn NotificationSink>),
            StdDuration::from_secs(60),
        );
        // 07:00 BST.
        let report = runner.tick(utc("2025-07-02T06:00:05Z")).await;
        assert_eq!(report.fired, 1);

        let delivered = sink.take().await;
        let [(target, Notification::Activity(message))] = delivered.as_slice() else {
            panic!("expected one reminder, got {delivered:?}");
        };
        assert_eq!(target.as_str(), "dm-7");
        assert!(message.personal);
        assert_eq!(message.weekday, Weekday::Wed);
        assert_eq!(message.next_guild_reset, Some(utc("2025-07-02T22:30:00Z")));
    }

    #[tokio::test]
    async fn missing_linked_guild_leaves_the_reset_empty() {
        let now = utc("2025-07-01T12:00:00Z");
        let schedule = Arc::new(ScheduleService::new(None, 180_000));
        let sink = Arc::new(RecordingSink::default());
        tokio_test::assert_ok!(
            schedule
                .register_personal_reset(
                    "u1",
                    registration("UTC", 20, TimeFormat::Military, Some("gone")),
                    now,
                )
                .await
        );

        let task = PersonalResetTask::new(Arc::clone(&schedule), Arc::clone(&sink) as Arc<dyn NotificationSink>);
        let due = task.due(utc("2025-07-01T20:00:30Z")).await;
        let [entry] = due.as_slice() else {
            panic!("expected one due reminder");
        };
        tokio_test::assert_ok!(task.fire(entry, utc("2025-07-01T20:00:30Z")).await);

        let delivered = sink.take().await;
        let [(_, Notification::Activity(message))] = delivered.as_slice() else {
            panic!("expected one reminder");
        };
        assert_eq!(message.next_guild_reset, None);
        assert!(task.due(utc("2025-07-01T20:01:00Z")).await.is_empty());
    }
}
