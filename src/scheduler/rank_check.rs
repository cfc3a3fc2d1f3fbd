//! Per-minute rank polling.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::runner::{Due, ScheduledTask};
use crate::domain::RankKey;
use crate::domain::time_math::truncate_to_minute;
use crate::error::HeraldError;
use crate::service::RankTracker;

/// Polls every enabled tracking record once per minute.
#[derive(Debug)]
pub struct RankCheckTask {
    tracker: Arc<RankTracker>,
}

impl RankCheckTask {
    /// Creates the task.
    #[must_use]
    pub fn new(tracker: Arc<RankTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl ScheduledTask for RankCheckTask {
    type Item = RankKey;

    fn name(&self) -> &'static str {
        "rank_check"
    }

    async fn due(&self, now: DateTime<Utc>) -> Vec<Due<RankKey>> {
        let minute = truncate_to_minute(now);
        self.tracker
            .enabled_keys()
            .await
            .into_iter()
            .map(|key| Due {
                key: key.to_string(),
                occurrence: minute,
                item: key,
            })
            .collect()
    }

    async fn fire(&self, due: &Due<RankKey>, now: DateTime<Utc>) -> Result<(), HeraldError> {
        self.tracker.poll_and_notify(&due.item, now).await.map(|_| ())
    }
}
