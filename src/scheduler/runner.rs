//! Generic fixed-interval task runner with an exactly-once ledger.
//!
//! A [`ScheduledTask`] answers which entities are due at `now` and what to
//! do for each. [`TaskRunner`] drives it: it asks for due items every
//! tick, drops the ones whose occurrence is already in the fired ledger,
//! fires the rest concurrently, and records each success.
//!
//! A due item is identified by `(key, occurrence)`. Because a firing
//! window is as long as the tick interval, jitter can put two ticks inside
//! one window; the ledger makes the second one a no-op.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::Clock;
use crate::error::HeraldError;

/// Length of every firing window in seconds.
pub const FIRE_WINDOW_SECS: i64 = 60;

/// Ledger entries older than this are pruned.
const LEDGER_RETENTION_DAYS: i64 = 3;

/// Firing window as a [`Duration`].
#[must_use]
pub fn fire_window() -> Duration {
    Duration::seconds(FIRE_WINDOW_SECS)
}

/// One entity due at the current tick.
#[derive(Debug, Clone)]
pub struct Due<T> {
    /// Entity key, unique within the task.
    pub key: String,
    /// Occurrence being fired.
    pub occurrence: DateTime<Utc>,
    /// Task-specific payload.
    pub item: T,
}

/// A unit of periodic work driven by [`TaskRunner`].
#[async_trait]
pub trait ScheduledTask: Send + Sync + std::fmt::Debug {
    /// Payload carried from [`due`](Self::due) to [`fire`](Self::fire).
    type Item: Send + Sync;

    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Entities whose firing window contains `now`.
    async fn due(&self, now: DateTime<Utc>) -> Vec<Due<Self::Item>>;

    /// Performs the action for one due entity.
    ///
    /// # Errors
    ///
    /// Any error leaves the occurrence out of the ledger, so it is retried
    /// on the next tick while still in its window.
    async fn fire(&self, due: &Due<Self::Item>, now: DateTime<Utc>) -> Result<(), HeraldError>;
}

/// Counters for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Entities reported due.
    pub due: usize,
    /// Entities fired successfully.
    pub fired: usize,
    /// Entities skipped because the occurrence already fired.
    pub already_fired: usize,
    /// Entities whose action failed.
    pub failed: usize,
}

/// Drives a [`ScheduledTask`] on a fixed interval.
#[derive(Debug)]
pub struct TaskRunner<T: ScheduledTask> {
    task: T,
    interval: StdDuration,
    ledger: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl<T: ScheduledTask> TaskRunner<T> {
    /// Wraps `task`, ticking every `interval`.
    #[must_use]
    pub fn new(task: T, interval: StdDuration) -> Self {
        Self {
            task,
            interval,
            ledger: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped task.
    #[must_use]
    pub const fn task(&self) -> &T {
        &self.task
    }

    /// Runs one tick at `now`.
    ///
    /// Per-entity failures are logged and counted; they never stop the
    /// other entities of the same tick.
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let candidates = self.task.due(now).await;
        let mut report = TickReport {
            due: candidates.len(),
            ..TickReport::default()
        };

        let pending: Vec<Due<T::Item>> = {
            let mut ledger = self.ledger.lock().await;
            ledger.retain(|_, fired| now - *fired < Duration::days(LEDGER_RETENTION_DAYS));
            candidates
                .into_iter()
                .filter(|due| ledger.get(&due.key) != Some(&due.occurrence))
                .collect()
        };
        report.already_fired = report.due - pending.len();

        let results = join_all(pending.iter().map(|due| self.task.fire(due, now))).await;

        let mut ledger = self.ledger.lock().await;
        for (due, result) in pending.iter().zip(results) {
            match result {
                Ok(()) => {
                    ledger.insert(due.key.clone(), due.occurrence);
                    report.fired += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    if e.is_transient() {
                        tracing::warn!(
                            task = self.task.name(),
                            key = %due.key,
                            occurrence = %due.occurrence,
                            error = %e,
                            "scheduled action failed, will retry next tick"
                        );
                    } else {
                        tracing::error!(
                            task = self.task.name(),
                            key = %due.key,
                            occurrence = %due.occurrence,
                            error = %e,
                            "scheduled action failed"
                        );
                    }
                }
            }
        }
        report
    }

    /// Ticks until `cancel` fires. A tick in progress completes first.
    pub async fn run(self: Arc<Self>, clock: Arc<dyn Clock>, cancel: CancellationToken) {
        tracing::info!(
            task = self.task.name(),
            interval_secs = self.interval.as_secs(),
            "scheduled task started"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!(task = self.task.name(), "scheduled task stopping");
                    break;
                }
                _ = interval.tick() => {
                    let report = self.tick(clock.now()).await;
                    if report.fired > 0 || report.failed > 0 {
                        tracing::info!(
                            task = self.task.name(),
                            due = report.due,
                            fired = report.fired,
                            failed = report.failed,
                            "tick complete"
                        );
                    } else {
                        tracing::trace!(task = self.task.name(), due = report.due, "tick complete");
                    }
                }
            }
        }
    }
}
