//! Notification sinks.
//!
//! The scheduler and rank tracker hand finished [`Notification`]s to a
//! [`NotificationSink`] without knowing where they end up. Shipped sinks:
//!
//! - [`BroadcastSink`] publishes onto the [`EventBus`](crate::domain::EventBus)
//!   for WebSocket subscribers.
//! - [`WebhookSink`] POSTs each dispatch as JSON to a fixed URL.
//! - [`FanoutSink`] delivers to several sinks at once.

pub mod broadcast;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;

use crate::domain::{Notification, NotifyTarget};
use crate::error::HeraldError;

pub use broadcast::BroadcastSink;
pub use webhook::WebhookSink;

/// Delivers a notification to an opaque target.
#[async_trait]
pub trait NotificationSink: Send + Sync + std::fmt::Debug {
    /// Delivers `notification` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::DeliveryFailed`] when the message did not
    /// reach anyone.
    async fn deliver(
        &self,
        target: &NotifyTarget,
        notification: &Notification,
    ) -> Result<(), HeraldError>;
}

/// Delivers to every inner sink concurrently.
///
/// Succeeds when at least one inner sink succeeds.
#[derive(Debug, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    /// Creates an empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of inner sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns `true` if there are no inner sinks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl NotificationSink for FanoutSink {
    async fn deliver(
        &self,
        target: &NotifyTarget,
        notification: &Notification,
    ) -> Result<(), HeraldError> {
        let results = join_all(self.sinks.iter().map(|s| s.deliver(target, notification))).await;

        let mut last_err = None;
        let mut delivered = false;
        for result in results {
            match result {
                Ok(()) => delivered = true,
                Err(e) => {
                    tracing::debug!(%target, error = %e, "inner sink failed");
                    last_err = Some(e);
                }
            }
        }
        if delivered {
            return Ok(());
        }
        Err(last_err.unwrap_or_else(|| HeraldError::DeliveryFailed("no sinks configured".to_string())))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording and failing sinks shared by unit tests.

    use tokio::sync::Mutex;

    use super::*;

    /// Sink that records every delivery.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub delivered: Mutex<Vec<(NotifyTarget, Notification)>>,
    }

    impl RecordingSink {
        pub async fn take(&self) -> Vec<(NotifyTarget, Notification)> {
            std::mem::take(&mut *self.delivered.lock().await)
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(
            &self,
            target: &NotifyTarget,
            notification: &Notification,
        ) -> Result<(), HeraldError> {
            self.delivered
                .lock()
                .await
                .push((target.clone(), notification.clone()));
            Ok(())
        }
    }

    /// Sink that always fails.
    #[derive(Debug, Default)]
    pub struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn deliver(&self, _: &NotifyTarget, _: &Notification) -> Result<(), HeraldError> {
            Err(HeraldError::DeliveryFailed("channel gone".to_string()))
        }
    }
}
