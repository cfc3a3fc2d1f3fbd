//! Sink that publishes onto the in-process [`EventBus`].

use async_trait::async_trait;
use chrono::Utc;

use super::NotificationSink;
use crate::domain::{Dispatch, EventBus, Notification, NotifyTarget};
use crate::error::HeraldError;

/// Publishes every notification as a [`Dispatch`] for WebSocket clients.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    bus: EventBus,
}

impl BroadcastSink {
    /// Wraps `bus`.
    #[must_use]
    pub const fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl NotificationSink for BroadcastSink {
    async fn deliver(
        &self,
        target: &NotifyTarget,
        notification: &Notification,
    ) -> Result<(), HeraldError> {
        let dispatch = Dispatch::new(target.clone(), notification.clone(), Utc::now());
        let receivers = self.bus.publish(dispatch);
        if receivers == 0 {
            return Err(HeraldError::DeliveryFailed(format!(
                "no subscribers listening for {target}"
            )));
        }
        tracing::debug!(%target, kind = notification.kind_str(), receivers, "notification published");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publishes_to_subscribers() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let sink = BroadcastSink::new(bus);
        let notification = Notification::RaidLaunch {
            label: "g".to_string(),
            launched_at: Utc::now(),
            tickets_remaining: 1,
        };

        tokio_test::assert_ok!(sink.deliver(&NotifyTarget::from("chan"), &notification).await);
        let Ok(dispatch) = rx.recv().await else {
            panic!("dispatch expected");
        };
        assert_eq!(dispatch.target.as_str(), "chan");
        assert_eq!(dispatch.notification, notification);
    }

    #[tokio::test]
    async fn nobody_listening_is_a_failed_delivery() {
        let sink = BroadcastSink::new(EventBus::new(8));
        let notification = Notification::RaidLaunch {
            label: "g".to_string(),
            launched_at: Utc::now(),
            tickets_remaining: 1,
        };
        let result = sink.deliver(&NotifyTarget::from("chan"), &notification).await;
        assert!(matches!(result, Err(HeraldError::DeliveryFailed(_))));
    }
}
