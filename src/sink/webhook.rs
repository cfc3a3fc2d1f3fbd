//! Webhook delivery with a short backoff retry.
//!
//! [`WebhookSink`] POSTs each notification, wrapped in a [`Dispatch`], as
//! JSON to one configured URL. A failed attempt is retried twice; anything
//! still failing is left for the next scheduler tick.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::NotificationSink;
use crate::domain::{Dispatch, Notification, NotifyTarget};
use crate::error::HeraldError;

/// Backoff before each retry, in milliseconds.
const RETRY_DELAYS_MS: [u64; 2] = [250, 1_000];

/// Delivers notifications to an external HTTP endpoint.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    /// Creates a sink posting to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::DeliveryFailed`] if the HTTP client cannot be
    /// built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, HeraldError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HeraldError::DeliveryFailed(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn try_send(&self, dispatch: &Dispatch) -> Result<(), HeraldError> {
        let response = self
            .client
            .post(&self.url)
            .json(dispatch)
            .send()
            .await
            .map_err(|e| HeraldError::DeliveryFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(HeraldError::DeliveryFailed(format!(
                "webhook returned HTTP {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(
        &self,
        target: &NotifyTarget,
        notification: &Notification,
    ) -> Result<(), HeraldError> {
        let dispatch = Dispatch::new(target.clone(), notification.clone(), Utc::now());

        for (attempt, delay_ms) in RETRY_DELAYS_MS.iter().enumerate() {
            match self.try_send(&dispatch).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url = %self.url,
                        error = %e,
                        "webhook delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                }
            }
        }

        self.try_send(&dispatch).await.inspect_err(|e| {
            tracing::error!(url = %self.url, error = %e, "webhook delivery failed after all retries");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_timeout() {
        let sink = WebhookSink::new("http://localhost:9/hook", Duration::from_secs(1));
        assert!(sink.is_ok());
    }

    #[test]
    fn retry_schedule_backs_off() {
        assert!(RETRY_DELAYS_MS.windows(2).all(|w| matches!(w, [a, b] if a < b)));
    }
}
