//! Reset trigger and raid launch DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{NotifyTarget, TimeFormat, TriggerKind, TriggerRecord};

/// A registered reset as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct TriggerResponse {
    /// Guild or user id the reset belongs to.
    pub id: String,
    /// Guild or personal reset.
    pub kind: TriggerKind,
    /// IANA timezone name.
    pub timezone: String,
    /// Hour as registered.
    pub hour: u8,
    /// Format the hour was registered in.
    pub time_format: TimeFormat,
    /// Hour normalized to 0–23.
    pub hour_24: u8,
    /// Minute past the hour the reset fires at.
    pub minute: u8,
    /// Whether the zone observed DST when the reset was registered.
    pub dst_at_registration: bool,
    /// Where the reset message is delivered.
    pub notify_target: NotifyTarget,
    /// Display label.
    pub label: String,
    /// Guild whose reset personal messages reference.
    pub linked_guild: Option<String>,
    /// Next firing instant strictly after the request.
    pub next_reset: DateTime<Utc>,
}

impl TriggerResponse {
    /// Builds the response for `record` with its precomputed next reset.
    #[must_use]
    pub fn new(id: String, record: &TriggerRecord, next_reset: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: record.kind,
            timezone: record.timezone.name().to_string(),
            hour: record.hour,
            time_format: record.time_format,
            hour_24: record.hour_24,
            minute: record.minute(),
            dst_at_registration: record.dst_at_registration,
            notify_target: record.notify_target.clone(),
            label: record.label.clone(),
            linked_guild: record.linked_guild.clone(),
            next_reset,
        }
    }
}

/// Response body for the next-reset endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct NextResetResponse {
    /// Guild or user id.
    pub id: String,
    /// Next firing instant.
    pub next_reset: DateTime<Utc>,
    /// Whole seconds from the request until `next_reset`.
    pub seconds_until: i64,
}

/// Request body for `PUT /guilds/{guild_id}/raid/tickets`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RaidTicketsRequest {
    /// Accumulated guild raid tickets.
    pub tickets: u64,
}
