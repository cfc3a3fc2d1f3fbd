//! Schedulable trigger records: guild resets, personal resets, raid launches.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::NotifyTarget;
use super::time_math;
use crate::error::HeraldError;

/// Seconds in one day; raid launch offsets must stay below this.
pub const SECONDS_PER_DAY: u32 = 86_400;

/// Which daily reset a [`TriggerRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// A guild's community-wide reset, fired at half past the hour.
    GuildReset,
    /// One member's own daily reset, fired on the hour.
    PersonalReset,
}

impl TriggerKind {
    /// Fixed minute past the hour at which this kind fires.
    #[must_use]
    pub const fn minute_offset(self) -> u8 {
        match self {
            Self::GuildReset => 30,
            Self::PersonalReset => 0,
        }
    }

    /// Storage table name for this kind.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::GuildReset => "guild_triggers",
            Self::PersonalReset => "personal_triggers",
        }
    }
}

/// How the registered hour was expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TimeFormat {
    /// 0–23.
    Military,
    /// 1–12 before noon.
    #[serde(rename = "AM")]
    Am,
    /// 1–12 after noon.
    #[serde(rename = "PM")]
    Pm,
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Military => "Military",
            Self::Am => "AM",
            Self::Pm => "PM",
        })
    }
}

/// One registered daily reset.
///
/// The DST flag is captured once at registration and compared against the
/// zone's live DST status on every evaluation; a mismatch shifts the firing
/// instant by one hour (see [`time_math::dst_correction`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRecord {
    /// Guild or personal reset.
    pub kind: TriggerKind,
    /// IANA timezone the hour is expressed in.
    pub timezone: Tz,
    /// Hour as registered, in `time_format`.
    pub hour: u8,
    /// Format of `hour`.
    pub time_format: TimeFormat,
    /// `hour` normalized to 0–23.
    pub hour_24: u8,
    /// Whether DST was in effect in `timezone` when registered.
    pub dst_at_registration: bool,
    /// Where reset notifications go.
    pub notify_target: NotifyTarget,
    /// Display label (the guild name for guild resets).
    pub label: String,
    /// Guild whose reset a personal reset cross-references.
    #[serde(default)]
    pub linked_guild: Option<String>,
    /// Registration timestamp.
    pub registered_at: DateTime<Utc>,
}

impl TriggerRecord {
    /// Validates the inputs and captures the current DST status.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::InvalidTimezone`], [`HeraldError::InvalidHour`],
    /// or [`HeraldError::InvalidRequest`] for an empty target.
    pub fn new(
        kind: TriggerKind,
        timezone: &str,
        hour: u8,
        time_format: TimeFormat,
        notify_target: NotifyTarget,
        label: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, HeraldError> {
        let tz = time_math::parse_timezone(timezone)?;
        let hour_24 = time_math::to_24h(hour, time_format)?;
        if notify_target.is_empty() {
            return Err(HeraldError::InvalidRequest(
                "notification target must not be empty".to_string(),
            ));
        }
        Ok(Self {
            kind,
            timezone: tz,
            hour,
            time_format,
            hour_24,
            dst_at_registration: time_math::dst_active(tz, now),
            notify_target,
            label: label.into(),
            linked_guild: None,
            registered_at: now,
        })
    }

    /// Sets the guild a personal reset cross-references.
    #[must_use]
    pub fn with_linked_guild(mut self, guild_id: Option<String>) -> Self {
        self.linked_guild = guild_id.filter(|g| !g.trim().is_empty());
        self
    }

    /// Minute past the hour this record fires at.
    #[must_use]
    pub const fn minute(&self) -> u8 {
        self.kind.minute_offset()
    }

    /// Next occurrence of this reset (see [`time_math::next_occurrence`]).
    ///
    /// # Errors
    ///
    /// Propagates [`time_math::next_occurrence`] errors; only reachable for
    /// records that bypassed [`TriggerRecord::new`].
    pub fn next_occurrence(
        &self,
        include_today: bool,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, HeraldError> {
        time_math::next_occurrence(
            self.hour_24,
            self.minute(),
            self.timezone,
            self.dst_at_registration,
            include_today,
            now,
        )
    }

    /// The occurrence whose firing window contains `now`, if any.
    ///
    /// # Errors
    ///
    /// Same as [`TriggerRecord::next_occurrence`].
    pub fn due_occurrence(
        &self,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, HeraldError> {
        time_math::occurrence_in_window(
            self.hour_24,
            self.minute(),
            self.timezone,
            self.dst_at_registration,
            window,
            now,
        )
    }
}

/// Daily raid auto-launch configuration for one guild.
///
/// The ticket counter is fed from outside; a launch consumes exactly
/// `threshold` tickets and never drives the counter below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RaidLaunch {
    /// Guild name used in the launch message.
    pub label: String,
    /// Seconds after UTC midnight at which the raid launches.
    pub launch_offset_secs: u32,
    /// Accumulated raid tickets.
    pub tickets: u64,
    /// Tickets required (and consumed) per launch.
    pub threshold: u64,
    /// Where launch notifications go.
    pub notify_target: NotifyTarget,
}

impl RaidLaunch {
    /// Creates a raid configuration with an empty ticket counter.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::InvalidRequest`] if the offset is a day or
    /// more, the threshold is zero, or the target is empty.
    pub fn new(
        label: impl Into<String>,
        launch_offset_secs: u32,
        threshold: u64,
        notify_target: NotifyTarget,
    ) -> Result<Self, HeraldError> {
        if launch_offset_secs >= SECONDS_PER_DAY {
            return Err(HeraldError::InvalidRequest(format!(
                "launch offset {launch_offset_secs}s must be below {SECONDS_PER_DAY}s"
            )));
        }
        if threshold == 0 {
            return Err(HeraldError::InvalidRequest(
                "raid ticket threshold must be positive".to_string(),
            ));
        }
        if notify_target.is_empty() {
            return Err(HeraldError::InvalidRequest(
                "notification target must not be empty".to_string(),
            ));
        }
        Ok(Self {
            label: label.into(),
            launch_offset_secs,
            tickets: 0,
            threshold,
            notify_target,
        })
    }

    /// Today's launch instant in UTC.
    #[must_use]
    pub fn launch_instant(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        time_math::utc_midnight(now) + Duration::seconds(i64::from(self.launch_offset_secs))
    }

    /// Returns `true` if enough tickets have accumulated to launch.
    #[must_use]
    pub const fn ready(&self) -> bool {
        self.tickets >= self.threshold
    }

    /// Consumes one launch worth of tickets. Returns `false` and leaves the
    /// counter untouched if not [`ready`](Self::ready).
    pub fn try_launch(&mut self) -> bool {
        if !self.ready() {
            return false;
        }
        self.tickets = self.tickets.saturating_sub(self.threshold);
        true
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        let Ok(dt) = DateTime::parse_from_rfc3339(s) else {
            panic!("bad timestamp {s}");
        };
        dt.with_timezone(&Utc)
    }

    #[test]
    fn new_captures_dst_status() {
        let summer = TriggerRecord::new(
            TriggerKind::GuildReset,
            "America/New_York",
            6,
            TimeFormat::Pm,
            NotifyTarget::from("chan"),
            "Rogue Squadron",
            utc("2025-07-01T12:00:00Z"),
        );
        let Ok(summer) = summer else {
            panic!("registration failed");
        };
        assert!(summer.dst_at_registration);
        assert_eq!(summer.hour_24, 18);
        assert_eq!(summer.minute(), 30);
    }

    #[test]
    fn new_rejects_bad_configuration() {
        let now = utc("2025-07-01T12:00:00Z");
        let bad_tz = TriggerRecord::new(
            TriggerKind::GuildReset,
            "Nowhere/Special",
            6,
            TimeFormat::Pm,
            NotifyTarget::from("chan"),
            "g",
            now,
        );
        assert!(matches!(bad_tz, Err(HeraldError::InvalidTimezone(_))));

        let bad_hour = TriggerRecord::new(
            TriggerKind::PersonalReset,
            "UTC",
            0,
            TimeFormat::Am,
            NotifyTarget::from("user"),
            "u",
            now,
        );
        assert!(matches!(bad_hour, Err(HeraldError::InvalidHour { .. })));

        let no_target = TriggerRecord::new(
            TriggerKind::PersonalReset,
            "UTC",
            5,
            TimeFormat::Military,
            NotifyTarget::from(""),
            "u",
            now,
        );
        assert!(matches!(no_target, Err(HeraldError::InvalidRequest(_))));
    }

    #[test]
    fn personal_resets_fire_on_the_hour() {
        let Ok(record) = TriggerRecord::new(
            TriggerKind::PersonalReset,
            "UTC",
            7,
            TimeFormat::Military,
            NotifyTarget::from("user"),
            "me",
            utc("2025-01-01T00:00:00Z"),
        ) else {
            panic!("registration failed");
        };
        let next = record.next_occurrence(false, utc("2025-01-05T08:00:00Z"));
        assert_eq!(next.ok(), Some(utc("2025-01-06T07:00:00Z")));
    }

    #[test]
    fn raid_launch_consumes_threshold_and_saturates() {
        let Ok(mut raid) = RaidLaunch::new("g", 3600, 180_000, NotifyTarget::from("c")) else {
            panic!("raid config failed");
        };
        raid.tickets = 185_000;
        assert!(raid.try_launch());
        assert_eq!(raid.tickets, 5_000);
        assert!(!raid.try_launch());
        assert_eq!(raid.tickets, 5_000);
    }

    #[test]
    fn raid_launch_instant_is_offset_from_utc_midnight() {
        let Ok(raid) = RaidLaunch::new("g", 19 * 3600, 1, NotifyTarget::from("c")) else {
            panic!("raid config failed");
        };
        assert_eq!(
            raid.launch_instant(utc("2025-04-02T08:15:00Z")),
            utc("2025-04-02T19:00:00Z")
        );
        assert!(RaidLaunch::new("g", SECONDS_PER_DAY, 1, NotifyTarget::from("c")).is_err());
    }
}
