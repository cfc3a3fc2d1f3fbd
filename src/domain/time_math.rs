//! Pure wall-clock and daylight-saving arithmetic.
//!
//! Every function takes the current instant as a parameter; nothing in this
//! module reads the system clock. Day rollover is done with calendar
//! arithmetic on the local date so month and year boundaries never produce
//! an invalid date.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};

use super::trigger::TimeFormat;
use crate::error::HeraldError;

/// Parses an IANA timezone identifier.
///
/// # Errors
///
/// Returns [`HeraldError::InvalidTimezone`] for unknown identifiers.
pub fn parse_timezone(name: &str) -> Result<Tz, HeraldError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| HeraldError::InvalidTimezone(name.to_string()))
}

/// Normalizes an hour given in `format` to the 0–23 range.
///
/// # Errors
///
/// Returns [`HeraldError::InvalidHour`] when the hour is out of range for
/// the format (0–23 for military time, 1–12 for AM/PM).
pub fn to_24h(hour: u8, format: TimeFormat) -> Result<u8, HeraldError> {
    let invalid = || HeraldError::InvalidHour {
        hour,
        format: format.to_string(),
    };
    match format {
        TimeFormat::Military if hour <= 23 => Ok(hour),
        TimeFormat::Am if (1..=12).contains(&hour) => Ok(hour % 12),
        TimeFormat::Pm if (1..=12).contains(&hour) => Ok(hour % 12 + 12),
        _ => Err(invalid()),
    }
}

/// Returns `true` if daylight-saving time is in effect in `tz` at `at`.
#[must_use]
pub fn dst_active(tz: Tz, at: DateTime<Utc>) -> bool {
    tz.offset_from_utc_datetime(&at.naive_utc()).dst_offset() != Duration::zero()
}

/// Shift applied to a trigger whose DST status at registration differs
/// from the zone's status now.
///
/// Registered under DST but evaluated outside it moves the trigger one hour
/// earlier; the reverse moves it one hour later.
#[must_use]
pub fn dst_correction(dst_at_registration: bool, dst_now: bool) -> Duration {
    match (dst_at_registration, dst_now) {
        (true, false) => Duration::hours(-1),
        (false, true) => Duration::hours(1),
        _ => Duration::zero(),
    }
}

/// Computes the next occurrence of `hour:minute` local time in `tz`.
///
/// With `include_today` the occurrence for the current local date is
/// returned even if it has already passed. Without it the result is always
/// strictly after `now`.
///
/// # Errors
///
/// Returns [`HeraldError::InvalidHour`] if `hour:minute` is not a valid
/// wall-clock time, or [`HeraldError::Internal`] if the date arithmetic
/// leaves the representable range.
pub fn next_occurrence(
    hour: u8,
    minute: u8,
    tz: Tz,
    dst_at_registration: bool,
    include_today: bool,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, HeraldError> {
    let wall = wall_time(hour, minute)?;
    let correction = dst_correction(dst_at_registration, dst_active(tz, now));
    let today = now.with_timezone(&tz).date_naive();

    if include_today {
        return occurrence_on(today, wall, tz, correction);
    }

    // The correction can pull an occurrence across local midnight, so
    // yesterday's slot may still lie ahead and today's may already be gone.
    let yesterday = today
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| out_of_range(today))?;
    for offset in 0..4 {
        let date = yesterday
            .checked_add_days(Days::new(offset))
            .ok_or_else(|| out_of_range(yesterday))?;
        let candidate = occurrence_on(date, wall, tz, correction)?;
        if candidate > now {
            return Ok(candidate);
        }
    }
    Err(HeraldError::Internal(format!(
        "no occurrence of {hour:02}:{minute:02} in {tz} after {now}"
    )))
}

/// Returns the occurrence whose firing window `[occurrence, occurrence + window)`
/// contains `now`, if any.
///
/// # Errors
///
/// Same as [`next_occurrence`].
pub fn occurrence_in_window(
    hour: u8,
    minute: u8,
    tz: Tz,
    dst_at_registration: bool,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, HeraldError> {
    let occurrence = next_occurrence(hour, minute, tz, dst_at_registration, false, now - window)?;
    Ok((occurrence <= now).then_some(occurrence))
}

/// UTC midnight at the start of `now`'s UTC day.
#[must_use]
pub fn utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Truncates `now` to the start of its minute.
#[must_use]
pub fn truncate_to_minute(now: DateTime<Utc>) -> DateTime<Utc> {
    let secs = now.timestamp();
    DateTime::from_timestamp(secs - secs.rem_euclid(60), 0).unwrap_or(now)
}

fn wall_time(hour: u8, minute: u8) -> Result<NaiveTime, HeraldError> {
    NaiveTime::from_hms_opt(u32::from(hour), u32::from(minute), 0).ok_or(
        HeraldError::InvalidHour {
            hour,
            format: TimeFormat::Military.to_string(),
        },
    )
}

fn occurrence_on(
    date: NaiveDate,
    wall: NaiveTime,
    tz: Tz,
    correction: Duration,
) -> Result<DateTime<Utc>, HeraldError> {
    resolve_local(tz, date.and_time(wall))
        .map(|utc| utc + correction)
        .ok_or_else(|| out_of_range(date))
}

/// Resolves a local wall-clock time: ambiguous times take the earlier
/// instant, times inside a spring-forward gap move one hour later.
fn resolve_local(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

fn out_of_range(date: NaiveDate) -> HeraldError {
    HeraldError::Internal(format!("date arithmetic out of range near {date}"))
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

    fn new_york() -> Tz {
        chrono_tz::America::New_York
    }

    #[test]
    fn to_24h_handles_meridiem_edges() {
        assert_eq!(to_24h(12, TimeFormat::Am).ok(), Some(0));
        assert_eq!(to_24h(12, TimeFormat::Pm).ok(), Some(12));
        assert_eq!(to_24h(1, TimeFormat::Pm).ok(), Some(13));
        assert_eq!(to_24h(23, TimeFormat::Military).ok(), Some(23));
        assert!(to_24h(24, TimeFormat::Military).is_err());
        assert!(to_24h(0, TimeFormat::Am).is_err());
        assert!(to_24h(13, TimeFormat::Pm).is_err());
    }

    #[test]
    fn parse_timezone_rejects_unknown_zone() {
        assert!(parse_timezone("America/New_York").is_ok());
        assert!(parse_timezone("Mars/Olympus_Mons").is_err());
    }

    #[test]
    fn dst_active_follows_the_zone_calendar() {
        assert!(dst_active(new_york(), utc("2025-07-10T12:00:00Z")));
        assert!(!dst_active(new_york(), utc("2025-12-10T12:00:00Z")));
        assert!(!dst_active(chrono_tz::Asia::Tokyo, utc("2025-07-10T12:00:00Z")));
    }

    #[test]
    fn registered_under_dst_fires_an_hour_earlier_in_winter() {
        // 17:00 EST, before the reset.
        let now = utc("2025-12-10T22:00:00Z");
        let naive = next_occurrence(18, 30, new_york(), false, true, now);
        let corrected = next_occurrence(18, 30, new_york(), true, true, now);
        let (Ok(naive), Ok(corrected)) = (naive, corrected) else {
            panic!("occurrence failed");
        };
        assert_eq!(naive, utc("2025-12-10T23:30:00Z"));
        assert_eq!(corrected, utc("2025-12-10T22:30:00Z"));
        assert_eq!(naive - corrected, Duration::hours(1));
    }

    #[test]
    fn registered_outside_dst_fires_an_hour_later_in_summer() {
        let now = utc("2025-07-10T12:00:00Z");
        let naive = next_occurrence(18, 30, new_york(), true, true, now);
        let corrected = next_occurrence(18, 30, new_york(), false, true, now);
        let (Ok(naive), Ok(corrected)) = (naive, corrected) else {
            panic!("occurrence failed");
        };
        assert_eq!(naive, utc("2025-07-10T22:30:00Z"));
        assert_eq!(corrected - naive, Duration::hours(1));
    }

    #[test]
    fn matching_dst_status_needs_no_shift() {
        let now = utc("2025-07-10T12:00:00Z");
        let Ok(occ) = next_occurrence(18, 30, new_york(), true, true, now) else {
            panic!("occurrence failed");
        };
        assert_eq!(occ, utc("2025-07-10T22:30:00Z"));
    }

    #[test]
    fn excluding_today_is_always_strictly_future() {
        let tz = chrono_tz::Europe::Berlin;
        let mut now = utc("2025-03-29T00:00:00Z");
        // Walk across the spring-forward weekend in 37-minute steps.
        while now < utc("2025-04-01T00:00:00Z") {
            for hour in [0_u8, 2, 12, 23] {
                for dst in [false, true] {
                    let Ok(occ) = next_occurrence(hour, 30, tz, dst, false, now) else {
                        panic!("occurrence failed at {now}");
                    };
                    assert!(occ > now, "{occ} not after {now}");
                    assert!(occ - now <= Duration::hours(26));
                }
            }
            now += Duration::minutes(37);
        }
    }

    #[test]
    fn includes_today_when_not_yet_passed() {
        let now = utc("2025-12-10T15:00:00Z");
        let today = next_occurrence(18, 30, new_york(), false, true, now);
        let next = next_occurrence(18, 30, new_york(), false, false, now);
        assert_eq!(today.ok(), next.ok());
    }

    #[test]
    fn rolls_over_month_and_year_boundaries() {
        let tokyo = chrono_tz::Asia::Tokyo;
        // 23:00 JST on the leap day.
        let Ok(occ) = next_occurrence(0, 0, tokyo, false, false, utc("2024-02-29T14:00:00Z")) else {
            panic!("occurrence failed");
        };
        assert_eq!(occ, utc("2024-02-29T15:00:00Z"));
        assert_eq!(occ.with_timezone(&tokyo).date_naive().to_string(), "2024-03-01");

        // 23:30 JST on new year's eve.
        let Ok(occ) = next_occurrence(0, 0, tokyo, false, false, utc("2024-12-31T14:30:00Z")) else {
            panic!("occurrence failed");
        };
        assert_eq!(occ.with_timezone(&tokyo).date_naive().to_string(), "2025-01-01");
    }

    #[test]
    fn correction_across_local_midnight_still_finds_next_slot() {
        // Registered 23:30 under EST; in summer the Jul 10 slot lands at
        // 00:30 EDT on Jul 11, after local midnight has already passed.
        let now = utc("2025-07-11T04:10:00Z"); // 00:10 EDT Jul 11
        let Ok(occ) = next_occurrence(23, 30, new_york(), false, false, now) else {
            panic!("occurrence failed");
        };
        assert_eq!(occ, utc("2025-07-11T04:30:00Z"));
    }

    #[test]
    fn window_contains_only_the_first_minute() {
        let window = Duration::seconds(60);
        let at = |s| occurrence_in_window(18, 30, new_york(), true, window, utc(s));
        assert_eq!(at("2025-12-10T22:30:00Z").ok().flatten(), Some(utc("2025-12-10T22:30:00Z")));
        assert_eq!(at("2025-12-10T22:30:59Z").ok().flatten(), Some(utc("2025-12-10T22:30:00Z")));
        assert_eq!(at("2025-12-10T22:31:00Z").ok().flatten(), None);
        assert_eq!(at("2025-12-10T22:29:59Z").ok().flatten(), None);
    }

    #[test]
    fn truncation_and_midnight_helpers() {
        let now = utc("2025-03-10T23:04:59Z");
        assert_eq!(truncate_to_minute(now), utc("2025-03-10T23:04:00Z"));
        assert_eq!(utc_midnight(now), utc("2025-03-10T00:00:00Z"));
    }
}
