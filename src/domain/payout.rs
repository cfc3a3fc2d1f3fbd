//! Daily arena payout instant derived from a player's UTC offset.
//!
//! The payout is a one-minute point event: the source data settles at a
//! fixed clock minute, so `is_open` is an exact minute match rather than a
//! window.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::LadderType;
use super::time_math::{truncate_to_minute, utc_midnight};

/// Computed payout instant for one (player, ladder) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PayoutWindow {
    /// Next payout instant, at or after the current minute.
    pub at: DateTime<Utc>,
    /// `true` iff the payout happens during the current minute.
    pub is_open: bool,
}

/// Computes the payout for a player at `utc_offset_minutes` on `ladder`.
///
/// Starts from today's UTC midnight, moves it to the player's local
/// midnight, applies the ladder's fixed shift, then rolls forward a day at
/// a time (at most twice) until it is not before the current minute.
#[must_use]
pub fn payout_window(utc_offset_minutes: i32, ladder: LadderType, now: DateTime<Utc>) -> PayoutWindow {
    let minute = truncate_to_minute(now);
    let mut at = utc_midnight(now) - Duration::minutes(i64::from(utc_offset_minutes))
        + ladder.payout_shift();
    for _ in 0..2 {
        if at >= minute {
            break;
        }
        at += Duration::days(1);
    }
    PayoutWindow {
        at,
        is_open: at == minute,
    }
}
