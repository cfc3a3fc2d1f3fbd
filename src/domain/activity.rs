//! Weekly guild-activity catalog and the reset messages built from it.

use chrono::{DateTime, Utc, Weekday};
use serde::Serialize;
use utoipa::ToSchema;

/// Instructions for one day of the guild-activity week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyActivity {
    /// Day the activity runs.
    pub weekday: Weekday,
    /// Challenge title.
    pub title: &'static str,
    /// What to do before the guild reset.
    pub before_reset: &'static str,
    /// What to do after the guild reset.
    pub after_reset: &'static str,
    /// Optional closing remark.
    pub footer: Option<&'static str>,
}

const BOTH_DAYS_FOOTER: &str = "Be aware of when your personal reset is so that you can use \
attempts from both days that this activity covers.";

/// Catalog indexed by [`Weekday::num_days_from_sunday`].
const WEEK: [DailyActivity; 7] = [
    DailyActivity {
        weekday: Weekday::Sun,
        title: "Spend Cantina Energy",
        before_reset: "Do your 5 Squad Arena battles after your daily reset. Let Cantina Energy \
accumulate and collect Bonus Cantina Energy as late as possible. Spend all Normal Energy and 45 \
of the first Bonus Normal Energy, then let the rest accumulate for tomorrow.",
        after_reset: "Spend all Cantina Energy on Cantina Battles, with 2 refreshes if able. \
Spend only as much Normal Energy as you need to reach 600 Raid Tickets.",
        footer: None,
    },
    DailyActivity {
        weekday: Weekday::Mon,
        title: "Spend Light Side Energy",
        before_reset: "Finish Cantina Battles, spending only enough Cantina Energy to reach 480. \
Start letting it accumulate for Tuesday and save Normal Energy refreshes for after the guild reset.",
        after_reset: "Spend all Energy on Light Side battles with up to 3 refreshes. Do not spend \
crystals refreshing Hard Battles.",
        footer: None,
    },
    DailyActivity {
        weekday: Weekday::Tue,
        title: "Spend ANY Energy",
        before_reset: "Finish Light Side battles with Normal Energy, using up to the 1400 mark. Let \
every other energy type accumulate for the next activity.",
        after_reset: "Spend all Cantina Energy plus 1 refresh and the bonus. Spend all Ship Energy \
plus 3 refreshes and the bonus. Spend all Mod Energy plus 2 refreshes and the bonus.",
        footer: None,
    },
    DailyActivity {
        weekday: Weekday::Wed,
        title: "Hard Battles",
        before_reset: "Spend Normal Energy early and save all Bonus Normal Energy for the next \
activity. Save some Hard nodes if possible.",
        after_reset: "Spend all Normal Energy on any Light Side or Dark Side Hard Battle. The goal \
needs 4 refreshes.",
        footer: None,
    },
    DailyActivity {
        weekday: Weekday::Thu,
        title: "Daily Challenges",
        before_reset: "Finish Hard Battles with all Energy and 4 refreshes. Save your Daily \
Challenges until after tomorrow's guild reset.",
        after_reset: "Complete all 8 Daily Challenges and the 2 Fleet Challenges.",
        footer: Some(BOTH_DAYS_FOOTER),
    },
    DailyActivity {
        weekday: Weekday::Fri,
        title: "Spend Dark Side Energy",
        before_reset: "Complete the Daily Challenges after your daily reset. Save Dark Side farming \
nodes until after the guild reset if possible.",
        after_reset: "Spend all Energy on Dark Side battles. The goal needs 4 refreshes.",
        footer: None,
    },
    DailyActivity {
        weekday: Weekday::Sat,
        title: "Squad Arena Battles",
        before_reset: "Spend Dark Side Energy (4 refreshes maximizes the guild tier). Save Squad \
Arena battles if possible.",
        after_reset: "Fight Squad Arena battles; 10 is the maximum to aim for.",
        footer: Some(BOTH_DAYS_FOOTER),
    },
];

/// Returns the catalog entry for `weekday`.
#[must_use]
pub fn daily_activity(weekday: Weekday) -> &'static DailyActivity {
    let index = weekday.num_days_from_sunday() as usize;
    WEEK.get(index).unwrap_or(&WEEK[0])
}

/// One titled block of an activity message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ActivitySection {
    /// Section heading.
    pub heading: String,
    /// Section text.
    pub body: String,
}

impl ActivitySection {
    fn new(heading: &str, body: &str) -> Self {
        Self {
            heading: heading.to_string(),
            body: body.to_string(),
        }
    }
}

/// A rendered reset announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ActivityMessage {
    /// Guild name or user label.
    pub label: String,
    /// Day the message is about.
    #[schema(value_type = String)]
    pub weekday: Weekday,
    /// Message title.
    pub title: String,
    /// Challenge title of the day.
    pub challenge: String,
    /// Instruction blocks in display order.
    pub sections: Vec<ActivitySection>,
    /// Optional footer.
    pub footer: Option<String>,
    /// Next guild reset, when known.
    pub next_guild_reset: Option<DateTime<Utc>>,
    /// `true` for personal-reset reminders.
    pub personal: bool,
}

/// Guild-reset announcement: today's after-reset instructions plus the
/// preparation for tomorrow.
#[must_use]
pub fn guild_message(
    label: &str,
    weekday: Weekday,
    next_guild_reset: Option<DateTime<Utc>>,
) -> ActivityMessage {
    let today = daily_activity(weekday);
    let tomorrow = daily_activity(weekday.succ());
    ActivityMessage {
        label: label.to_string(),
        weekday,
        title: format!("{weekday} Guild Activity"),
        challenge: today.title.to_string(),
        sections: vec![
            ActivitySection::new("Today's Instructions", today.after_reset),
            ActivitySection::new("Preparation for Tomorrow", tomorrow.before_reset),
        ],
        footer: today.footer.map(str::to_string),
        next_guild_reset,
        personal: false,
    }
}

/// Personal-reset reminder: both halves of today's instructions and the
/// linked guild's next reset.
#[must_use]
pub fn personal_message(
    label: &str,
    weekday: Weekday,
    next_guild_reset: Option<DateTime<Utc>>,
) -> ActivityMessage {
    let today = daily_activity(weekday);
    ActivityMessage {
        label: label.to_string(),
        weekday,
        title: format!("{weekday} Personal Reset Guild Activity"),
        challenge: today.title.to_string(),
        sections: vec![
            ActivitySection::new("Before Guild Reset Instructions", today.before_reset),
            ActivitySection::new("After Guild Reset Instructions", today.after_reset),
        ],
        footer: today.footer.map(str::to_string),
        next_guild_reset,
        personal: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_indexed_by_weekday() {
        for (i, entry) in WEEK.iter().enumerate() {
            assert_eq!(entry.weekday.num_days_from_sunday() as usize, i);
            assert_eq!(daily_activity(entry.weekday).weekday, entry.weekday);
        }
    }

    #[test]
    fn guild_message_prepares_for_tomorrow() {
        let msg = guild_message("Rogue Squadron", Weekday::Sat, None);
        assert_eq!(msg.challenge, "Squad Arena Battles");
        assert_eq!(msg.sections.len(), 2);
        let sunday = daily_activity(Weekday::Sun);
        assert_eq!(
            msg.sections.get(1).map(|s| s.body.as_str()),
            Some(sunday.before_reset)
        );
        assert!(msg.footer.is_some());
        assert!(!msg.personal);
    }

    #[test]
    fn personal_message_carries_both_halves() {
        let msg = personal_message("me", Weekday::Mon, None);
        let monday = daily_activity(Weekday::Mon);
        let bodies: Vec<&str> = msg.sections.iter().map(|s| s.body.as_str()).collect();
        assert_eq!(bodies, vec![monday.before_reset, monday.after_reset]);
        assert!(msg.personal);
        assert!(msg.footer.is_none());
    }
}
