//! Notification payloads handed to a [`NotificationSink`](crate::sink::NotificationSink).
//!
//! Every payload is a tagged enum variant so WebSocket clients and webhook
//! receivers can dispatch on the `kind` field.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::activity::ActivityMessage;
use super::rank_state::ChangeEvent;
use super::{LadderType, NotifyTarget};

/// Direction of a rank move. Lower ranks are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum RankGlyph {
    /// Rank number went down (`+`).
    #[serde(rename = "+")]
    Improved,
    /// Rank number went up (`-`).
    #[serde(rename = "-")]
    Declined,
    /// Same rank, or no earlier rank to compare (`/`).
    #[serde(rename = "/")]
    Unchanged,
}

impl RankGlyph {
    /// Glyph for a move from `previous` to `current`.
    #[must_use]
    pub fn between(previous: Option<u32>, current: u32) -> Self {
        match previous {
            Some(prev) if current < prev => Self::Improved,
            Some(prev) if current > prev => Self::Declined,
            _ => Self::Unchanged,
        }
    }

    /// Single-character form.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Improved => '+',
            Self::Declined => '-',
            Self::Unchanged => '/',
        }
    }
}

/// One line of a rank change message or table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RankRow {
    /// Display name.
    pub name: String,
    /// External id (ally code).
    pub external_id: String,
    /// Stored rank before the poll.
    pub previous_rank: Option<u32>,
    /// Rank reported by the poll.
    pub current_rank: u32,
    /// Direction of the move.
    pub glyph: RankGlyph,
}

impl From<&ChangeEvent> for RankRow {
    fn from(event: &ChangeEvent) -> Self {
        Self {
            name: event.name.clone(),
            external_id: event.external_id.clone(),
            previous_rank: event.previous_rank,
            current_rank: event.current_rank,
            glyph: RankGlyph::between(event.previous_rank, event.current_rank),
        }
    }
}

/// An identity whose payout is open, tagged with its current rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PayoutRow {
    /// Display name.
    pub name: String,
    /// Rank at payout.
    pub rank: u32,
}

/// Identities sharing one payout instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PayoutGroup {
    /// Payout instant.
    pub payout_at: DateTime<Utc>,
    /// Rows, best rank first.
    pub rows: Vec<PayoutRow>,
}

/// Message delivered to a notification target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Daily guild or personal reset announcement.
    Activity(ActivityMessage),
    /// Exactly one identity's rank moved.
    RankChange {
        /// Ladder the change happened on.
        ladder: LadderType,
        /// The change.
        row: RankRow,
    },
    /// Several identities moved; rows sorted by current rank.
    RankTable {
        /// Ladder the changes happened on.
        ladder: LadderType,
        /// Rows, best rank first.
        rows: Vec<RankRow>,
    },
    /// Identities whose payout is open this minute.
    PayoutSummary {
        /// Ladder paying out.
        ladder: LadderType,
        /// Groups ordered by payout instant.
        groups: Vec<PayoutGroup>,
    },
    /// A guild raid was launched.
    RaidLaunch {
        /// Guild name.
        label: String,
        /// Launch instant.
        launched_at: DateTime<Utc>,
        /// Tickets left after the launch.
        tickets_remaining: u64,
    },
}

impl Notification {
    /// Returns the serialized `kind` tag.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::Activity(_) => "activity",
            Self::RankChange { .. } => "rank_change",
            Self::RankTable { .. } => "rank_table",
            Self::PayoutSummary { .. } => "payout_summary",
            Self::RaidLaunch { .. } => "raid_launch",
        }
    }

    /// Builds the messages for one poll's change events.
    ///
    /// Rank moves (and forced refreshes) become a single
    /// [`Notification::RankChange`] when exactly one identity is involved
    /// and one [`Notification::RankTable`] otherwise. Identities whose
    /// payout is open additionally produce one
    /// [`Notification::PayoutSummary`].
    #[must_use]
    pub fn from_changes(ladder: LadderType, events: &[ChangeEvent]) -> Vec<Self> {
        let mut out = Vec::new();

        let mut rows: Vec<RankRow> = events
            .iter()
            .filter(|e| e.counts_as_change())
            .map(RankRow::from)
            .collect();
        rows.sort_by_key(|r| r.current_rank);
        match rows.len() {
            0 => {}
            1 => out.extend(rows.into_iter().map(|row| Self::RankChange { ladder, row })),
            _ => out.push(Self::RankTable { ladder, rows }),
        }

        let mut groups: BTreeMap<DateTime<Utc>, Vec<PayoutRow>> = BTreeMap::new();
        for event in events.iter().filter(|e| e.payout.is_open) {
            groups.entry(event.payout.at).or_default().push(PayoutRow {
                name: event.name.clone(),
                rank: event.current_rank,
            });
        }
        if !groups.is_empty() {
            let groups = groups
                .into_iter()
                .map(|(payout_at, mut rows)| {
                    rows.sort_by_key(|r| r.rank);
                    PayoutGroup { payout_at, rows }
                })
                .collect();
            out.push(Self::PayoutSummary { ladder, groups });
        }

        out
    }
}

/// A notification addressed to a target, as carried on the event bus.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Dispatch {
    /// Recipient.
    pub target: NotifyTarget,
    /// Payload.
    pub notification: Notification,
    /// When the dispatch was created.
    pub timestamp: DateTime<Utc>,
}

impl Dispatch {
    /// Wraps `notification` for `target`.
    #[must_use]
    pub fn new(target: NotifyTarget, notification: Notification, timestamp: DateTime<Utc>) -> Self {
        Self {
            target,
            notification,
            timestamp,
        }
    }
}
