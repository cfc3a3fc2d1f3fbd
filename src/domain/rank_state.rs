//! Per-player ladder tracking state and the diff step over it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::payout::PayoutWindow;
use super::{LadderType, NotifyTarget};

/// Key of one tracking record: a player on one ladder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RankKey {
    /// Opaque id of the tracking owner (a Discord user in practice).
    pub player_id: String,
    /// Ladder being tracked.
    pub ladder: LadderType,
}

impl RankKey {
    /// Builds a key.
    #[must_use]
    pub fn new(player_id: impl Into<String>, ladder: LadderType) -> Self {
        Self {
            player_id: player_id.into(),
            ladder,
        }
    }
}

impl fmt::Display for RankKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.player_id, self.ladder)
    }
}

/// Last-known rank of one tracked opponent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OpponentRank {
    /// Opponent's external id (ally code).
    pub external_id: String,
    /// Display name from the last successful fetch.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Rank stored at the last emitted change.
    pub rank: Option<u32>,
    /// Rank stored before that.
    pub previous_rank: Option<u32>,
    /// Payout instant already announced for this opponent.
    #[serde(default)]
    pub last_payout: Option<DateTime<Utc>>,
}

impl OpponentRank {
    /// A freshly added opponent with no history.
    #[must_use]
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            display_name: None,
            rank: None,
            previous_rank: None,
            last_payout: None,
        }
    }
}

/// Tracking state for one player on one ladder.
///
/// `previous_*` values change only when a diff is emitted or the record is
/// re-enabled; disabling keeps the whole history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RankState {
    /// Whether the polling loop should check this record.
    pub enabled: bool,
    /// The tracked player's own external id (ally code).
    pub external_id: String,
    /// Player display name from the last successful fetch.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Own rank stored at the last emitted change.
    pub self_rank: Option<u32>,
    /// Own rank stored before that.
    pub previous_self_rank: Option<u32>,
    /// Payout instant already announced for the player.
    #[serde(default)]
    pub last_payout: Option<DateTime<Utc>>,
    /// Opponents in insertion order; duplicates are kept.
    pub opponents: Vec<OpponentRank>,
    /// Channel that receives this record's notifications.
    pub notify_target: NotifyTarget,
    /// Last time the record changed.
    pub updated_at: DateTime<Utc>,
}

impl RankState {
    /// A new, enabled record with no history.
    #[must_use]
    pub fn new(external_id: impl Into<String>, notify_target: NotifyTarget, now: DateTime<Utc>) -> Self {
        Self {
            enabled: true,
            external_id: external_id.into(),
            display_name: None,
            self_rank: None,
            previous_self_rank: None,
            last_payout: None,
            opponents: Vec::new(),
            notify_target,
            updated_at: now,
        }
    }

    /// Re-enables the record, optionally switching the tracked account, and
    /// clears all rank history. Opponents are kept.
    pub fn reenable(
        &mut self,
        external_id: Option<String>,
        notify_target: NotifyTarget,
        now: DateTime<Utc>,
    ) {
        if let Some(id) = external_id {
            if id != self.external_id {
                self.display_name = None;
            }
            self.external_id = id;
        }
        self.enabled = true;
        self.notify_target = notify_target;
        self.self_rank = None;
        self.previous_self_rank = None;
        self.last_payout = None;
        for opponent in &mut self.opponents {
            opponent.rank = None;
            opponent.previous_rank = None;
            opponent.last_payout = None;
        }
        self.updated_at = now;
    }

    /// Removes every opponent entry with `external_id`. Returns `true` if
    /// any entry was removed.
    pub fn remove_opponent(&mut self, external_id: &str) -> bool {
        let before = self.opponents.len();
        self.opponents.retain(|o| o.external_id != external_id);
        self.opponents.len() != before
    }

    /// Distinct external ids to fetch for one poll: the player first, then
    /// opponents in insertion order.
    #[must_use]
    pub fn identities(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(self.opponents.len() + 1);
        for id in std::iter::once(&self.external_id).chain(self.opponents.iter().map(|o| &o.external_id)) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }
}

/// Whose rank a [`ChangeEvent`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Identity {
    /// The tracked player.
    Player,
    /// One of the player's opponents.
    Opponent,
}

/// One emitted diff for a single identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    /// Player or opponent.
    pub identity: Identity,
    /// External id of the identity.
    pub external_id: String,
    /// Display name (falls back to the external id).
    pub name: String,
    /// Rank stored before this poll.
    pub previous_rank: Option<u32>,
    /// Rank reported by this poll.
    pub current_rank: u32,
    /// Whether the diff was forced by a refresh request.
    pub forced: bool,
    /// Payout computed from the identity's UTC offset.
    pub payout: PayoutWindow,
}

impl ChangeEvent {
    /// `true` if the reported rank differs from the stored one.
    #[must_use]
    pub fn rank_changed(&self) -> bool {
        self.previous_rank != Some(self.current_rank)
    }

    /// `true` if this event belongs in a rank change/table message.
    #[must_use]
    pub fn counts_as_change(&self) -> bool {
        self.rank_changed() || self.forced
    }
}

/// Applies one observed rank to a stored `(rank, previous)` pair.
///
/// When the rank moved or `emit_anyway` is set, the stored rank becomes the
/// previous one, the observation is stored, and the prior stored value is
/// returned. Otherwise nothing changes and `None` is returned.
pub fn observe(
    rank: &mut Option<u32>,
    previous: &mut Option<u32>,
    current: u32,
    emit_anyway: bool,
) -> Option<Option<u32>> {
    if *rank == Some(current) && !emit_anyway {
        return None;
    }
    let prior = *rank;
    *previous = prior;
    *rank = Some(current);
    Some(prior)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> RankState {
        RankState::new("123456789", NotifyTarget::from("chan"), Utc::now())
    }

    #[test]
    fn observe_skips_unchanged_rank() {
        let (mut rank, mut previous) = (Some(10), Some(12));
        assert_eq!(observe(&mut rank, &mut previous, 10, false), None);
        assert_eq!((rank, previous), (Some(10), Some(12)));
    }

    #[test]
    fn observe_shifts_history_on_change() {
        let (mut rank, mut previous) = (Some(50), None);
        assert_eq!(observe(&mut rank, &mut previous, 42, false), Some(Some(50)));
        assert_eq!((rank, previous), (Some(42), Some(50)));
    }

    #[test]
    fn observe_emits_when_forced() {
        let (mut rank, mut previous) = (Some(7), Some(9));
        assert_eq!(observe(&mut rank, &mut previous, 7, true), Some(Some(7)));
        assert_eq!((rank, previous), (Some(7), Some(7)));
    }

    #[test]
    fn identities_are_distinct_and_ordered() {
        let mut s = state();
        s.opponents.push(OpponentRank::new("222"));
        s.opponents.push(OpponentRank::new("111"));
        s.opponents.push(OpponentRank::new("222"));
        s.opponents.push(OpponentRank::new("123456789"));
        assert_eq!(s.identities(), vec!["123456789", "222", "111"]);
    }

    #[test]
    fn remove_opponent_drops_duplicates() {
        let mut s = state();
        s.opponents.push(OpponentRank::new("222"));
        s.opponents.push(OpponentRank::new("333"));
        s.opponents.push(OpponentRank::new("222"));
        assert!(s.remove_opponent("222"));
        assert_eq!(s.opponents.len(), 1);
        assert!(!s.remove_opponent("222"));
    }

    #[test]
    fn reenable_clears_history_but_keeps_opponents() {
        let mut s = state();
        s.self_rank = Some(3);
        s.previous_self_rank = Some(4);
        s.last_payout = Some(Utc::now());
        let mut opp = OpponentRank::new("222");
        opp.rank = Some(8);
        opp.last_payout = Some(Utc::now());
        s.opponents.push(opp);
        s.enabled = false;

        s.reenable(None, NotifyTarget::from("other"), Utc::now());
        assert!(s.enabled);
        assert_eq!(s.self_rank, None);
        assert_eq!(s.previous_self_rank, None);
        assert_eq!(s.opponents.len(), 1);
        assert_eq!(s.opponents.first().and_then(|o| o.rank), None);
        assert_eq!(s.last_payout, None);
        assert_eq!(s.opponents.first().and_then(|o| o.last_payout), None);
        assert_eq!(s.notify_target.as_str(), "other");
        assert_eq!(s.external_id, "123456789");
    }

    #[test]
    fn key_display() {
        let key = RankKey::new("u1", LadderType::SquadArena);
        assert_eq!(key.to_string(), "u1/squad");
    }
}
