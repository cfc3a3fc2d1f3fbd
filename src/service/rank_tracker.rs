//! Rank tracker: diff-based change detection over polled ladder ranks.
//!
//! Each `(player, ladder)` record lives behind its own lock. A poll holds
//! that lock from the fetch through the write-back, so two polls of the
//! same record can never both see the old ranks and emit the same change.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;

use crate::domain::notification::RankRow;
use crate::domain::rank_state::{Identity, OpponentRank, observe};
use crate::domain::{
    ChangeEvent, KeyedStore, LadderType, Notification, NotifyTarget, PlayerRanks, RankKey,
    RankState, payout_window,
};
use crate::error::HeraldError;
use crate::persistence::{PersistedState, StateStore};
use crate::sink::NotificationSink;
use crate::source::LadderRankSource;

/// Tracks ladder ranks per player and notifies on change.
#[derive(Debug)]
pub struct RankTracker {
    records: KeyedStore<RankKey, RankState>,
    source: Arc<dyn LadderRankSource>,
    sink: Arc<dyn NotificationSink>,
    store: Option<Arc<dyn StateStore>>,
}

impl RankTracker {
    /// Creates a tracker with no records.
    #[must_use]
    pub fn new(
        source: Arc<dyn LadderRankSource>,
        sink: Arc<dyn NotificationSink>,
        store: Option<Arc<dyn StateStore>>,
    ) -> Self {
        Self {
            records: KeyedStore::new(),
            source,
            sink,
            store,
        }
    }

    async fn persist(&self, key: &RankKey, state: &RankState) -> Result<(), HeraldError> {
        match &self.store {
            Some(store) => store.save_rank_state(key, state).await,
            None => Ok(()),
        }
    }

    /// Starts (or restarts) tracking `external_id` on `ladder` for
    /// `player_id`.
    ///
    /// Re-enabling an existing record clears its rank history and keeps
    /// its opponents.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::InvalidRequest`] for an empty id or target,
    /// and [`HeraldError::PersistenceError`] if the write fails.
    pub async fn enable_tracking(
        &self,
        player_id: &str,
        ladder: LadderType,
        external_id: &str,
        notify_target: NotifyTarget,
        now: DateTime<Utc>,
    ) -> Result<RankState, HeraldError> {
        let external_id = external_id.trim();
        if player_id.trim().is_empty() || external_id.is_empty() {
            return Err(HeraldError::InvalidRequest(
                "player id and ally code must not be empty".to_string(),
            ));
        }
        if notify_target.is_empty() {
            return Err(HeraldError::InvalidRequest(
                "notification target must not be empty".to_string(),
            ));
        }

        let key = RankKey::new(player_id, ladder);
        let (entry, created) = self
            .records
            .get_or_insert_with(key.clone(), || {
                RankState::new(external_id, notify_target.clone(), now)
            })
            .await;
        let mut state = entry.lock().await;
        let mut updated = state.clone();
        if !created {
            updated.reenable(Some(external_id.to_string()), notify_target, now);
        }
        self.persist(&key, &updated).await?;
        *state = updated.clone();

        tracing::info!(%key, %external_id, created, "rank tracking enabled");
        Ok(updated)
    }

    /// Stops polling a record and keeps its history. Returns `false` if the
    /// record does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::PersistenceError`] if the write fails.
    pub async fn disable_tracking(
        &self,
        player_id: &str,
        ladder: LadderType,
        now: DateTime<Utc>,
    ) -> Result<bool, HeraldError> {
        let key = RankKey::new(player_id, ladder);
        let Some(entry) = self.records.get(&key).await else {
            return Ok(false);
        };
        let mut state = entry.lock().await;
        let mut updated = state.clone();
        updated.enabled = false;
        updated.updated_at = now;
        self.persist(&key, &updated).await?;
        *state = updated;
        tracing::info!(%key, "rank tracking disabled");
        Ok(true)
    }

    /// Appends an opponent to a record. Duplicates are kept.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::TrackingNotFound`] if the record does not
    /// exist, [`HeraldError::InvalidRequest`] for an empty id, and
    /// [`HeraldError::PersistenceError`] if the write fails.
    pub async fn add_opponent(
        &self,
        player_id: &str,
        ladder: LadderType,
        external_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RankState, HeraldError> {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return Err(HeraldError::InvalidRequest("ally code must not be empty".to_string()));
        }
        self.update(player_id, ladder, now, |state| {
            state.opponents.push(OpponentRank::new(external_id));
        })
        .await
    }

    /// Removes every entry for an opponent. Returns `false` if the record
    /// had no such opponent.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::TrackingNotFound`] if the record does not
    /// exist and [`HeraldError::PersistenceError`] if the write fails.
    pub async fn remove_opponent(
        &self,
        player_id: &str,
        ladder: LadderType,
        external_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, HeraldError> {
        let mut removed = false;
        self.update(player_id, ladder, now, |state| {
            removed = state.remove_opponent(external_id.trim());
        })
        .await?;
        Ok(removed)
    }

    async fn update(
        &self,
        player_id: &str,
        ladder: LadderType,
        now: DateTime<Utc>,
        mutate: impl FnOnce(&mut RankState),
    ) -> Result<RankState, HeraldError> {
        let key = RankKey::new(player_id, ladder);
        let entry = self
            .records
            .get(&key)
            .await
            .ok_or_else(|| HeraldError::TrackingNotFound {
                player_id: player_id.to_string(),
                ladder,
            })?;
        let mut state = entry.lock().await;
        let mut updated = state.clone();
        mutate(&mut updated);
        updated.updated_at = now;
        self.persist(&key, &updated).await?;
        *state = updated.clone();
        Ok(updated)
    }

    /// Returns a copy of one record.
    pub async fn tracking(&self, player_id: &str, ladder: LadderType) -> Option<RankState> {
        let entry = self.records.get(&RankKey::new(player_id, ladder)).await?;
        let state = entry.lock().await.clone();
        Some(state)
    }

    /// Keys of every enabled record, sorted.
    pub async fn enabled_keys(&self) -> Vec<RankKey> {
        let mut enabled = Vec::new();
        for key in self.records.keys().await {
            if let Some(entry) = self.records.get(&key).await
                && entry.lock().await.enabled
            {
                enabled.push(key);
            }
        }
        enabled.sort();
        enabled
    }

    /// Fetches current ranks for a player directly from the source.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::PlayerNotFound`] if the source does not know
    /// the player and [`HeraldError::SourceUnavailable`] on source failure.
    pub async fn lookup(&self, external_id: &str) -> Result<PlayerRanks, HeraldError> {
        self.source
            .fetch_ranks(external_id.trim())
            .await?
            .ok_or_else(|| HeraldError::PlayerNotFound(external_id.to_string()))
    }

    /// Polls one record and returns the emitted change events.
    ///
    /// A disabled record yields no events. Each identity emits when its
    /// rank moved, when `force` is set, or when its payout opens this
    /// minute and has not been announced yet; emitting shifts its stored
    /// rank into the previous slot. Identities whose fetch fails are logged
    /// and left untouched. The new ranks only replace the stored ones once
    /// they are persisted.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::TrackingNotFound`] if the record does not
    /// exist, and [`HeraldError::PersistenceError`] if the diff could not be
    /// written; the record then keeps its previous ranks.
    pub async fn poll(
        &self,
        key: &RankKey,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<ChangeEvent>, HeraldError> {
        self.poll_record(key, force, now)
            .await
            .map(|(events, _)| events)
    }

    async fn poll_record(
        &self,
        key: &RankKey,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<(Vec<ChangeEvent>, NotifyTarget), HeraldError> {
        let entry = self
            .records
            .get(key)
            .await
            .ok_or_else(|| HeraldError::TrackingNotFound {
                player_id: key.player_id.clone(),
                ladder: key.ladder,
            })?;
        let mut state = entry.lock().await;
        if !state.enabled {
            return Ok((Vec::new(), state.notify_target.clone()));
        }

        let fetched = self.fetch_all(key, &state.identities()).await;
        let ladder = key.ladder;
        let mut events = Vec::new();
        let mut updated = state.clone();

        let RankState {
            external_id,
            display_name,
            self_rank,
            previous_self_rank,
            last_payout,
            opponents,
            ..
        } = &mut updated;

        if let Some(ranks) = fetched.get(external_id.as_str()) {
            *display_name = Some(ranks.display_name.clone());
            let slots = Slots {
                rank: self_rank,
                previous: previous_self_rank,
                last_payout,
            };
            if let Some(event) = diff(Identity::Player, external_id, ranks, ladder, slots, force, now) {
                events.push(event);
            }
        }

        for opponent in opponents.iter_mut() {
            let Some(ranks) = fetched.get(opponent.external_id.as_str()) else {
                continue;
            };
            opponent.display_name = Some(ranks.display_name.clone());
            let slots = Slots {
                rank: &mut opponent.rank,
                previous: &mut opponent.previous_rank,
                last_payout: &mut opponent.last_payout,
            };
            if let Some(event) = diff(Identity::Opponent, &opponent.external_id, ranks, ladder, slots, force, now) {
                events.push(event);
            }
        }

        if !events.is_empty() {
            updated.updated_at = now;
            if let Err(e) = self.persist(key, &updated).await {
                tracing::error!(%key, error = %e, "failed to persist rank diff, keeping previous ranks");
                return Err(e);
            }
        }
        *state = updated;
        Ok((events, state.notify_target.clone()))
    }

    async fn fetch_all(&self, key: &RankKey, ids: &[String]) -> HashMap<String, PlayerRanks> {
        let results = join_all(ids.iter().map(|id| self.source.fetch_ranks(id))).await;
        let mut fetched = HashMap::with_capacity(ids.len());
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(Some(ranks)) => {
                    fetched.insert(id.clone(), ranks);
                }
                Ok(None) => {
                    tracing::warn!(%key, ally_code = %id, "player not found at source, skipping");
                }
                Err(e) => {
                    tracing::warn!(%key, ally_code = %id, error = %e, "rank fetch failed, skipping");
                }
            }
        }
        fetched
    }

    /// Polls one record and delivers the resulting messages to its target.
    /// Returns the number of messages delivered.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::TrackingNotFound`] if the record does not
    /// exist, or the last delivery error if any message failed.
    pub async fn poll_and_notify(&self, key: &RankKey, now: DateTime<Utc>) -> Result<usize, HeraldError> {
        let (events, target) = self.poll_record(key, false, now).await?;
        let notifications = Notification::from_changes(key.ladder, &events);

        let mut delivered = 0;
        let mut last_err = None;
        for notification in &notifications {
            match self.sink.deliver(&target, notification).await {
                Ok(()) => delivered += 1,
                Err(e) => last_err = Some(e),
            }
        }
        if delivered > 0 {
            tracing::info!(%key, %target, delivered, changes = events.len(), "rank notifications sent");
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(delivered),
        }
    }

    /// Forces every identity of a record to emit and returns the current
    /// table, best rank first. Nothing is sent to the sink.
    ///
    /// Returns `None` if the record is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::TrackingNotFound`] if the record does not
    /// exist.
    pub async fn force_refresh(
        &self,
        player_id: &str,
        ladder: LadderType,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<RankRow>>, HeraldError> {
        let key = RankKey::new(player_id, ladder);
        let (events, _) = self.poll_record(&key, true, now).await?;
        if events.is_empty() && !self.tracking(player_id, ladder).await.is_some_and(|s| s.enabled) {
            return Ok(None);
        }
        let mut rows: Vec<RankRow> = events.iter().map(RankRow::from).collect();
        rows.sort_by_key(|r| r.current_rank);
        Ok(Some(rows))
    }

    /// Loads persisted tracking records into memory.
    pub async fn restore(&self, state: &PersistedState) {
        for (key, record) in &state.rank_states {
            self.records.insert(key.clone(), record.clone()).await;
        }
        tracing::info!(records = self.records.len().await, "rank tracking restored");
    }
}

/// Stored history of one identity, borrowed from its record.
struct Slots<'a> {
    rank: &'a mut Option<u32>,
    previous: &'a mut Option<u32>,
    last_payout: &'a mut Option<DateTime<Utc>>,
}

/// Applies one fetched rank to an identity's history and builds the event
/// if it emits.
///
/// An open payout emits once per payout instant; later polls in the same
/// minute only emit on a rank move or when forced, and their event carries
/// a closed payout so it is not summarized again.
fn diff(
    identity: Identity,
    external_id: &str,
    ranks: &PlayerRanks,
    ladder: LadderType,
    slots: Slots<'_>,
    force: bool,
    now: DateTime<Utc>,
) -> Option<ChangeEvent> {
    let current = ranks.rank_on(ladder);
    let mut payout = payout_window(ranks.utc_offset_minutes, ladder, now);
    payout.is_open = payout.is_open && *slots.last_payout != Some(payout.at);
    let prior = observe(slots.rank, slots.previous, current, force || payout.is_open)?;
    if payout.is_open {
        *slots.last_payout = Some(payout.at);
    }
    Some(ChangeEvent {
        identity,
        external_id: external_id.to_string(),
        name: ranks.display_name.clone(),
        previous_rank: prior,
        current_rank: current,
        forced: force,
        payout,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::domain::RankGlyph;
    use crate::persistence::testing::FlakyStore;
    use crate::sink::testing::RecordingSink;

    /// Source answering from a mutable table; ids missing from the table
    /// fail.
    #[derive(Debug, Default)]
    struct TableSource {
        ranks: Mutex<HashMap<String, PlayerRanks>>,
        calls: Mutex<usize>,
    }

    impl TableSource {
        async fn set(&self, id: &str, squad: u32, offset: i32) {
            self.ranks.lock().await.insert(
                id.to_string(),
                PlayerRanks {
                    squad_rank: squad,
                    fleet_rank: squad + 1,
                    utc_offset_minutes: offset,
                    display_name: format!("name-{id}"),
                },
            );
        }
    }

    #[async_trait]
    impl LadderRankSource for TableSource {
        async fn fetch_ranks(&self, external_id: &str) -> Result<Option<PlayerRanks>, HeraldError> {
            *self.calls.lock().await += 1;
            self.ranks
                .lock()
                .await
                .get(external_id)
                .cloned()
                .map(Some)
                .ok_or_else(|| HeraldError::SourceUnavailable("timeout".to_string()))
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        let Ok(dt) = DateTime::parse_from_rfc3339(s) else {
            panic!("bad timestamp {s}");
        };
        dt.with_timezone(&Utc)
    }

    // Noon UTC; with a zero offset the squad payout is at 18:00 UTC.
    const NOON: &str = "2025-05-05T12:00:00Z";

    fn tracker() -> (RankTracker, Arc<TableSource>, Arc<RecordingSink>) {
        let source = Arc::new(TableSource::default());
        let sink = Arc::new(RecordingSink::default());
        let tracker = RankTracker::new(
            Arc::clone(&source) as Arc<dyn LadderRankSource>,
            Arc::clone(&sink) as Arc<dyn NotificationSink>,
            None,
        );
        (tracker, source, sink)
    }

    async fn enable(tracker: &RankTracker) -> RankKey {
        let enabled = tracker
            .enable_tracking("u1", LadderType::SquadArena, "111", NotifyTarget::from("dm"), utc(NOON))
            .await;
        assert!(enabled.is_ok());
        RankKey::new("u1", LadderType::SquadArena)
    }

    #[tokio::test]
    async fn first_poll_emits_then_unchanged_is_silent() {
        let (tracker, source, _) = tracker();
        let key = enable(&tracker).await;
        source.set("111", 50, 0).await;

        let Ok(first) = tracker.poll(&key, false, utc(NOON)).await else {
            panic!("poll failed");
        };
        assert_eq!(first.len(), 1);
        assert_eq!(first.first().and_then(|e| e.previous_rank), None);

        let Ok(second) = tracker.poll(&key, false, utc("2025-05-05T12:01:00Z")).await else {
            panic!("poll failed");
        };
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn single_change_produces_one_improvement_message() {
        let (tracker, source, sink) = tracker();
        let key = enable(&tracker).await;
        source.set("111", 50, 0).await;
        let _ = tracker.poll(&key, false, utc(NOON)).await;

        source.set("111", 42, 0).await;
        let sent = tracker.poll_and_notify(&key, utc("2025-05-05T12:01:00Z")).await;
        assert!(matches!(sent, Ok(1)));

        let delivered = sink.take().await;
        let [(target, Notification::RankChange { row, .. })] = delivered.as_slice() else {
            panic!("expected one rank change, got {delivered:?}");
        };
        assert_eq!(target.as_str(), "dm");
        assert_eq!((row.previous_rank, row.current_rank), (Some(50), 42));
        assert_eq!(row.glyph, RankGlyph::Improved);

        let Some(state) = tracker.tracking("u1", LadderType::SquadArena).await else {
            panic!("record missing");
        };
        assert_eq!((state.self_rank, state.previous_self_rank), (Some(42), Some(50)));
        assert_eq!(state.display_name.as_deref(), Some("name-111"));
    }

    #[tokio::test]
    async fn failed_fetch_skips_only_that_identity() {
        let (tracker, source, _) = tracker();
        let key = enable(&tracker).await;
        let _ = tracker.add_opponent("u1", LadderType::SquadArena, "222", utc(NOON)).await;
        source.set("111", 10, 0).await;

        let Ok(events) = tracker.poll(&key, false, utc(NOON)).await else {
            panic!("poll failed");
        };
        assert_eq!(events.len(), 1);
        let Some(state) = tracker.tracking("u1", LadderType::SquadArena).await else {
            panic!("record missing");
        };
        assert_eq!(state.opponents.first().and_then(|o| o.rank), None);
    }

    #[tokio::test]
    async fn duplicate_opponents_are_fetched_once() {
        let (tracker, source, _) = tracker();
        let key = enable(&tracker).await;
        for id in ["222", "222", "111"] {
            let _ = tracker.add_opponent("u1", LadderType::SquadArena, id, utc(NOON)).await;
        }
        source.set("111", 10, 0).await;
        source.set("222", 20, 0).await;
        let _ = tracker.poll(&key, false, utc(NOON)).await;
        assert_eq!(*source.calls.lock().await, 2);
    }

    #[tokio::test]
    async fn open_payout_emits_without_a_rank_move() {
        let (tracker, source, _) = tracker();
        let key = enable(&tracker).await;
        source.set("111", 3, 0).await;
        let _ = tracker.poll(&key, false, utc(NOON)).await;

        let Ok(events) = tracker.poll(&key, false, utc("2025-05-05T18:00:10Z")).await else {
            panic!("poll failed");
        };
        assert_eq!(events.len(), 1);
        assert!(events.iter().all(|e| e.payout.is_open && !e.rank_changed()));

        let Ok(again) = tracker.poll(&key, false, utc("2025-05-05T18:00:40Z")).await else {
            panic!("poll failed");
        };
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn payout_summary_is_sent_once_per_payout() {
        let (tracker, source, sink) = tracker();
        let key = enable(&tracker).await;
        source.set("111", 3, 0).await;
        let _ = tracker.poll(&key, false, utc(NOON)).await;

        for second in ["05", "25", "45"] {
            let now = utc(&format!("2025-05-05T18:00:{second}Z"));
            assert!(tracker.poll_and_notify(&key, now).await.is_ok());
        }
        let delivered = sink.take().await;
        assert!(matches!(
            delivered.as_slice(),
            [(_, Notification::PayoutSummary { .. })]
        ));

        // A move later in the payout minute is a plain change.
        source.set("111", 2, 0).await;
        assert!(matches!(
            tracker.poll_and_notify(&key, utc("2025-05-05T18:00:55Z")).await,
            Ok(1)
        ));
        let delivered = sink.take().await;
        assert!(matches!(
            delivered.as_slice(),
            [(_, Notification::RankChange { .. })]
        ));

        let Ok(next_day) = tracker.poll(&key, false, utc("2025-05-06T18:00:05Z")).await else {
            panic!("poll failed");
        };
        assert!(matches!(next_day.as_slice(), [e] if e.payout.is_open));
    }

    #[tokio::test]
    async fn history_shifts_one_step_per_poll() {
        let (tracker, source, _) = tracker();
        let key = enable(&tracker).await;
        let _ = tracker.add_opponent("u1", LadderType::SquadArena, "222", utc(NOON)).await;

        let mut prior: Option<(u32, u32)> = None;
        for (minute, (own, theirs)) in [(50, 60), (45, 55), (40, 50), (35, 45)].into_iter().enumerate() {
            source.set("111", own, 0).await;
            source.set("222", theirs, 0).await;
            let now = utc(&format!("2025-05-05T12:0{minute}:00Z"));
            let Ok(events) = tracker.poll(&key, false, now).await else {
                panic!("poll failed");
            };

            let [player, opponent] = events.as_slice() else {
                panic!("expected two events, got {events:?}");
            };
            assert_eq!(player.identity, Identity::Player);
            assert_eq!(player.previous_rank, prior.map(|(p, _)| p));
            assert_eq!(player.current_rank, own);
            assert_eq!(opponent.identity, Identity::Opponent);
            assert_eq!(opponent.previous_rank, prior.map(|(_, o)| o));
            assert_eq!(opponent.current_rank, theirs);

            let Some(state) = tracker.tracking("u1", LadderType::SquadArena).await else {
                panic!("record missing");
            };
            assert_eq!(state.self_rank, Some(own));
            assert_eq!(state.previous_self_rank, prior.map(|(p, _)| p));
            let Some(stored) = state.opponents.first() else {
                panic!("opponent missing");
            };
            assert_eq!(stored.rank, Some(theirs));
            assert_eq!(stored.previous_rank, prior.map(|(_, o)| o));

            prior = Some((own, theirs));
        }
    }

    #[tokio::test]
    async fn failed_write_keeps_previous_ranks_and_reemits() {
        let source = Arc::new(TableSource::default());
        let store = Arc::new(FlakyStore::default());
        let tracker = RankTracker::new(
            Arc::clone(&source) as Arc<dyn LadderRankSource>,
            Arc::new(RecordingSink::default()),
            Some(Arc::clone(&store) as Arc<dyn StateStore>),
        );
        let key = enable(&tracker).await;
        source.set("111", 50, 0).await;

        store.set_failing(true);
        assert!(matches!(
            tracker.poll(&key, false, utc(NOON)).await,
            Err(HeraldError::PersistenceError(_))
        ));
        assert_eq!(
            tracker.tracking("u1", LadderType::SquadArena).await.and_then(|s| s.self_rank),
            None
        );

        store.set_failing(false);
        let Ok(events) = tracker.poll(&key, false, utc("2025-05-05T12:01:00Z")).await else {
            panic!("poll failed");
        };
        assert!(matches!(events.as_slice(), [e] if e.previous_rank.is_none() && e.current_rank == 50));
        let Ok(persisted) = store.load_all().await else {
            panic!("load failed");
        };
        assert_eq!(
            persisted.rank_states.first().map(|(_, s)| s.self_rank),
            Some(Some(50))
        );
    }

    #[tokio::test]
    async fn disabled_records_are_skipped_and_keep_history() {
        let (tracker, source, _) = tracker();
        let key = enable(&tracker).await;
        source.set("111", 7, 0).await;
        let _ = tracker.poll(&key, false, utc(NOON)).await;

        assert!(matches!(
            tracker.disable_tracking("u1", LadderType::SquadArena, utc(NOON)).await,
            Ok(true)
        ));
        assert!(tracker.enabled_keys().await.is_empty());
        source.set("111", 1, 0).await;
        assert!(matches!(tracker.poll(&key, false, utc(NOON)).await, Ok(v) if v.is_empty()));
        assert_eq!(
            tracker.tracking("u1", LadderType::SquadArena).await.and_then(|s| s.self_rank),
            Some(7)
        );
    }

    #[tokio::test]
    async fn reenable_resets_history() {
        let (tracker, source, _) = tracker();
        let key = enable(&tracker).await;
        source.set("111", 7, 0).await;
        let _ = tracker.poll(&key, false, utc(NOON)).await;
        let _ = tracker.disable_tracking("u1", LadderType::SquadArena, utc(NOON)).await;

        let Ok(state) = tracker
            .enable_tracking("u1", LadderType::SquadArena, "111", NotifyTarget::from("dm"), utc(NOON))
            .await
        else {
            panic!("re-enable failed");
        };
        assert_eq!(state.self_rank, None);
        assert_eq!(tracker.enabled_keys().await, vec![key]);
    }

    #[tokio::test]
    async fn force_refresh_returns_the_sorted_table_without_sending() {
        let (tracker, source, sink) = tracker();
        let _ = enable(&tracker).await;
        let _ = tracker.add_opponent("u1", LadderType::SquadArena, "222", utc(NOON)).await;
        source.set("111", 30, 0).await;
        source.set("222", 4, 0).await;
        let _ = tracker.poll(&RankKey::new("u1", LadderType::SquadArena), false, utc(NOON)).await;

        let Ok(Some(rows)) = tracker
            .force_refresh("u1", LadderType::SquadArena, utc("2025-05-05T12:05:00Z"))
            .await
        else {
            panic!("refresh failed");
        };
        let ranks: Vec<u32> = rows.iter().map(|r| r.current_rank).collect();
        assert_eq!(ranks, vec![4, 30]);
        assert!(rows.iter().all(|r| r.glyph == RankGlyph::Unchanged));
        assert!(sink.take().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_records_are_not_found() {
        let (tracker, _, _) = tracker();
        assert!(matches!(
            tracker.add_opponent("ghost", LadderType::FleetArena, "1", utc(NOON)).await,
            Err(HeraldError::TrackingNotFound { .. })
        ));
        assert!(matches!(
            tracker.disable_tracking("ghost", LadderType::FleetArena, utc(NOON)).await,
            Ok(false)
        ));
        assert!(matches!(
            tracker.remove_opponent("ghost", LadderType::FleetArena, "1", utc(NOON)).await,
            Err(HeraldError::TrackingNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn lookup_maps_missing_players() {
        let (tracker, source, _) = tracker();
        source.set("111", 9, 60).await;
        assert_eq!(tracker.lookup("111").await.map(|r| r.squad_rank).ok(), Some(9));
        assert!(matches!(
            tracker.lookup("999").await,
            Err(HeraldError::SourceUnavailable(_))
        ));
    }
}
