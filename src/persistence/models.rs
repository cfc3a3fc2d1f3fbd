//! Stored shapes loaded back at startup.

use crate::domain::{RaidLaunch, RankKey, RankState, TriggerRecord};

/// Everything a [`StateStore`](super::StateStore) holds.
#[derive(Debug, Clone, Default)]
pub struct PersistedState {
    /// Guild reset slots; `None` marks an unregistered placeholder.
    pub guild_triggers: Vec<(String, Option<TriggerRecord>)>,
    /// Personal reset slots; `None` marks an unregistered placeholder.
    pub personal_triggers: Vec<(String, Option<TriggerRecord>)>,
    /// Rank tracking records.
    pub rank_states: Vec<(RankKey, RankState)>,
    /// Raid launch configurations by guild id.
    pub raids: Vec<(String, RaidLaunch)>,
}

impl PersistedState {
    /// Total number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guild_triggers.len()
            + self.personal_triggers.len()
            + self.rank_states.len()
            + self.raids.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
