//! Rank tracking DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{LadderType, NotifyTarget, PlayerRanks, RankRow};

/// Request body for `PUT /players/{player_id}/tracking/{ladder}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EnableTrackingRequest {
    /// Ally code of the tracked player.
    pub ally_code: String,
    /// Where change notifications are delivered.
    pub notify_target: NotifyTarget,
}

/// Request body for `POST /players/{player_id}/tracking/{ladder}/opponents`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OpponentRequest {
    /// Ally code of the opponent to watch.
    pub ally_code: String,
}

/// Response body for a forced refresh.
#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    /// Player whose record was refreshed.
    pub player_id: String,
    /// Ladder that was refreshed.
    pub ladder: LadderType,
    /// `false` if tracking is disabled; `rows` is then empty.
    pub enabled: bool,
    /// Current standings, best rank first.
    pub rows: Vec<RankRow>,
}

/// Response body for `GET /ranks/{ally_code}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerRanksResponse {
    /// Normalized ally code.
    pub ally_code: String,
    /// In-game name.
    pub display_name: String,
    /// Current squad arena rank.
    pub squad_rank: u32,
    /// Current fleet arena rank.
    pub fleet_rank: u32,
    /// Player's UTC offset in minutes.
    pub utc_offset_minutes: i32,
    /// Next squad arena payout.
    pub squad_payout_at: DateTime<Utc>,
    /// Next fleet arena payout.
    pub fleet_payout_at: DateTime<Utc>,
}

impl PlayerRanksResponse {
    /// Builds the response, computing both payout instants at `now`.
    #[must_use]
    pub fn new(ally_code: String, ranks: PlayerRanks, now: DateTime<Utc>) -> Self {
        let squad = crate::domain::payout_window(ranks.utc_offset_minutes, LadderType::SquadArena, now);
        let fleet = crate::domain::payout_window(ranks.utc_offset_minutes, LadderType::FleetArena, now);
        Self {
            ally_code,
            display_name: ranks.display_name,
            squad_rank: ranks.squad_rank,
            fleet_rank: ranks.fleet_rank,
            utc_offset_minutes: ranks.utc_offset_minutes,
            squad_payout_at: squad.at,
            fleet_payout_at: fleet.at,
        }
    }
}
