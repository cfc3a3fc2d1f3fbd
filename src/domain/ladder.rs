//! Ladder (arena) types and the rank snapshot returned by the data source.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::HeraldError;

/// One of the two independently ranked arena queues.
///
/// Rank 1 is the best position on either ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum LadderType {
    /// Squad arena (ground combat).
    #[serde(rename = "squad")]
    SquadArena,
    /// Fleet arena (ship combat).
    #[serde(rename = "fleet")]
    FleetArena,
}

impl LadderType {
    /// Both ladders, in the order they are polled.
    pub const ALL: [Self; 2] = [Self::SquadArena, Self::FleetArena];

    /// Fixed shift of the daily payout relative to the player's local
    /// midnight expressed in UTC.
    #[must_use]
    pub fn payout_shift(self) -> Duration {
        match self {
            Self::SquadArena => Duration::hours(-6),
            Self::FleetArena => Duration::hours(-5),
        }
    }

    /// Short lowercase name used in URLs and storage keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SquadArena => "squad",
            Self::FleetArena => "fleet",
        }
    }
}

impl fmt::Display for LadderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LadderType {
    type Err = HeraldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "squad" | "squad_arena" => Ok(Self::SquadArena),
            "fleet" | "fleet_arena" => Ok(Self::FleetArena),
            other => Err(HeraldError::InvalidRequest(format!(
                "unknown ladder type: {other}"
            ))),
        }
    }
}

/// Current standing of one player as reported by the ladder-rank source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRanks {
    /// Current squad arena rank.
    pub squad_rank: u32,
    /// Current fleet arena rank.
    pub fleet_rank: u32,
    /// The player's UTC offset in minutes (e.g. `-300` for UTC-5).
    pub utc_offset_minutes: i32,
    /// In-game display name.
    pub display_name: String,
}

impl PlayerRanks {
    /// Returns the rank on the given ladder.
    #[must_use]
    pub const fn rank_on(&self, ladder: LadderType) -> u32 {
        match ladder {
            LadderType::SquadArena => self.squad_rank,
            LadderType::FleetArena => self.fleet_rank,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payout_shifts_differ_by_ladder() {
        assert_eq!(LadderType::SquadArena.payout_shift(), Duration::hours(-6));
        assert_eq!(LadderType::FleetArena.payout_shift(), Duration::hours(-5));
    }

    #[test]
    fn parses_short_and_long_names() {
        assert_eq!("squad".parse::<LadderType>().ok(), Some(LadderType::SquadArena));
        assert_eq!("Fleet_Arena".parse::<LadderType>().ok(), Some(LadderType::FleetArena));
        assert!("galactic_war".parse::<LadderType>().is_err());
    }

    #[test]
    fn serde_uses_short_names() {
        let json = serde_json::to_string(&LadderType::FleetArena).unwrap_or_default();
        assert_eq!(json, "\"fleet\"");
    }

    #[test]
    fn rank_on_selects_ladder() {
        let ranks = PlayerRanks {
            squad_rank: 12,
            fleet_rank: 3,
            utc_offset_minutes: 60,
            display_name: "Rey".to_string(),
        };
        assert_eq!(ranks.rank_on(LadderType::SquadArena), 12);
        assert_eq!(ranks.rank_on(LadderType::FleetArena), 3);
    }
}
