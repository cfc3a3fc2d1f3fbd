//! HTTP ladder source backed by a comlink-style game data proxy.
//!
//! Issues `POST {base}/player` with
//! `{"payload": {"allyCode": "<id>"}, "enums": false}` and reads the
//! player's name, local UTC offset, and `pvpProfile` entries (tab 1 is the
//! squad arena, tab 2 the fleet arena).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::LadderRankSource;
use crate::domain::PlayerRanks;
use crate::error::HeraldError;

const SQUAD_TAB: u8 = 1;
const FLEET_TAB: u8 = 2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    name: String,
    #[serde(default)]
    local_time_zone_offset_minutes: i32,
    #[serde(default)]
    pvp_profile: Vec<PvpProfile>,
}

#[derive(Debug, Deserialize)]
struct PvpProfile {
    tab: u8,
    rank: u32,
}

impl PlayerResponse {
    fn rank_for_tab(&self, tab: u8) -> Option<u32> {
        self.pvp_profile.iter().find(|p| p.tab == tab).map(|p| p.rank)
    }

    fn into_ranks(self, external_id: &str) -> Result<PlayerRanks, HeraldError> {
        let (Some(squad_rank), Some(fleet_rank)) =
            (self.rank_for_tab(SQUAD_TAB), self.rank_for_tab(FLEET_TAB))
        else {
            return Err(HeraldError::SourceUnavailable(format!(
                "player {external_id} has no rank on both arenas"
            )));
        };
        Ok(PlayerRanks {
            squad_rank,
            fleet_rank,
            utc_offset_minutes: self.local_time_zone_offset_minutes,
            display_name: self.name,
        })
    }
}

/// Strips the dashes users commonly type into ally codes.
#[must_use]
pub fn normalize_ally_code(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// [`LadderRankSource`] over HTTP.
#[derive(Debug, Clone)]
pub struct ComlinkSource {
    client: reqwest::Client,
    player_url: String,
}

impl ComlinkSource {
    /// Creates a source for the proxy at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::SourceUnavailable`] if the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, HeraldError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            player_url: format!("{}/player", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl LadderRankSource for ComlinkSource {
    async fn fetch_ranks(&self, external_id: &str) -> Result<Option<PlayerRanks>, HeraldError> {
        let ally_code = normalize_ally_code(external_id);
        let body = serde_json::json!({
            "payload": { "allyCode": ally_code },
            "enums": false,
        });

        let response = self.client.post(&self.player_url).json(&body).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => {
                return Err(HeraldError::SourceUnavailable(format!(
                    "player lookup for {ally_code} returned HTTP {}",
                    status.as_u16()
                )));
            }
            _ => {}
        }

        let player: PlayerResponse = response.json().await?;
        tracing::debug!(%ally_code, name = %player.name, "fetched player ranks");
        player.into_ranks(&ally_code).map(Some)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn parse(json: &str) -> PlayerResponse {
        let Ok(player) = serde_json::from_str(json) else {
            panic!("fixture should parse");
        };
        player
    }

    #[test]
    fn reads_both_arena_tabs() {
        let player = parse(
            r#"{
                "name": "Rey",
                "allyCode": "123456789",
                "localTimeZoneOffsetMinutes": -300,
                "pvpProfile": [
                    {"tab": 2, "rank": 7, "seasonStatus": []},
                    {"tab": 1, "rank": 42}
                ]
            }"#,
        );
        let Ok(ranks) = player.into_ranks("123456789") else {
            panic!("ranks expected");
        };
        assert_eq!(ranks.squad_rank, 42);
        assert_eq!(ranks.fleet_rank, 7);
        assert_eq!(ranks.utc_offset_minutes, -300);
        assert_eq!(ranks.display_name, "Rey");
    }

    #[test]
    fn missing_tab_is_an_error() {
        let player = parse(r#"{"name": "Finn", "pvpProfile": [{"tab": 1, "rank": 3}]}"#);
        assert!(matches!(
            player.into_ranks("1"),
            Err(HeraldError::SourceUnavailable(_))
        ));
    }

    #[test]
    fn ally_codes_lose_their_dashes() {
        assert_eq!(normalize_ally_code("123-456-789"), "123456789");
        assert_eq!(normalize_ally_code(" 987654321 "), "987654321");
    }

    #[test]
    fn player_url_is_joined_once() {
        let Ok(source) = ComlinkSource::new("http://localhost:5678/", Duration::from_secs(5)) else {
            panic!("client should build");
        };
        assert_eq!(source.player_url, "http://localhost:5678/player");
    }
}
