//! OpenAPI document aggregating every annotated handler.

use utoipa::OpenApi;

use super::dto::{
    EnableTrackingRequest, NextResetResponse, OpponentRequest, PlayerRanksResponse,
    RaidTicketsRequest, RefreshResponse, TriggerResponse,
};
use super::handlers::{system, tracking, triggers};
use crate::domain::notification::{PayoutGroup, PayoutRow};
use crate::domain::rank_state::OpponentRank;
use crate::domain::{
    LadderType, NotifyTarget, RaidLaunch, RankGlyph, RankRow, RankState, TimeFormat, TriggerKind,
};
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::{RaidConfiguration, ResetRegistration};

/// OpenAPI description of the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "reset-herald", description = "Daily reset scheduling and arena rank tracking"),
    paths(
        system::health_handler,
        triggers::register_guild_reset,
        triggers::next_guild_reset,
        triggers::unregister_guild_reset,
        triggers::register_personal_reset,
        triggers::next_personal_reset,
        triggers::unregister_personal_reset,
        triggers::configure_raid,
        triggers::get_raid,
        triggers::set_raid_tickets,
        tracking::enable_tracking,
        tracking::get_tracking,
        tracking::disable_tracking,
        tracking::add_opponent,
        tracking::remove_opponent,
        tracking::refresh,
        tracking::lookup_ranks,
    ),
    components(schemas(
        system::HealthResponse,
        ErrorResponse,
        ErrorBody,
        ResetRegistration,
        RaidConfiguration,
        TriggerResponse,
        NextResetResponse,
        RaidTicketsRequest,
        EnableTrackingRequest,
        OpponentRequest,
        RefreshResponse,
        PlayerRanksResponse,
        RaidLaunch,
        RankState,
        OpponentRank,
        RankRow,
        RankGlyph,
        PayoutRow,
        PayoutGroup,
        LadderType,
        NotifyTarget,
        TimeFormat,
        TriggerKind,
    )),
    tags(
        (name = "Resets", description = "Guild and personal daily resets"),
        (name = "Raids", description = "Guild raid launch"),
        (name = "Tracking", description = "Arena rank tracking"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/health"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/guilds/{guild_id}/reset"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/ranks/{ally_code}"));
    }
}
