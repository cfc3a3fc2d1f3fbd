//! Rank tracking handlers: enable, disable, opponents, refresh, lookup.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};

use crate::api::dto::{EnableTrackingRequest, OpponentRequest, PlayerRanksResponse, RefreshResponse};
use crate::app_state::AppState;
use crate::domain::{LadderType, RankState};
use crate::error::{ErrorResponse, HeraldError};
use crate::source::comlink::normalize_ally_code;

fn not_tracked(player_id: String, ladder: LadderType) -> HeraldError {
    HeraldError::TrackingNotFound { player_id, ladder }
}

/// `PUT /players/{player_id}/tracking/{ladder}` — Enable rank tracking.
///
/// # Errors
///
/// Returns [`HeraldError::InvalidRequest`] on an unknown ladder or empty
/// input.
#[utoipa::path(
    put,
    path = "/api/v1/players/{player_id}/tracking/{ladder}",
    tag = "Tracking",
    summary = "Enable rank tracking",
    description = "Starts polling the player's rank on the ladder. Re-enabling clears rank history and keeps opponents.",
    params(
        ("player_id" = String, Path, description = "Player id"),
        ("ladder" = String, Path, description = "`squad` or `fleet`"),
    ),
    request_body = EnableTrackingRequest,
    responses(
        (status = 200, description = "Tracking enabled", body = RankState),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    )
)]
pub async fn enable_tracking(
    State(state): State<AppState>,
    Path((player_id, ladder)): Path<(String, String)>,
    Json(req): Json<EnableTrackingRequest>,
) -> Result<impl IntoResponse, HeraldError> {
    let ladder: LadderType = ladder.parse()?;
    let record = state
        .tracker
        .enable_tracking(
            &player_id,
            ladder,
            &normalize_ally_code(&req.ally_code),
            req.notify_target,
            state.clock.now(),
        )
        .await?;
    Ok(Json(record))
}

/// `GET /players/{player_id}/tracking/{ladder}` — Tracking record.
///
/// # Errors
///
/// Returns [`HeraldError::TrackingNotFound`] if no record exists.
#[utoipa::path(
    get,
    path = "/api/v1/players/{player_id}/tracking/{ladder}",
    tag = "Tracking",
    summary = "Get a tracking record",
    params(
        ("player_id" = String, Path, description = "Player id"),
        ("ladder" = String, Path, description = "`squad` or `fleet`"),
    ),
    responses(
        (status = 200, description = "Tracking record", body = RankState),
        (status = 404, description = "Not tracked", body = ErrorResponse),
    )
)]
pub async fn get_tracking(
    State(state): State<AppState>,
    Path((player_id, ladder)): Path<(String, String)>,
) -> Result<impl IntoResponse, HeraldError> {
    let ladder: LadderType = ladder.parse()?;
    let record = state
        .tracker
        .tracking(&player_id, ladder)
        .await
        .ok_or_else(|| not_tracked(player_id, ladder))?;
    Ok(Json(record))
}

/// `DELETE /players/{player_id}/tracking/{ladder}` — Disable tracking.
///
/// # Errors
///
/// Returns [`HeraldError::TrackingNotFound`] if no record exists.
#[utoipa::path(
    delete,
    path = "/api/v1/players/{player_id}/tracking/{ladder}",
    tag = "Tracking",
    summary = "Disable rank tracking",
    description = "Stops polling. Rank history and opponents are kept for a later re-enable.",
    params(
        ("player_id" = String, Path, description = "Player id"),
        ("ladder" = String, Path, description = "`squad` or `fleet`"),
    ),
    responses(
        (status = 204, description = "Tracking disabled"),
        (status = 404, description = "Not tracked", body = ErrorResponse),
    )
)]
pub async fn disable_tracking(
    State(state): State<AppState>,
    Path((player_id, ladder)): Path<(String, String)>,
) -> Result<impl IntoResponse, HeraldError> {
    let ladder: LadderType = ladder.parse()?;
    if state
        .tracker
        .disable_tracking(&player_id, ladder, state.clock.now())
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_tracked(player_id, ladder))
    }
}

/// `POST /players/{player_id}/tracking/{ladder}/opponents` — Watch an opponent.
///
/// # Errors
///
/// Returns [`HeraldError::TrackingNotFound`] if no record exists.
#[utoipa::path(
    post,
    path = "/api/v1/players/{player_id}/tracking/{ladder}/opponents",
    tag = "Tracking",
    summary = "Add an opponent",
    params(
        ("player_id" = String, Path, description = "Player id"),
        ("ladder" = String, Path, description = "`squad` or `fleet`"),
    ),
    request_body = OpponentRequest,
    responses(
        (status = 200, description = "Opponent added", body = RankState),
        (status = 404, description = "Not tracked", body = ErrorResponse),
    )
)]
pub async fn add_opponent(
    State(state): State<AppState>,
    Path((player_id, ladder)): Path<(String, String)>,
    Json(req): Json<OpponentRequest>,
) -> Result<impl IntoResponse, HeraldError> {
    let ladder: LadderType = ladder.parse()?;
    let record = state
        .tracker
        .add_opponent(
            &player_id,
            ladder,
            &normalize_ally_code(&req.ally_code),
            state.clock.now(),
        )
        .await?;
    Ok(Json(record))
}

/// `DELETE /players/{player_id}/tracking/{ladder}/opponents/{ally_code}` —
/// Stop watching an opponent.
///
/// # Errors
///
/// Returns [`HeraldError::TrackingNotFound`] if the record or opponent does
/// not exist.
#[utoipa::path(
    delete,
    path = "/api/v1/players/{player_id}/tracking/{ladder}/opponents/{ally_code}",
    tag = "Tracking",
    summary = "Remove an opponent",
    params(
        ("player_id" = String, Path, description = "Player id"),
        ("ladder" = String, Path, description = "`squad` or `fleet`"),
        ("ally_code" = String, Path, description = "Opponent ally code"),
    ),
    responses(
        (status = 204, description = "Opponent removed"),
        (status = 404, description = "Not tracked", body = ErrorResponse),
    )
)]
pub async fn remove_opponent(
    State(state): State<AppState>,
    Path((player_id, ladder, ally_code)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, HeraldError> {
    let ladder: LadderType = ladder.parse()?;
    if state
        .tracker
        .remove_opponent(
            &player_id,
            ladder,
            &normalize_ally_code(&ally_code),
            state.clock.now(),
        )
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_tracked(player_id, ladder))
    }
}

/// `POST /players/{player_id}/tracking/{ladder}/refresh` — Forced refresh.
///
/// # Errors
///
/// Returns [`HeraldError::TrackingNotFound`] if no record exists.
#[utoipa::path(
    post,
    path = "/api/v1/players/{player_id}/tracking/{ladder}/refresh",
    tag = "Tracking",
    summary = "Force a refresh",
    description = "Fetches every identity of the record now and returns the full table, best rank first. Nothing is sent to the notification target.",
    params(
        ("player_id" = String, Path, description = "Player id"),
        ("ladder" = String, Path, description = "`squad` or `fleet`"),
    ),
    responses(
        (status = 200, description = "Current standings", body = RefreshResponse),
        (status = 404, description = "Not tracked", body = ErrorResponse),
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Path((player_id, ladder)): Path<(String, String)>,
) -> Result<impl IntoResponse, HeraldError> {
    let ladder: LadderType = ladder.parse()?;
    let rows = state
        .tracker
        .force_refresh(&player_id, ladder, state.clock.now())
        .await?;
    Ok(Json(RefreshResponse {
        player_id,
        ladder,
        enabled: rows.is_some(),
        rows: rows.unwrap_or_default(),
    }))
}

/// `GET /ranks/{ally_code}` — Live rank lookup.
///
/// # Errors
///
/// Returns [`HeraldError::PlayerNotFound`] or
/// [`HeraldError::SourceUnavailable`].
#[utoipa::path(
    get,
    path = "/api/v1/ranks/{ally_code}",
    tag = "Tracking",
    summary = "Look up a player's ranks",
    params(("ally_code" = String, Path, description = "Ally code, dashes allowed")),
    responses(
        (status = 200, description = "Current ranks and payout times", body = PlayerRanksResponse),
        (status = 404, description = "Unknown ally code", body = ErrorResponse),
        (status = 502, description = "Ladder source unavailable", body = ErrorResponse),
    )
)]
pub async fn lookup_ranks(
    State(state): State<AppState>,
    Path(ally_code): Path<String>,
) -> Result<impl IntoResponse, HeraldError> {
    let ally_code = normalize_ally_code(&ally_code);
    let ranks = state.tracker.lookup(&ally_code).await?;
    Ok(Json(PlayerRanksResponse::new(ally_code, ranks, state.clock.now())))
}

/// Tracking routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/players/{player_id}/tracking/{ladder}",
            put(enable_tracking).get(get_tracking).delete(disable_tracking),
        )
        .route(
            "/players/{player_id}/tracking/{ladder}/opponents",
            post(add_opponent),
        )
        .route(
            "/players/{player_id}/tracking/{ladder}/opponents/{ally_code}",
            delete(remove_opponent),
        )
        .route("/players/{player_id}/tracking/{ladder}/refresh", post(refresh))
        .route("/ranks/{ally_code}", get(lookup_ranks))
}
