//! Reset trigger and raid launch handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::api::dto::{NextResetResponse, RaidTicketsRequest, TriggerResponse};
use crate::app_state::AppState;
use crate::domain::RaidLaunch;
use crate::error::{ErrorResponse, HeraldError};
use crate::service::{RaidConfiguration, ResetRegistration};

/// `PUT /guilds/{guild_id}/reset` — Register or replace a guild reset.
///
/// # Errors
///
/// Returns [`HeraldError`] on an invalid timezone, hour, or target.
#[utoipa::path(
    put,
    path = "/api/v1/guilds/{guild_id}/reset",
    tag = "Resets",
    summary = "Register a guild reset",
    description = "Registers the guild's daily reset at half past `hour` in `timezone`. The zone's DST status is captured now and used to correct later firings.",
    params(("guild_id" = String, Path, description = "Guild id")),
    request_body = ResetRegistration,
    responses(
        (status = 200, description = "Reset registered", body = TriggerResponse),
        (status = 400, description = "Invalid timezone or hour", body = ErrorResponse),
    )
)]
pub async fn register_guild_reset(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
    Json(req): Json<ResetRegistration>,
) -> Result<impl IntoResponse, HeraldError> {
    let now = state.clock.now();
    let record = state
        .schedule
        .register_guild_reset(&guild_id, req, now)
        .await?;
    let next = record.next_occurrence(false, now)?;
    Ok(Json(TriggerResponse::new(guild_id, &record, next)))
}

/// `GET /guilds/{guild_id}/reset/next` — Next guild reset.
///
/// # Errors
///
/// Returns [`HeraldError::TriggerNotFound`] if the guild has no reset.
#[utoipa::path(
    get,
    path = "/api/v1/guilds/{guild_id}/reset/next",
    tag = "Resets",
    summary = "Next guild reset",
    params(("guild_id" = String, Path, description = "Guild id")),
    responses(
        (status = 200, description = "Next reset instant", body = NextResetResponse),
        (status = 404, description = "No reset registered", body = ErrorResponse),
    )
)]
pub async fn next_guild_reset(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<impl IntoResponse, HeraldError> {
    let now = state.clock.now();
    let next_reset = state.schedule.next_guild_reset(&guild_id, now).await?;
    Ok(Json(NextResetResponse {
        id: guild_id,
        next_reset,
        seconds_until: (next_reset - now).num_seconds(),
    }))
}

/// `DELETE /guilds/{guild_id}/reset` — Clear a guild reset.
///
/// # Errors
///
/// Returns [`HeraldError::TriggerNotFound`] if the guild has no reset.
#[utoipa::path(
    delete,
    path = "/api/v1/guilds/{guild_id}/reset",
    tag = "Resets",
    summary = "Clear a guild reset",
    params(("guild_id" = String, Path, description = "Guild id")),
    responses(
        (status = 204, description = "Reset cleared"),
        (status = 404, description = "No reset registered", body = ErrorResponse),
    )
)]
pub async fn unregister_guild_reset(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<impl IntoResponse, HeraldError> {
    if state.schedule.unregister_guild_reset(&guild_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(HeraldError::TriggerNotFound(guild_id))
    }
}

/// `PUT /users/{user_id}/reset` — Register or replace a personal reset.
///
/// # Errors
///
/// Returns [`HeraldError`] on an invalid timezone, hour, or target.
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}/reset",
    tag = "Resets",
    summary = "Register a personal reset",
    description = "Registers a member's daily reset on the hour. `linked_guild` selects the guild whose next reset the message mentions.",
    params(("user_id" = String, Path, description = "User id")),
    request_body = ResetRegistration,
    responses(
        (status = 200, description = "Reset registered", body = TriggerResponse),
        (status = 400, description = "Invalid timezone or hour", body = ErrorResponse),
    )
)]
pub async fn register_personal_reset(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<ResetRegistration>,
) -> Result<impl IntoResponse, HeraldError> {
    let now = state.clock.now();
    let record = state
        .schedule
        .register_personal_reset(&user_id, req, now)
        .await?;
    let next = record.next_occurrence(false, now)?;
    Ok(Json(TriggerResponse::new(user_id, &record, next)))
}

/// `GET /users/{user_id}/reset/next` — Next personal reset.
///
/// # Errors
///
/// Returns [`HeraldError::TriggerNotFound`] if the user has no reset.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/reset/next",
    tag = "Resets",
    summary = "Next personal reset",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Next reset instant", body = NextResetResponse),
        (status = 404, description = "No reset registered", body = ErrorResponse),
    )
)]
pub async fn next_personal_reset(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, HeraldError> {
    let now = state.clock.now();
    let next_reset = state.schedule.next_personal_reset(&user_id, now).await?;
    Ok(Json(NextResetResponse {
        id: user_id,
        next_reset,
        seconds_until: (next_reset - now).num_seconds(),
    }))
}

/// `DELETE /users/{user_id}/reset` — Clear a personal reset.
///
/// # Errors
///
/// Returns [`HeraldError::TriggerNotFound`] if the user has no reset.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}/reset",
    tag = "Resets",
    summary = "Clear a personal reset",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 204, description = "Reset cleared"),
        (status = 404, description = "No reset registered", body = ErrorResponse),
    )
)]
pub async fn unregister_personal_reset(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, HeraldError> {
    if state.schedule.unregister_personal_reset(&user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(HeraldError::TriggerNotFound(user_id))
    }
}

/// `PUT /guilds/{guild_id}/raid` — Configure the guild raid launch.
///
/// # Errors
///
/// Returns [`HeraldError`] on invalid configuration.
#[utoipa::path(
    put,
    path = "/api/v1/guilds/{guild_id}/raid",
    tag = "Raids",
    summary = "Configure the raid launch",
    description = "Sets the daily launch offset and ticket threshold. The accumulated ticket count is kept.",
    params(("guild_id" = String, Path, description = "Guild id")),
    request_body = RaidConfiguration,
    responses(
        (status = 200, description = "Raid configured", body = RaidLaunch),
        (status = 400, description = "Invalid configuration", body = ErrorResponse),
    )
)]
pub async fn configure_raid(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
    Json(req): Json<RaidConfiguration>,
) -> Result<impl IntoResponse, HeraldError> {
    let raid = state.schedule.configure_raid(&guild_id, req).await?;
    Ok(Json(raid))
}

/// `GET /guilds/{guild_id}/raid` — Current raid launch configuration.
///
/// # Errors
///
/// Returns [`HeraldError::RaidNotFound`] if none is configured.
#[utoipa::path(
    get,
    path = "/api/v1/guilds/{guild_id}/raid",
    tag = "Raids",
    summary = "Get the raid launch",
    params(("guild_id" = String, Path, description = "Guild id")),
    responses(
        (status = 200, description = "Raid configuration", body = RaidLaunch),
        (status = 404, description = "No raid configured", body = ErrorResponse),
    )
)]
pub async fn get_raid(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<impl IntoResponse, HeraldError> {
    let raid = state
        .schedule
        .raid(&guild_id)
        .await
        .ok_or(HeraldError::RaidNotFound(guild_id))?;
    Ok(Json(raid))
}

/// `PUT /guilds/{guild_id}/raid/tickets` — Update the ticket counter.
///
/// # Errors
///
/// Returns [`HeraldError::RaidNotFound`] if none is configured.
#[utoipa::path(
    put,
    path = "/api/v1/guilds/{guild_id}/raid/tickets",
    tag = "Raids",
    summary = "Set raid tickets",
    params(("guild_id" = String, Path, description = "Guild id")),
    request_body = RaidTicketsRequest,
    responses(
        (status = 200, description = "Tickets updated", body = RaidLaunch),
        (status = 404, description = "No raid configured", body = ErrorResponse),
    )
)]
pub async fn set_raid_tickets(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
    Json(req): Json<RaidTicketsRequest>,
) -> Result<impl IntoResponse, HeraldError> {
    let raid = state
        .schedule
        .set_raid_tickets(&guild_id, req.tickets)
        .await?;
    Ok(Json(raid))
}

/// Reset and raid routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/guilds/{guild_id}/reset",
            put(register_guild_reset).delete(unregister_guild_reset),
        )
        .route("/guilds/{guild_id}/reset/next", get(next_guild_reset))
        .route(
            "/users/{user_id}/reset",
            put(register_personal_reset).delete(unregister_personal_reset),
        )
        .route("/users/{user_id}/reset/next", get(next_personal_reset))
        .route("/guilds/{guild_id}/raid", put(configure_raid).get(get_raid))
        .route("/guilds/{guild_id}/raid/tickets", put(set_raid_tickets))
}
