//! Engine error types with HTTP status code mapping.
//!
//! [`HeraldError`] is the central error type for the engine. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! Inside the polling loops the same type is logged and swallowed per
//! entity; it only reaches a caller through the exposed API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::LadderType;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "unknown timezone: Mars/Olympus_Mons",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Engine error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                |
/// |-----------|-----------------|----------------------------|
/// | 1000–1999 | Configuration   | 400 Bad Request            |
/// | 2000–2999 | Not Found       | 404 Not Found              |
/// | 3000–3999 | Server          | 500 Internal Server Error  |
/// | 5000–5999 | Collaborators   | 502 Bad Gateway            |
#[derive(Debug, thiserror::Error)]
pub enum HeraldError {
    /// Timezone identifier is not a known IANA zone.
    #[error("unknown timezone: {0}")]
    InvalidTimezone(String),

    /// Hour is outside the range allowed by its time format.
    #[error("hour {hour} is out of range for format {format}")]
    InvalidHour {
        /// Rejected hour value.
        hour: u8,
        /// Time format the hour was given in.
        format: String,
    },

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No live trigger is registered under the given id.
    #[error("no reset registered for {0}")]
    TriggerNotFound(String),

    /// No tracking record exists for the player and ladder.
    #[error("player {player_id} is not tracked on the {ladder} ladder")]
    TrackingNotFound {
        /// Player whose record was requested.
        player_id: String,
        /// Ladder that was requested.
        ladder: LadderType,
    },

    /// No raid launch is configured for the guild.
    #[error("no raid launch configured for {0}")]
    RaidNotFound(String),

    /// The data source has no player under the given external id.
    #[error("ally code not found: {0}")]
    PlayerNotFound(String),

    /// The ladder-rank data source could not be reached or answered badly.
    #[error("ladder source error: {0}")]
    SourceUnavailable(String),

    /// The notification sink rejected or failed a delivery.
    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HeraldError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidTimezone(_) => 1001,
            Self::InvalidHour { .. } => 1002,
            Self::InvalidRequest(_) => 1003,
            Self::TriggerNotFound(_) => 2001,
            Self::TrackingNotFound { .. } => 2002,
            Self::PlayerNotFound(_) => 2003,
            Self::RaidNotFound(_) => 2004,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::SourceUnavailable(_) => 5001,
            Self::DeliveryFailed(_) => 5002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidTimezone(_) | Self::InvalidHour { .. } | Self::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::TriggerNotFound(_)
            | Self::TrackingNotFound { .. }
            | Self::PlayerNotFound(_)
            | Self::RaidNotFound(_) => StatusCode::NOT_FOUND,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SourceUnavailable(_) | Self::DeliveryFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Returns `true` for failures of an external collaborator that are
    /// expected to clear up on a later tick.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable(_) | Self::DeliveryFailed(_) | Self::PersistenceError(_)
        )
    }
}

impl From<reqwest::Error> for HeraldError {
    fn from(err: reqwest::Error) -> Self {
        Self::SourceUnavailable(err.to_string())
    }
}

impl From<sqlx::Error> for HeraldError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl IntoResponse for HeraldError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
