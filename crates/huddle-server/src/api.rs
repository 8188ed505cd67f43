//! API handlers for the Huddle server.

use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use huddle_bot::{BotError, CallSnapshot};
use huddle_types::Notification;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Response body for an accepted notification.
#[derive(Debug, Serialize)]
pub struct NotificationAccepted {
    /// Whether the notification produced a transition.
    pub routed: bool,
    /// Name of the produced transition, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<&'static str>,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl From<BotError> for ApiError {
    fn from(e: BotError) -> Self {
        match e {
            BotError::Stopped => ApiError::ServiceUnavailable(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Handler for `POST /api/notifications`.
///
/// Routes a platform notification into the call state machine. Notifications
/// the bot does not act on are still accepted.
pub async fn notification_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<Notification>, JsonRejection>,
) -> Result<(StatusCode, Json<NotificationAccepted>), ApiError> {
    let Json(notification) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let transition = state.bot.notify(&notification)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(NotificationAccepted {
            routed: transition.is_some(),
            transition: transition.as_ref().map(|t| t.name()),
        }),
    ))
}

/// Handler for `GET /api/calls`.
pub async fn list_calls_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<CallSnapshot>>, ApiError> {
    Ok(Json(state.bot.snapshot().await?))
}
