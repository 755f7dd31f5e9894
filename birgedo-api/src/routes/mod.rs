/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: Registration, current identity, account updates
/// - `tokens`: Login and logout
/// - `rooms`: Rooms and the current user's room list
/// - `tasks`: Tasks, completion toggling and the current user's task list
/// - `memberships`: Adding and removing room members
///
/// Successful responses wrap their payload in a one-key envelope, e.g.
/// `{"room": {...}}`.

pub mod health;
pub mod memberships;
pub mod rooms;
pub mod tasks;
pub mod tokens;
pub mod users;

use axum::extract::FromRequest;
use birgedo_shared::auth::authorization::{self, AuthzError};
use birgedo_shared::models::room::Room;
use birgedo_shared::validation::DOES_NOT_EXIST;
use sqlx::PgPool;

use crate::error::ApiError;

/// JSON request body whose rejections become [`ApiError::BadRequest`]
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Parses an `:id` path segment
///
/// # Errors
///
/// `ApiError::NotFound` unless the segment is a positive integer
pub fn read_id_param(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::NotFound),
    }
}

/// Checks access to a room named in a request body
///
/// Unlike the path gate, an unknown room is a validation failure on
/// `roomID` rather than a 404.
pub async fn require_body_room_access(
    pool: &PgPool,
    room_id: i64,
    user_id: i64,
) -> Result<Room, ApiError> {
    match authorization::require_room_access(pool, room_id, user_id).await {
        Ok(room) => Ok(room),
        Err(AuthzError::RoomNotFound(_)) => Err(ApiError::field("roomID", DOES_NOT_EXIST)),
        Err(e) => Err(e.into()),
    }
}

/// Fallback for unknown paths
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
