/// Room membership endpoints
///
/// # Endpoints
///
/// - `POST /v1/addUser` - Add a user to a room
/// - `POST /v1/removeUser` - Remove a user from a room
///
/// Both take `{"userID": 2, "roomID": 1}` and require the caller to be a
/// member of the room.

use axum::{extract::State, http::StatusCode, Json};
use birgedo_shared::auth::identity::CurrentUser;
use birgedo_shared::models::membership::RoomMembership;
use birgedo_shared::models::user::User;
use birgedo_shared::models::DataError;
use birgedo_shared::validation::{validate_id, Validator, DOES_NOT_EXIST};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::routes::{require_body_room_access, AppJson};

/// Membership change request
#[derive(Debug, Deserialize)]
pub struct MembershipRequest {
    #[serde(default, rename = "userID")]
    pub user_id: i64,

    #[serde(default, rename = "roomID")]
    pub room_id: i64,
}

impl MembershipRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        validate_id(&mut v, "userID", self.user_id);
        validate_id(&mut v, "roomID", self.room_id);
        if v.is_valid() {
            Ok(())
        } else {
            Err(ApiError::ValidationFailed(v.into_errors()))
        }
    }
}

fn outcome(status: &str, req: &MembershipRequest) -> Json<Value> {
    Json(json!({
        "membership": { "status": status, "userID": req.user_id, "roomID": req.room_id }
    }))
}

/// Add a user to a room
///
/// Adding an existing member is not an error.
///
/// # Response
///
/// - `201 Created` with status `"added"`
/// - `200 OK` with status `"already_exists"` if the user was already a member
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a member of the room
/// - `422 Unprocessable Entity`: Invalid ids, unknown room or unknown user
pub async fn add_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    AppJson(req): AppJson<MembershipRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    req.validate()?;
    require_body_room_access(&state.db, req.room_id, caller.id).await?;

    match User::get(&state.db, req.user_id).await {
        Ok(_) => {}
        Err(DataError::NotFound) => return Err(ApiError::field("userID", DOES_NOT_EXIST)),
        Err(e) => return Err(e.into()),
    }

    match RoomMembership::insert(&state.db, req.user_id, req.room_id).await {
        Ok(_) => {
            tracing::info!(
                user_id = req.user_id,
                room_id = req.room_id,
                added_by = caller.id,
                "Member added"
            );
            Ok((StatusCode::CREATED, outcome("added", &req)))
        }
        Err(DataError::DuplicateKey) => {
            tracing::debug!(user_id = req.user_id, room_id = req.room_id, "Already a member");
            Ok((StatusCode::OK, outcome("already_exists", &req)))
        }
        // User deleted between the lookup and the insert
        Err(DataError::NotFound) => Err(ApiError::field("userID", DOES_NOT_EXIST)),
        Err(e) => Err(e.into()),
    }
}

/// Remove a user from a room
///
/// The user's assignments for the room's tasks go with the membership. A
/// member may remove themselves.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a member of the room
/// - `404 Not Found`: The user is not a member of the room
/// - `422 Unprocessable Entity`: Invalid ids or unknown room
pub async fn remove_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    AppJson(req): AppJson<MembershipRequest>,
) -> ApiResult<Json<Value>> {
    req.validate()?;
    require_body_room_access(&state.db, req.room_id, caller.id).await?;

    if !RoomMembership::remove(&state.db, req.user_id, req.room_id).await? {
        return Err(ApiError::NotFound);
    }

    tracing::info!(
        user_id = req.user_id,
        room_id = req.room_id,
        removed_by = caller.id,
        "Member removed"
    );

    Ok(outcome("removed", &req))
}
