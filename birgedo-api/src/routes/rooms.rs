/// Room endpoints
///
/// # Endpoints
///
/// - `POST /v1/room` - Create a room; the creator becomes its first member
/// - `GET /v1/room/:id` - Room detail with tasks and members' progress
/// - `PATCH /v1/room/:id` - Rename a room
/// - `GET /v1/myrooms` - Rooms the caller belongs to
///
/// The `:id` routes run behind the room access gate, which loads the room
/// and passes it on as an extension.

use std::collections::BTreeMap;

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    Extension, Json,
};
use birgedo_shared::auth::identity::CurrentUser;
use birgedo_shared::models::assignment::{RoomAssignment, TaskAssignment};
use birgedo_shared::models::membership::RoomMembership;
use birgedo_shared::models::room::Room;
use birgedo_shared::models::task::Task;
use birgedo_shared::models::user::UserSummary;
use birgedo_shared::validation::{validate_room_title, Validator};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::routes::AppJson;

/// Create or rename request
#[derive(Debug, Deserialize)]
pub struct RoomRequest {
    #[serde(default)]
    pub title: String,
}

/// One task in a member's progress list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberTask {
    #[serde(rename = "taskID")]
    pub task_id: i64,

    pub title: String,

    pub done: bool,
}

/// A member with their own state for each task assigned to them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberProgress {
    #[serde(rename = "userID")]
    pub user_id: i64,

    #[serde(rename = "userName")]
    pub user_name: String,

    pub tasks: Vec<MemberTask>,
}

/// Groups a room's assignment rows by member
///
/// Members without any assignment are included with an empty task list;
/// members come out ordered by id, tasks in row order.
pub fn group_by_member(members: &[UserSummary], rows: Vec<RoomAssignment>) -> Vec<MemberProgress> {
    let mut progress: BTreeMap<i64, MemberProgress> = members
        .iter()
        .map(|member| {
            (
                member.id,
                MemberProgress {
                    user_id: member.id,
                    user_name: member.name.clone(),
                    tasks: Vec::new(),
                },
            )
        })
        .collect();

    for row in rows {
        progress
            .entry(row.user_id)
            .or_insert_with(|| MemberProgress {
                user_id: row.user_id,
                user_name: row.user_name.clone(),
                tasks: Vec::new(),
            })
            .tasks
            .push(MemberTask {
                task_id: row.task_id,
                title: row.task_title,
                done: row.done,
            });
    }

    progress.into_values().collect()
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    let mut v = Validator::new();
    validate_room_title(&mut v, title);
    if v.is_valid() {
        Ok(())
    } else {
        Err(ApiError::ValidationFailed(v.into_errors()))
    }
}

/// Create a room
///
/// # Response
///
/// `201 Created` with `{"room": {...}}` and a `Location` header
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Title missing or longer than 100 bytes
pub async fn create_room(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(req): AppJson<RoomRequest>,
) -> ApiResult<(StatusCode, [(header::HeaderName, HeaderValue); 1], Json<Value>)> {
    validate_title(&req.title)?;

    let room = Room::create_with_owner(&state.db, &req.title, user.id).await?;

    tracing::info!(room_id = room.id, user_id = user.id, "Room created");

    let location = HeaderValue::from_str(&format!("/v1/room/{}", room.id))
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json!({ "room": room })),
    ))
}

/// Room detail
///
/// # Response
///
/// ```json
/// {
///   "room": { "id": 1, "title": "Flat", "created_at": "..." },
///   "tasks": [ { "id": 3, "title": "Dishes", "roomID": 1, ... } ],
///   "members": [ { "id": 2, "name": "Alice", "email": "..." } ],
///   "userTasks": [ { "userID": 2, "userName": "Alice", "tasks": [ { "taskID": 3, "title": "Dishes", "done": false } ] } ]
/// }
/// ```
pub async fn show_room(
    State(state): State<AppState>,
    Extension(room): Extension<Room>,
) -> ApiResult<Json<Value>> {
    let tasks = Task::list_by_room(&state.db, room.id).await?;
    let members = RoomMembership::members_of(&state.db, room.id).await?;
    let rows = TaskAssignment::list_by_room(&state.db, room.id).await?;

    let user_tasks = group_by_member(&members, rows);

    Ok(Json(json!({
        "room": room,
        "tasks": tasks,
        "members": members,
        "userTasks": user_tasks,
    })))
}

/// Rename a room
///
/// # Errors
///
/// - `409 Conflict`: The room was deleted meanwhile
/// - `422 Unprocessable Entity`: Invalid title
pub async fn update_room(
    State(state): State<AppState>,
    Extension(mut room): Extension<Room>,
    AppJson(req): AppJson<RoomRequest>,
) -> ApiResult<Json<Value>> {
    validate_title(&req.title)?;

    room.title = req.title;
    room.update(&state.db).await?;

    tracing::info!(room_id = room.id, "Room renamed");

    Ok(Json(json!({ "room": room })))
}

/// Rooms the caller belongs to; an empty list when none
pub async fn list_my_rooms(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Value>> {
    let rooms = Room::list_by_user(&state.db, user.id).await?;

    Ok(Json(json!({ "rooms": rooms })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: i64, name: &str) -> UserSummary {
        UserSummary {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    fn row(user_id: i64, user_name: &str, task_id: i64, done: bool) -> RoomAssignment {
        RoomAssignment {
            user_id,
            user_name: user_name.to_string(),
            task_id,
            task_title: format!("task {task_id}"),
            done,
        }
    }

    #[test]
    fn test_group_by_member() {
        let members = vec![member(2, "Bob"), member(1, "Alice"), member(3, "Carol")];
        let rows = vec![
            row(1, "Alice", 10, true),
            row(2, "Bob", 10, false),
            row(1, "Alice", 11, false),
        ];

        let grouped = group_by_member(&members, rows);

        assert_eq!(grouped.iter().map(|m| m.user_id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(
            grouped[0].tasks,
            vec![
                MemberTask { task_id: 10, title: "task 10".to_string(), done: true },
                MemberTask { task_id: 11, title: "task 11".to_string(), done: false },
            ]
        );
        assert_eq!(grouped[1].tasks.len(), 1);
        // Joined after the tasks were created
        assert!(grouped[2].tasks.is_empty());
    }

    #[test]
    fn test_title_validation() {
        assert!(validate_title("Flat chores").is_ok());
        assert!(matches!(validate_title(""), Err(ApiError::ValidationFailed(_))));
        assert!(validate_title(&"x".repeat(101)).is_err());
    }
}
