/// Task endpoints
///
/// # Endpoints
///
/// - `POST /v1/task` - Create a task in a room, assigned to every current member
/// - `GET /v1/task/:id` - Toggle the caller's own completion of a task
/// - `POST /v1/removeTask` - Remove a task from a room
/// - `GET /v1/mytasks` - Tasks assigned to the caller, with their own state

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    Json,
};
use birgedo_shared::auth::authorization;
use birgedo_shared::auth::identity::CurrentUser;
use birgedo_shared::models::assignment::TaskAssignment;
use birgedo_shared::models::task::Task;
use birgedo_shared::validation::{validate_id, validate_task_title, Validator};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::routes::{read_id_param, require_body_room_access, AppJson};

/// Create task request
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,

    #[serde(default, rename = "roomID")]
    pub room_id: i64,
}

/// Remove task request
#[derive(Debug, Deserialize)]
pub struct RemoveTaskRequest {
    #[serde(default, rename = "taskID")]
    pub task_id: i64,

    #[serde(default, rename = "roomID")]
    pub room_id: i64,
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /v1/task
/// Content-Type: application/json
///
/// { "title": "Dishes", "roomID": 1 }
/// ```
///
/// # Response
///
/// `201 Created` with `{"task": {"task": {...}, "assigned": 2}}`, where
/// `assigned` is the number of members the task was assigned to. Members who
/// join later are not assigned existing tasks.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a member of the room
/// - `422 Unprocessable Entity`: Invalid title or unknown room
pub async fn create_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(req): AppJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, [(header::HeaderName, HeaderValue); 1], Json<Value>)> {
    let mut v = Validator::new();
    validate_task_title(&mut v, &req.title);
    validate_id(&mut v, "roomID", req.room_id);
    if !v.is_valid() {
        return Err(ApiError::ValidationFailed(v.into_errors()));
    }

    require_body_room_access(&state.db, req.room_id, user.id).await?;

    let (task, assigned) = Task::create_with_assignments(&state.db, &req.title, req.room_id).await?;

    tracing::info!(task_id = task.id, room_id = task.room_id, assigned, "Task created");

    let location = HeaderValue::from_str(&format!("/v1/room/{}", task.room_id))
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json!({ "task": { "task": task, "assigned": assigned } })),
    ))
}

/// Toggle the caller's completion of a task
///
/// # Response
///
/// `200 OK` with `{"task": {"userID": 2, "taskID": 3, "done": true}}`
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a member of the task's room, or a cookie
///   session sent no matching `X-CSRF-Token` header
/// - `404 Not Found`: No such task, or the task is not assigned to the caller
pub async fn toggle_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let task_id = read_id_param(&id)?;

    let task = Task::get_by_id(&state.db, task_id).await?;
    authorization::require_room_access(&state.db, task.room_id, user.id).await?;

    let assignment = TaskAssignment::toggle(&state.db, user.id, task.id).await?;

    tracing::debug!(task_id, user_id = user.id, done = assignment.done, "Task toggled");

    Ok(Json(json!({ "task": assignment })))
}

/// Remove a task from a room, together with its assignments
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a member of the room
/// - `404 Not Found`: The task does not belong to the room
/// - `422 Unprocessable Entity`: Invalid ids or unknown room
pub async fn remove_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(req): AppJson<RemoveTaskRequest>,
) -> ApiResult<Json<Value>> {
    let mut v = Validator::new();
    validate_id(&mut v, "taskID", req.task_id);
    validate_id(&mut v, "roomID", req.room_id);
    if !v.is_valid() {
        return Err(ApiError::ValidationFailed(v.into_errors()));
    }

    require_body_room_access(&state.db, req.room_id, user.id).await?;

    if !Task::remove_from_room(&state.db, req.task_id, req.room_id).await? {
        return Err(ApiError::NotFound);
    }

    tracing::info!(task_id = req.task_id, room_id = req.room_id, "Task removed");

    Ok(Json(json!({
        "task": { "status": "removed", "taskID": req.task_id, "roomID": req.room_id }
    })))
}

/// Tasks assigned to the caller; an empty list when none
pub async fn list_my_tasks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Value>> {
    let tasks = TaskAssignment::list_by_user(&state.db, user.id).await?;

    Ok(Json(json!({ "tasks": tasks })))
}
