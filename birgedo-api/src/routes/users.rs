/// User account endpoints
///
/// # Endpoints
///
/// - `POST /v1/users` - Register a new user
/// - `GET /v1/users` - The caller's identity (`null` when anonymous)
/// - `PATCH /v1/users/me` - Update name, email or password

use axum::{extract::State, http::StatusCode, Extension, Json};
use birgedo_shared::auth::identity::{CurrentUser, Identity};
use birgedo_shared::auth::password::hash_password;
use birgedo_shared::models::user::{NewUser, User};
use birgedo_shared::models::DataError;
use birgedo_shared::validation::{
    validate_email, validate_password_plaintext, validate_user_name, Validator,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::routes::AppJson;

/// Register request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}

/// Account update request; absent fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,

    pub email: Option<String>,

    pub password: Option<String>,

    /// Version the client last saw; a mismatch is an edit conflict
    pub version: Option<i32>,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /v1/users
/// Content-Type: application/json
///
/// { "name": "Alice", "email": "alice@example.com", "password": "pa55word" }
/// ```
///
/// # Response
///
/// `201 Created` with `{"user": {...}}`
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut v = Validator::new();
    validate_user_name(&mut v, &req.name);
    validate_email(&mut v, &req.email);
    validate_password_plaintext(&mut v, &req.password);
    if !v.is_valid() {
        return Err(ApiError::ValidationFailed(v.into_errors()));
    }

    let password_hash = hash_password(&req.password)?;

    let user = User::insert(
        &state.db,
        NewUser {
            name: req.name,
            email: req.email,
            password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, "User registered");

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

/// The caller's identity
///
/// Never fails: anonymous callers get `{"user": null}`.
pub async fn current_user(identity: Option<Extension<Identity>>) -> Json<Value> {
    let user = identity.as_ref().and_then(|Extension(identity)| identity.user());

    Json(json!({ "user": user }))
}

/// Update the caller's account
///
/// # Errors
///
/// - `409 Conflict`: Stale `version`, concurrent update, or email taken
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update_current_user(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> ApiResult<Json<Value>> {
    if let Some(version) = req.version {
        if version != user.version {
            return Err(DataError::EditConflict.into());
        }
    }

    let mut v = Validator::new();
    if let Some(name) = &req.name {
        validate_user_name(&mut v, name);
    }
    if let Some(email) = &req.email {
        validate_email(&mut v, email);
    }
    if let Some(password) = &req.password {
        validate_password_plaintext(&mut v, password);
    }
    if !v.is_valid() {
        return Err(ApiError::ValidationFailed(v.into_errors()));
    }

    if let Some(name) = req.name {
        user.name = name;
    }
    if let Some(email) = req.email {
        user.email = email;
    }
    if let Some(password) = req.password {
        user.password_hash = hash_password(&password)?;
    }

    user.update(&state.db).await?;

    tracing::info!(user_id = user.id, version = user.version, "User updated");

    Ok(Json(json!({ "user": user })))
}
