/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`; errors from the shared crate
/// convert with `?`.
///
/// Every error body has the shape `{"error": <message>}`, except validation
/// failures, which carry a field map: `{"error": {"email": ["must be provided"]}}`.
///
/// # Example
///
/// ```no_run
/// use birgedo_api::error::{ApiError, ApiResult};
/// use birgedo_shared::models::room::Room;
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(pool: sqlx::PgPool) -> ApiResult<Json<Value>> {
///     // DataError::NotFound becomes a 404
///     let room = Room::get_by_id(&pool, 1).await?;
///     Ok(Json(json!({ "room": room })))
/// }
/// ```

use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use birgedo_shared::auth::authenticator::AuthError;
use birgedo_shared::auth::authorization::AuthzError;
use birgedo_shared::auth::jwt::JwtError;
use birgedo_shared::auth::password::PasswordError;
use birgedo_shared::models::DataError;
use birgedo_shared::validation::FieldErrors;
use serde_json::json;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Message sent in place of any internal error
pub const INTERNAL_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400) - malformed body or parameters
    BadRequest(String),

    /// Unauthorized (401) - wrong email or password
    InvalidCredentials,

    /// Unauthorized (401) - bad, expired or revoked token
    InvalidToken,

    /// Unauthorized (401) - route needs a user, request is anonymous
    AuthenticationRequired,

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound,

    /// Conflict (409) - edit conflict or duplicate record
    Conflict(String),

    /// Unprocessable entity (422) - validation errors by field
    ValidationFailed(FieldErrors),

    /// Too many requests (429)
    RateLimitExceeded { retry_after: u64 },

    /// Internal server error (500); the message is logged, never sent
    Internal(String),
}

impl ApiError {
    /// Builds a validation failure on a single field
    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        ApiError::ValidationFailed(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials
            | ApiError::InvalidToken
            | ApiError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "{msg}"),
            ApiError::InvalidCredentials => write!(f, "invalid authentication credentials"),
            ApiError::InvalidToken => write!(f, "invalid or missing authentication token"),
            ApiError::AuthenticationRequired => {
                write!(f, "you must be authenticated to access this resource")
            }
            ApiError::Forbidden(msg) => write!(f, "{msg}"),
            ApiError::NotFound => write!(f, "the requested resource could not be found"),
            ApiError::Conflict(msg) => write!(f, "{msg}"),
            ApiError::ValidationFailed(errors) => {
                write!(f, "validation failed on {} field(s)", errors.len())
            }
            ApiError::RateLimitExceeded { .. } => write!(f, "rate limit exceeded"),
            ApiError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::ValidationFailed(errors) => json!({ "error": errors }),
            ApiError::Internal(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!(error = %msg, "Internal error");
                json!({ "error": INTERNAL_ERROR_MESSAGE })
            }
            other => json!({ "error": other.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();

        match self {
            ApiError::InvalidToken => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            ApiError::RateLimitExceeded { retry_after } => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            }
            _ => {}
        }

        response
    }
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::NotFound => ApiError::NotFound,
            DataError::EditConflict | DataError::DuplicateEmail | DataError::DuplicateKey => {
                ApiError::Conflict(err.to_string())
            }
            DataError::Timeout | DataError::Database(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidFormat(_) | AuthError::InvalidToken => ApiError::InvalidToken,
            AuthError::AuthenticationRequired => ApiError::AuthenticationRequired,
            AuthError::Database(e) => e.into(),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::RoomNotFound(_) => ApiError::NotFound,
            AuthzError::NotMember { .. } => ApiError::Forbidden(
                "your user account doesn't have the necessary permissions to access this resource"
                    .to_string(),
            ),
            AuthzError::Database(e) => e.into(),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(format!("password operation failed: {err}"))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        ApiError::Internal(format!("jwt operation failed: {err}"))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
