/// Authentication token endpoints
///
/// # Endpoints
///
/// - `POST /v1/tokens/authentication` - Log in
/// - `DELETE /v1/tokens/authentication` - Log out
///
/// Logging in issues two credentials for the same user:
/// - an opaque 26-character token, stored hashed and revocable, also set as
///   the HTTP-only `token` cookie for browser clients
/// - a signed JWT for stateless bearer use
///
/// A fresh `csrf_token` cookie is set alongside; browser clients echo it in
/// the `X-CSRF-Token` header on state-changing requests.

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use birgedo_shared::auth::authenticator::TOKEN_COOKIE;
use birgedo_shared::auth::identity::CurrentUser;
use birgedo_shared::auth::jwt::{create_token, Claims};
use birgedo_shared::auth::password::verify_password;
use birgedo_shared::auth::tokens::TokenScope;
use birgedo_shared::models::token::Token;
use birgedo_shared::models::user::User;
use birgedo_shared::models::DataError;
use birgedo_shared::validation::{validate_email, validate_password_plaintext, Validator};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::csrf::{generate_csrf_token, CSRF_COOKIE};
use crate::routes::AppJson;

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}

/// Builds a session cookie scoped to the whole site
///
/// A `max_age` of zero expires the cookie immediately.
pub fn session_cookie(
    name: &'static str,
    value: String,
    max_age: time::Duration,
    http_only: bool,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .max_age(max_age)
        .same_site(SameSite::Lax)
        .http_only(http_only)
        .secure(secure)
        .build()
}

/// Log in
///
/// # Endpoint
///
/// ```text
/// POST /v1/tokens/authentication
/// Content-Type: application/json
///
/// { "email": "alice@example.com", "password": "pa55word" }
/// ```
///
/// # Response
///
/// `201 Created` with
///
/// ```json
/// {
///   "authentication_token": {
///     "token": "Y3QMGX3PJ3WLRL2YRTQGQ6KRHU",
///     "expiry": "2024-01-02T10:00:00Z",
///     "jwt": "eyJ...",
///     "user": { ... }
///   }
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_authentication_token(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<(StatusCode, CookieJar, Json<Value>)> {
    let mut v = Validator::new();
    validate_email(&mut v, &req.email);
    validate_password_plaintext(&mut v, &req.password);
    if !v.is_valid() {
        return Err(ApiError::ValidationFailed(v.into_errors()));
    }

    let user = match User::get_by_email(&state.db, &req.email).await {
        Ok(user) => user,
        Err(DataError::NotFound) => return Err(ApiError::InvalidCredentials),
        Err(e) => return Err(e.into()),
    };

    if !verify_password(&req.password, &user.password_hash)? {
        tracing::info!(user_id = user.id, "Login failed: wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let ttl = chrono::Duration::hours(state.config.token_ttl_hours);
    let (token, plaintext) =
        Token::new_token(&state.db, user.id, ttl, TokenScope::Authentication).await?;
    let jwt = create_token(&Claims::with_expiration(user.id, ttl), state.jwt_secret())?;

    let secure = state.config.is_production();
    let max_age = time::Duration::seconds(ttl.num_seconds());
    let cookies = CookieJar::new()
        .add(session_cookie(TOKEN_COOKIE, plaintext.clone(), max_age, true, secure))
        .add(session_cookie(CSRF_COOKIE, generate_csrf_token(), max_age, false, secure));

    tracing::info!(user_id = user.id, "User logged in");

    Ok((
        StatusCode::CREATED,
        cookies,
        Json(json!({
            "authentication_token": {
                "token": plaintext,
                "expiry": token.expiry,
                "jwt": jwt,
                "user": user,
            }
        })),
    ))
}

/// Log out
///
/// Revokes every authentication token of the caller and expires the
/// cookies. JWTs already issued stay valid until they expire.
pub async fn delete_authentication_tokens(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<(CookieJar, Json<Value>)> {
    let revoked =
        Token::delete_all_for_user(&state.db, TokenScope::Authentication, user.id).await?;

    tracing::info!(user_id = user.id, revoked, "User logged out");

    let secure = state.config.is_production();
    let cookies = CookieJar::new()
        .add(session_cookie(TOKEN_COOKIE, String::new(), time::Duration::ZERO, true, secure))
        .add(session_cookie(CSRF_COOKIE, String::new(), time::Duration::ZERO, false, secure));

    Ok((cookies, Json(json!({ "message": "logged out", "revoked": revoked }))))
}
