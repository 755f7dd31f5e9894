/// Authentication middleware and route gates
///
/// [`authenticate`] runs on every request: it resolves the `Authorization`
/// header (or, failing that, the `token` cookie) to an [`Identity`] and
/// stores it in the request extensions, along with the [`CredentialSource`].
/// Requests without any credential continue as [`Identity::Anonymous`];
/// requests with a bad credential are rejected with 401.
///
/// The gates are applied per route group with `route_layer`:
/// - [`require_authenticated`]: anonymous → 401
/// - [`require_room_access`]: `:id` path parameter names a room the user
///   belongs to; unknown room → 404, not a member → 403. The loaded
///   [`Room`] is passed on as an extension.

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use birgedo_shared::auth::authenticator::{extract_credential, AuthError};
use birgedo_shared::auth::authorization;
use birgedo_shared::auth::identity::{CurrentUser, Identity};
use birgedo_shared::models::room::Room;

use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::read_id_param;

/// Resolves the request's identity
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolved = match extract_credential(request.headers()) {
        Ok(credential) => {
            let source = credential.as_ref().map(|c| c.source);
            state
                .authenticator
                .resolve(credential)
                .await
                .map(|identity| (identity, source))
        }
        Err(e) => Err(e),
    };

    let mut response = match resolved {
        Ok((identity, source)) => {
            if let Some(source) = source {
                request.extensions_mut().insert(source);
            }
            if let Some(user) = identity.user() {
                tracing::Span::current().record("user_id", user.id);
            }
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e @ AuthError::Database(_)) => ApiError::from(e).into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected credential");
            ApiError::from(e).into_response()
        }
    };

    // Responses differ by credential
    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}

/// Rejects anonymous requests
pub async fn require_authenticated(request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<Identity>() {
        Some(Identity::User(_)) => Ok(next.run(request).await),
        _ => Err(ApiError::AuthenticationRequired),
    }
}

/// Requires membership of the room named by the `:id` path parameter
///
/// Must run after [`require_authenticated`].
pub async fn require_room_access(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let room_id = read_id_param(&id)?;
    let room: Room = authorization::require_room_access(&state.db, room_id, user.id).await?;

    request.extensions_mut().insert(room);
    Ok(next.run(request).await)
}
