/// Credential extraction and resolution
///
/// A request carries at most one credential: the `Authorization: Bearer`
/// header if present, otherwise the `token` cookie. [`Authenticator::resolve`]
/// turns that credential into an [`Identity`].
///
/// # Resolution rules
///
/// | credential                     | result                          |
/// |--------------------------------|---------------------------------|
/// | none                           | `Identity::Anonymous`           |
/// | bearer value shaped like a JWT | verify signature, load `sub`    |
/// | value shaped like opaque token | look up live token by hash      |
/// | anything else                  | `AuthError::InvalidToken`       |
///
/// # Example
///
/// ```no_run
/// use axum::http::HeaderMap;
/// use birgedo_shared::auth::authenticator::{extract_credential, Authenticator};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, headers: HeaderMap) -> Result<(), Box<dyn std::error::Error>> {
/// let authenticator = Authenticator::new(pool, "a-secret-that-is-at-least-32-bytes-long");
///
/// let credential = extract_credential(&headers)?;
/// let identity = authenticator.resolve(credential).await?;
/// println!("anonymous: {}", identity.is_anonymous());
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use sqlx::PgPool;

use super::identity::{CredentialSource, Identity};
use super::jwt::validate_token;
use super::tokens::{looks_like_jwt, looks_like_opaque_token, TokenScope};
use crate::models::user::User;
use crate::models::DataError;

/// Name of the cookie carrying the opaque authentication token
pub const TOKEN_COOKIE: &str = "token";

/// A credential as presented by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub value: String,
    pub source: CredentialSource,
}

/// Error type for authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Authorization header is not `Bearer <token>`
    #[error("invalid authorization header: {0}")]
    InvalidFormat(String),

    /// Credential is malformed, forged, expired, revoked or names a deleted user
    #[error("invalid or missing authentication token")]
    InvalidToken,

    /// Route requires a user but the request is anonymous
    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    /// Storage failure while resolving the credential
    #[error("database error: {0}")]
    Database(#[from] DataError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::InvalidFormat(_) | AuthError::InvalidToken => {
                let mut response = (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "invalid or missing authentication token" })),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            AuthError::AuthenticationRequired => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Credential lookup failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "the server encountered a problem and could not process your request"
                    })),
                )
                    .into_response()
            }
        }
    }
}

/// Reads a cookie value from the `Cookie` headers; empty values count as absent
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Picks the request's credential
///
/// # Errors
///
/// `AuthError::InvalidFormat` if an `Authorization` header is present but is
/// not exactly `Bearer <token>`
pub fn extract_credential(headers: &HeaderMap) -> Result<Option<Credential>, AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| AuthError::InvalidFormat("header is not valid ASCII".to_string()))?;

        let mut parts = value.split(' ');
        return match (parts.next(), parts.next(), parts.next()) {
            (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(Some(Credential {
                value: token.to_string(),
                source: CredentialSource::Bearer,
            })),
            _ => Err(AuthError::InvalidFormat("expected Bearer token".to_string())),
        };
    }

    Ok(read_cookie(headers, TOKEN_COOKIE).map(|value| Credential {
        value,
        source: CredentialSource::Cookie,
    }))
}

/// Resolves credentials to identities
///
/// Cheap to clone; shared by every request.
#[derive(Clone)]
pub struct Authenticator {
    pool: PgPool,
    jwt_secret: Arc<str>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("jwt_secret", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    pub fn new(pool: PgPool, jwt_secret: &str) -> Self {
        Self {
            pool,
            jwt_secret: Arc::from(jwt_secret),
        }
    }

    /// Secret used to sign and verify JWTs
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// Resolves a credential to an identity
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidToken` if the credential does not name a live user
    /// - `AuthError::Database` on storage failure
    pub async fn resolve(&self, credential: Option<Credential>) -> Result<Identity, AuthError> {
        let Some(credential) = credential else {
            return Ok(Identity::Anonymous);
        };

        let lookup = if credential.source == CredentialSource::Bearer
            && looks_like_jwt(&credential.value)
        {
            let claims = validate_token(&credential.value, &self.jwt_secret).map_err(|e| {
                tracing::debug!(error = %e, "Rejected JWT");
                AuthError::InvalidToken
            })?;
            let user_id = claims.user_id().map_err(|_| AuthError::InvalidToken)?;

            User::get(&self.pool, user_id).await
        } else if looks_like_opaque_token(&credential.value) {
            User::get_for_token(&self.pool, TokenScope::Authentication, &credential.value).await
        } else {
            return Err(AuthError::InvalidToken);
        };

        match lookup {
            Ok(user) => Ok(Identity::User(user)),
            Err(DataError::NotFound) => Err(AuthError::InvalidToken),
            Err(e) => Err(AuthError::Database(e)),
        }
    }
}
