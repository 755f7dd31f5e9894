/// CSRF protection for cookie-authenticated requests
///
/// Double-submit check: login sets a random `csrf_token` cookie readable by
/// scripts. A state-changing request authenticated by the `token` cookie
/// must echo that value in the `X-CSRF-Token` header; a cross-site page can
/// make the browser send the cookie but cannot read it.
///
/// Bearer-authenticated and anonymous requests are not checked. The global
/// [`csrf_protect`] skips safe methods (GET, HEAD, OPTIONS, TRACE); routes
/// that change state on GET add [`require_csrf_token`], which checks every
/// method. A `SameSite=Lax` cookie still rides along on cross-site top-level
/// navigations, so such a route is reachable from any link.

use axum::{
    extract::Request,
    http::Method,
    middleware::Next,
    response::Response,
};
use birgedo_shared::auth::authenticator::read_cookie;
use birgedo_shared::auth::identity::CredentialSource;
use rand::{distributions::Alphanumeric, Rng};

use crate::error::ApiError;

/// Name of the cookie carrying the CSRF token
pub const CSRF_COOKIE: &str = "csrf_token";

/// Header the client echoes the CSRF token in
pub const CSRF_HEADER: &str = "x-csrf-token";

const CSRF_TOKEN_LEN: usize = 32;

/// Generates a fresh CSRF token
pub fn generate_csrf_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CSRF_TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Compares without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Checks the double-submit token of a cookie-authenticated request
fn verify(request: &Request) -> Result<(), ApiError> {
    let cookie_authenticated =
        request.extensions().get::<CredentialSource>() == Some(&CredentialSource::Cookie);
    if !cookie_authenticated {
        return Ok(());
    }

    let expected = read_cookie(request.headers(), CSRF_COOKIE);
    let presented = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok());

    let valid = match (expected.as_deref(), presented) {
        (Some(expected), Some(presented)) => {
            constant_time_eq(expected.as_bytes(), presented.as_bytes())
        }
        _ => false,
    };

    if !valid {
        tracing::warn!(method = %request.method(), path = %request.uri().path(), "CSRF check failed");
        return Err(ApiError::Forbidden("CSRF token missing or invalid".to_string()));
    }

    Ok(())
}

/// CSRF middleware
///
/// # Errors
///
/// - 403 Forbidden: cookie-authenticated unsafe request without a matching
///   `X-CSRF-Token` header
pub async fn csrf_protect(request: Request, next: Next) -> Result<Response, ApiError> {
    if !is_safe(request.method()) {
        verify(&request)?;
    }

    Ok(next.run(request).await)
}

/// CSRF gate for routes that change state on a safe method
///
/// # Errors
///
/// - 403 Forbidden: cookie-authenticated request, whatever its method,
///   without a matching `X-CSRF-Token` header
pub async fn require_csrf_token(request: Request, next: Next) -> Result<Response, ApiError> {
    verify(&request)?;
    Ok(next.run(request).await)
}
