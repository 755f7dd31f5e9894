/// Request identity
///
/// Authentication middleware resolves every request to an [`Identity`] and
/// stores it in the request extensions, together with the
/// [`CredentialSource`] when a credential was presented. Handlers that need a
/// user take a [`CurrentUser`] parameter; anonymous requests are rejected with
/// 401 before the handler runs.
///
/// # Example
///
/// ```no_run
/// use birgedo_shared::auth::identity::CurrentUser;
///
/// async fn whoami(CurrentUser(user): CurrentUser) -> String {
///     format!("Hello, {}!", user.name)
/// }
/// ```

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::authenticator::AuthError;
use crate::models::user::User;

/// Who is making the request
#[derive(Debug, Clone)]
pub enum Identity {
    /// No credential was presented
    Anonymous,

    /// A credential resolved to this user
    User(User),
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Anonymous => None,
            Identity::User(user) => Some(user),
        }
    }
}

/// Where the credential came from
///
/// Cookie-borne credentials are sent by browsers automatically, so unsafe
/// requests authenticated this way must pass the CSRF check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// `Authorization: Bearer <token>` header
    Bearer,

    /// `token` cookie
    Cookie,
}

/// The authenticated user, as a handler parameter
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Identity>() {
            Some(Identity::User(user)) => Ok(CurrentUser(user.clone())),
            _ => Err(AuthError::AuthenticationRequired),
        }
    }
}
