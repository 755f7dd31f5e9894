/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: HS256 JWT creation and validation
/// - [`tokens`]: Token scopes and bearer value shape checks
/// - [`identity`]: Request identity, credential source and the `CurrentUser` extractor
/// - [`authenticator`]: Credential extraction and resolution to an identity
/// - [`authorization`]: Room membership checks
///
/// # Example
///
/// ```no_run
/// use birgedo_shared::auth::password::{hash_password, verify_password};
/// use birgedo_shared::auth::jwt::{create_token, Claims};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("pa55word")?;
/// assert!(verify_password("pa55word", &hash)?);
///
/// let jwt = create_token(&Claims::new(1), "a-secret-that-is-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod authenticator;
pub mod authorization;
pub mod identity;
pub mod jwt;
pub mod password;
pub mod tokens;
