/// Opaque token model and database operations
///
/// Tokens are random 26-character strings handed to the client once. Only the
/// SHA-256 hash of the plaintext is stored, so a database leak does not expose
/// usable credentials.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tokens (
///     hash BYTEA PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     expiry TIMESTAMPTZ NOT NULL,
///     scope TEXT NOT NULL
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use birgedo_shared::auth::tokens::TokenScope;
/// use birgedo_shared::models::token::Token;
/// use chrono::Duration;
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let (token, plaintext) =
///     Token::new_token(&pool, 1, Duration::hours(24), TokenScope::Authentication).await?;
///
/// // `plaintext` goes to the client, `token` only holds the hash
/// println!("expires at {}", token.expiry);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::auth::tokens::{TokenScope, OPAQUE_TOKEN_ALPHABET, OPAQUE_TOKEN_LEN};
use crate::db::timed;
use crate::models::DataError;

/// Stored token record
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Token {
    /// SHA-256 of the plaintext
    pub hash: Vec<u8>,

    pub user_id: i64,

    pub expiry: DateTime<Utc>,

    pub scope: String,
}

/// SHA-256 digest of a token plaintext, as stored in `tokens.hash`
pub fn hash_token(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

fn generate_plaintext() -> String {
    let mut rng = rand::thread_rng();
    (0..OPAQUE_TOKEN_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..OPAQUE_TOKEN_ALPHABET.len());
            OPAQUE_TOKEN_ALPHABET[idx] as char
        })
        .collect()
}

impl Token {
    /// Generates a fresh token without storing it
    ///
    /// # Returns
    ///
    /// The record to store and the plaintext to hand to the client
    pub fn generate(user_id: i64, ttl: Duration, scope: TokenScope) -> (Self, String) {
        let plaintext = generate_plaintext();

        let token = Token {
            hash: hash_token(&plaintext),
            user_id,
            expiry: Utc::now() + ttl,
            scope: scope.as_str().to_string(),
        };

        (token, plaintext)
    }

    /// Stores a generated token
    ///
    /// # Errors
    ///
    /// `DataError::NotFound` if the user no longer exists.
    pub async fn insert(&self, pool: &PgPool) -> Result<(), DataError> {
        timed(
            sqlx::query(
                r#"
                INSERT INTO tokens (hash, user_id, expiry, scope)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&self.hash)
            .bind(self.user_id)
            .bind(self.expiry)
            .bind(&self.scope)
            .execute(pool),
        )
        .await?;

        Ok(())
    }

    /// Generates and stores a token in one step
    pub async fn new_token(
        pool: &PgPool,
        user_id: i64,
        ttl: Duration,
        scope: TokenScope,
    ) -> Result<(Self, String), DataError> {
        let (token, plaintext) = Self::generate(user_id, ttl, scope);
        token.insert(pool).await?;

        tracing::debug!(user_id, scope = scope.as_str(), expiry = %token.expiry, "Token issued");
        Ok((token, plaintext))
    }

    /// Revokes every token of one scope belonging to a user
    ///
    /// # Returns
    ///
    /// Number of tokens deleted
    pub async fn delete_all_for_user(
        pool: &PgPool,
        scope: TokenScope,
        user_id: i64,
    ) -> Result<u64, DataError> {
        let result = timed(
            sqlx::query("DELETE FROM tokens WHERE scope = $1 AND user_id = $2")
                .bind(scope.as_str())
                .bind(user_id)
                .execute(pool),
        )
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::looks_like_opaque_token;

    #[test]
    fn test_generate_plaintext_shape() {
        let (token, plaintext) = Token::generate(42, Duration::hours(24), TokenScope::Authentication);

        assert_eq!(plaintext.len(), OPAQUE_TOKEN_LEN);
        assert!(looks_like_opaque_token(&plaintext));
        assert_eq!(token.user_id, 42);
        assert_eq!(token.scope, "authentication");
    }

    #[test]
    fn test_generate_stores_hash_not_plaintext() {
        let (token, plaintext) = Token::generate(1, Duration::hours(1), TokenScope::Authentication);

        assert_eq!(token.hash, hash_token(&plaintext));
        assert_eq!(token.hash.len(), 32);
        assert_ne!(token.hash, plaintext.as_bytes());
    }

    #[test]
    fn test_generate_sets_expiry_from_ttl() {
        let before = Utc::now();
        let (token, _) = Token::generate(1, Duration::hours(24), TokenScope::Authentication);

        assert!(token.expiry >= before + Duration::hours(24));
        assert!(token.expiry <= Utc::now() + Duration::hours(24));
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        let (_, a) = Token::generate(1, Duration::hours(1), TokenScope::Authentication);
        let (_, b) = Token::generate(1, Duration::hours(1), TokenScope::Authentication);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_token_is_deterministic() {
        assert_eq!(hash_token("ABCDEFGHIJKLMNOPQRSTUVWXYZ"), hash_token("ABCDEFGHIJKLMNOPQRSTUVWXYZ"));
        assert_ne!(hash_token("ABCDEFGHIJKLMNOPQRSTUVWXYZ"), hash_token("ABCDEFGHIJKLMNOPQRSTUVWXY2"));
    }
}
