/// User model and database operations
///
/// Users own credentials (an Argon2id hash and opaque tokens) and take part in
/// rooms through the `rooms_users` table.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     name TEXT NOT NULL,
///     email TEXT NOT NULL,
///     password_hash TEXT NOT NULL,
///     activated BOOLEAN NOT NULL DEFAULT FALSE,
///     version INTEGER NOT NULL DEFAULT 1,
///     CONSTRAINT users_email_key UNIQUE (email)
/// );
/// ```
///
/// Emails are stored trimmed and lowercased, so the unique constraint is
/// effectively case-insensitive.
///
/// # Example
///
/// ```no_run
/// use birgedo_shared::models::user::{User, NewUser};
/// use birgedo_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::insert(&pool, NewUser {
///     name: "Alice".to_string(),
///     email: "alice@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// let found = User::get_by_email(&pool, "Alice@Example.com").await?;
/// assert_eq!(user.id, found.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::auth::tokens::TokenScope;
use crate::db::timed;
use crate::models::token::hash_token;
use crate::models::DataError;

/// User account
///
/// The password hash is never serialized. `version` is exposed so clients can
/// send it back for optimistic updates.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,

    pub created_at: DateTime<Utc>,

    pub name: String,

    /// Normalized email address (trimmed, lowercase)
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub activated: bool,

    /// Optimistic concurrency counter, incremented on every update
    pub version: i32,
}

/// Input for registering a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,

    /// Email address (normalized on insert)
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,
}

/// Public projection of a user, used in listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Canonical form of an email address as stored in `users.email`
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

const USER_COLUMNS: &str = "id, created_at, name, email, password_hash, activated, version";

impl User {
    /// Inserts a new user
    ///
    /// # Returns
    ///
    /// The stored user with its generated id, creation time and initial version
    ///
    /// # Errors
    ///
    /// - `DataError::DuplicateEmail` if the normalized email is already taken
    /// - `DataError::Timeout` / `DataError::Database` on storage failure
    pub async fn insert(pool: &PgPool, data: NewUser) -> Result<Self, DataError> {
        let query = format!(
            "INSERT INTO users (name, email, password_hash, activated)
             VALUES ($1, $2, $3, FALSE)
             RETURNING {USER_COLUMNS}"
        );

        let user = timed(
            sqlx::query_as::<_, User>(&query)
                .bind(data.name)
                .bind(normalize_email(&data.email))
                .bind(data.password_hash)
                .fetch_one(pool),
        )
        .await?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// Finds a user by id
    ///
    /// # Errors
    ///
    /// Returns `DataError::NotFound` if no user has this id.
    pub async fn get(pool: &PgPool, id: i64) -> Result<Self, DataError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        timed(sqlx::query_as::<_, User>(&query).bind(id).fetch_one(pool)).await
    }

    /// Finds a user by email address (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns `DataError::NotFound` if no user has this email.
    pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Self, DataError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        timed(
            sqlx::query_as::<_, User>(&query)
                .bind(normalize_email(email))
                .fetch_one(pool),
        )
        .await
    }

    /// Lists every user as a summary, ordered by id
    pub async fn get_all(pool: &PgPool) -> Result<Vec<UserSummary>, DataError> {
        timed(
            sqlx::query_as::<_, UserSummary>("SELECT id, name, email FROM users ORDER BY id")
                .fetch_all(pool),
        )
        .await
    }

    /// Persists changes to name, email, password hash and activation
    ///
    /// The write only applies if the stored version still equals `self.version`;
    /// on success `self.version` is advanced to the stored value.
    ///
    /// # Errors
    ///
    /// - `DataError::EditConflict` if the row changed (or vanished) since it was read
    /// - `DataError::DuplicateEmail` if the new email belongs to another user
    pub async fn update(&mut self, pool: &PgPool) -> Result<(), DataError> {
        self.email = normalize_email(&self.email);

        let version: Option<i32> = timed(
            sqlx::query_scalar(
                r#"
                UPDATE users
                SET name = $1, email = $2, password_hash = $3, activated = $4,
                    version = version + 1
                WHERE id = $5 AND version = $6
                RETURNING version
                "#,
            )
            .bind(&self.name)
            .bind(&self.email)
            .bind(&self.password_hash)
            .bind(self.activated)
            .bind(self.id)
            .bind(self.version)
            .fetch_optional(pool),
        )
        .await?;

        match version {
            Some(version) => {
                self.version = version;
                Ok(())
            }
            None => Err(DataError::EditConflict),
        }
    }

    /// Finds the owner of a live token
    ///
    /// The plaintext is hashed with SHA-256 and matched together with the
    /// scope; expired tokens never match.
    ///
    /// # Errors
    ///
    /// Returns `DataError::NotFound` if no unexpired token matches.
    pub async fn get_for_token(
        pool: &PgPool,
        scope: TokenScope,
        plaintext: &str,
    ) -> Result<Self, DataError> {
        timed(
            sqlx::query_as::<_, User>(
                r#"
                SELECT users.id, users.created_at, users.name, users.email,
                       users.password_hash, users.activated, users.version
                FROM users
                INNER JOIN tokens ON users.id = tokens.user_id
                WHERE tokens.hash = $1
                  AND tokens.scope = $2
                  AND tokens.expiry > $3
                "#,
            )
            .bind(hash_token(plaintext))
            .bind(scope.as_str())
            .bind(Utc::now())
            .fetch_one(pool),
        )
        .await
    }
}
