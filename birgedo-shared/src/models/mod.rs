/// Database models for BirgeDo
///
/// This module contains all database models and their operations. Every
/// operation runs under [`crate::db::QUERY_TIMEOUT`] and reports failures as
/// [`DataError`].
///
/// # Models
///
/// - `user`: User accounts and password hashes
/// - `room`: Rooms that group tasks
/// - `membership`: User-room relationships
/// - `task`: Tasks scoped to a room
/// - `assignment`: Per-user completion state of a task
/// - `token`: Opaque bearer tokens, stored hashed
///
/// # Example
///
/// ```no_run
/// use birgedo_shared::models::room::Room;
/// use birgedo_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let room = Room::create_with_owner(&pool, "Flat chores", 1).await?;
/// println!("Created room {}", room.id);
/// # Ok(())
/// # }
/// ```

pub mod assignment;
pub mod membership;
pub mod room;
pub mod task;
pub mod token;
pub mod user;

use thiserror::Error;

/// Name of the unique constraint on `users.email`
pub const USERS_EMAIL_KEY: &str = "users_email_key";

/// Errors produced by model operations
#[derive(Debug, Error)]
pub enum DataError {
    /// No row matched the lookup
    #[error("record not found")]
    NotFound,

    /// Optimistic update affected zero rows
    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    /// Unique violation on the users email constraint
    #[error("a user with this email address already exists")]
    DuplicateEmail,

    /// Unique violation on any other constraint
    #[error("duplicate key")]
    DuplicateKey,

    /// The operation exceeded the per-operation deadline
    #[error("database operation timed out")]
    Timeout,

    /// Any other storage failure
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DataError::NotFound,
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                match db_err.constraint() {
                    Some(USERS_EMAIL_KEY) => DataError::DuplicateEmail,
                    _ => DataError::DuplicateKey,
                }
            }
            // A dangling reference means the referenced record does not exist
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                DataError::NotFound
            }
            other => DataError::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            DataError::from(sqlx::Error::RowNotFound),
            DataError::NotFound
        ));
    }

    #[test]
    fn test_other_errors_are_database_errors() {
        let err = DataError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, DataError::Database(sqlx::Error::PoolTimedOut)));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(DataError::NotFound.to_string(), "record not found");
        assert_eq!(
            DataError::DuplicateEmail.to_string(),
            "a user with this email address already exists"
        );
    }
}
