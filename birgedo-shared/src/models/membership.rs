/// Room membership model and database operations
///
/// Memberships link users to rooms. A user can belong to many rooms and a room
/// has many members; membership is what grants access to a room's tasks.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE rooms_users (
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     room_id BIGINT NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT rooms_users_pkey PRIMARY KEY (user_id, room_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use birgedo_shared::models::membership::RoomMembership;
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// RoomMembership::insert(&pool, 2, 10).await?;
/// assert!(RoomMembership::is_member(&pool, 10, 2).await?);
///
/// // Removing also drops user 2's task assignments in room 10
/// RoomMembership::remove(&pool, 2, 10).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::db::timed;
use crate::models::user::UserSummary;
use crate::models::DataError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct RoomMembership {
    pub user_id: i64,
    pub room_id: i64,
    pub created_at: DateTime<Utc>,
}

impl RoomMembership {
    /// Adds a user to a room
    ///
    /// # Errors
    ///
    /// - `DataError::DuplicateKey` if the user is already a member
    /// - `DataError::NotFound` if the user or the room does not exist
    pub async fn insert(pool: &PgPool, user_id: i64, room_id: i64) -> Result<Self, DataError> {
        let membership = timed(
            sqlx::query_as::<_, RoomMembership>(
                r#"
                INSERT INTO rooms_users (user_id, room_id)
                VALUES ($1, $2)
                RETURNING user_id, room_id, created_at
                "#,
            )
            .bind(user_id)
            .bind(room_id)
            .fetch_one(pool),
        )
        .await?;

        tracing::info!(user_id, room_id, "User added to room");
        Ok(membership)
    }

    /// Ids of every member of a room, ordered by id
    pub async fn user_ids_by_room(pool: &PgPool, room_id: i64) -> Result<Vec<i64>, DataError> {
        timed(
            sqlx::query_scalar(
                "SELECT user_id FROM rooms_users WHERE room_id = $1 ORDER BY user_id",
            )
            .bind(room_id)
            .fetch_all(pool),
        )
        .await
    }

    /// Members of a room with their public details, ordered by id
    pub async fn members_of(pool: &PgPool, room_id: i64) -> Result<Vec<UserSummary>, DataError> {
        timed(
            sqlx::query_as::<_, UserSummary>(
                r#"
                SELECT users.id, users.name, users.email
                FROM users
                INNER JOIN rooms_users ON users.id = rooms_users.user_id
                WHERE rooms_users.room_id = $1
                ORDER BY users.id
                "#,
            )
            .bind(room_id)
            .fetch_all(pool),
        )
        .await
    }

    pub async fn is_member(pool: &PgPool, room_id: i64, user_id: i64) -> Result<bool, DataError> {
        timed(
            sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM rooms_users WHERE room_id = $1 AND user_id = $2)",
            )
            .bind(room_id)
            .bind(user_id)
            .fetch_one(pool),
        )
        .await
    }

    /// Removes a user from a room together with their assignments there
    ///
    /// The user's `users_tasks` rows for the room's tasks and the membership row
    /// are deleted in one transaction.
    ///
    /// # Returns
    ///
    /// Whether a membership row existed
    pub async fn remove(pool: &PgPool, user_id: i64, room_id: i64) -> Result<bool, DataError> {
        let removed = timed(async {
            let mut tx = pool.begin().await?;

            let assignments = sqlx::query(
                r#"
                DELETE FROM users_tasks
                WHERE user_id = $1
                  AND task_id IN (SELECT id FROM tasks WHERE room_id = $2)
                "#,
            )
            .bind(user_id)
            .bind(room_id)
            .execute(&mut *tx)
            .await?;

            let membership =
                sqlx::query("DELETE FROM rooms_users WHERE user_id = $1 AND room_id = $2")
                    .bind(user_id)
                    .bind(room_id)
                    .execute(&mut *tx)
                    .await?;

            tx.commit().await?;

            tracing::debug!(
                user_id,
                room_id,
                assignments_removed = assignments.rows_affected(),
                "Membership removal committed"
            );
            Ok::<_, sqlx::Error>(membership.rows_affected() > 0)
        })
        .await?;

        if removed {
            tracing::info!(user_id, room_id, "User removed from room");
        }

        Ok(removed)
    }
}
