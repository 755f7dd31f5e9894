/// Room model and database operations
///
/// A room groups tasks and the users who work on them. The creator becomes the
/// first member in the same transaction that creates the room.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE rooms (
///     id BIGSERIAL PRIMARY KEY,
///     title TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::db::timed;
use crate::models::DataError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Room {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Inserts a room without any members
    pub async fn insert(pool: &PgPool, title: &str) -> Result<Self, DataError> {
        timed(
            sqlx::query_as::<_, Room>(
                "INSERT INTO rooms (title) VALUES ($1) RETURNING id, title, created_at",
            )
            .bind(title)
            .fetch_one(pool),
        )
        .await
    }

    /// Creates a room and makes `user_id` its first member
    ///
    /// Both rows are written in one transaction; if either insert fails
    /// neither is kept.
    ///
    /// # Errors
    ///
    /// - `DataError::NotFound` if `user_id` does not exist
    /// - `DataError::Timeout` if the transaction exceeds the deadline
    pub async fn create_with_owner(
        pool: &PgPool,
        title: &str,
        user_id: i64,
    ) -> Result<Self, DataError> {
        let room = timed(async {
            let mut tx = pool.begin().await?;

            let room = sqlx::query_as::<_, Room>(
                "INSERT INTO rooms (title) VALUES ($1) RETURNING id, title, created_at",
            )
            .bind(title)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query("INSERT INTO rooms_users (user_id, room_id) VALUES ($1, $2)")
                .bind(user_id)
                .bind(room.id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(room)
        })
        .await?;

        tracing::info!(room_id = room.id, owner_id = user_id, "Room created");
        Ok(room)
    }

    /// Finds a room by id
    ///
    /// # Errors
    ///
    /// Returns `DataError::NotFound` if no room has this id.
    pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Self, DataError> {
        timed(
            sqlx::query_as::<_, Room>("SELECT id, title, created_at FROM rooms WHERE id = $1")
                .bind(id)
                .fetch_one(pool),
        )
        .await
    }

    /// Renames a room
    ///
    /// # Errors
    ///
    /// Returns `DataError::EditConflict` if the room no longer exists.
    pub async fn update(&self, pool: &PgPool) -> Result<(), DataError> {
        let result = timed(
            sqlx::query("UPDATE rooms SET title = $1 WHERE id = $2")
                .bind(&self.title)
                .bind(self.id)
                .execute(pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::EditConflict);
        }

        Ok(())
    }

    /// Lists the rooms a user belongs to, ordered by id
    pub async fn list_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, DataError> {
        timed(
            sqlx::query_as::<_, Room>(
                r#"
                SELECT rooms.id, rooms.title, rooms.created_at
                FROM rooms
                INNER JOIN rooms_users ON rooms.id = rooms_users.room_id
                WHERE rooms_users.user_id = $1
                ORDER BY rooms.id
                "#,
            )
            .bind(user_id)
            .fetch_all(pool),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_serialization() {
        let room = Room {
            id: 3,
            title: "Kitchen".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&room).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["title"], "Kitchen");
        assert!(json.get("created_at").is_some());
    }
}
