/// Task model and database operations
///
/// A task belongs to exactly one room. Completion is not stored on the task
/// itself: each member present when the task was created gets a row in
/// `users_tasks` (see [`crate::models::assignment`]) tracking their own `done`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     title TEXT NOT NULL,
///     room_id BIGINT NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Lifecycle
///
/// 1. `create_with_assignments`: task row plus one assignment per current member
/// 2. Members toggle their own assignment
/// 3. The daily reset sets every assignment back to not done
/// 4. `remove_from_room` deletes the task and its assignments
///
/// # Example
///
/// ```no_run
/// use birgedo_shared::models::task::Task;
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let (task, assigned) = Task::create_with_assignments(&pool, "Take out trash", 10).await?;
/// println!("task {} assigned to {} members", task.id, assigned);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::db::timed;
use crate::models::DataError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,

    #[serde(rename = "roomID")]
    pub room_id: i64,

    pub created_at: DateTime<Utc>,
}

/// Input for inserting a bare task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub room_id: i64,
}

impl Task {
    /// Inserts a task without creating any assignments
    ///
    /// # Errors
    ///
    /// `DataError::NotFound` if the room does not exist.
    pub async fn insert(pool: &PgPool, data: NewTask) -> Result<Self, DataError> {
        timed(
            sqlx::query_as::<_, Task>(
                r#"
                INSERT INTO tasks (title, room_id)
                VALUES ($1, $2)
                RETURNING id, title, room_id, created_at
                "#,
            )
            .bind(data.title)
            .bind(data.room_id)
            .fetch_one(pool),
        )
        .await
    }

    /// Creates a task and assigns it to every current member of its room
    ///
    /// Both the task row and the `users_tasks` rows (all `done = false`) are
    /// written in one transaction. Users who join the room later are not
    /// assigned existing tasks.
    ///
    /// # Returns
    ///
    /// The task and the number of members it was assigned to
    pub async fn create_with_assignments(
        pool: &PgPool,
        title: &str,
        room_id: i64,
    ) -> Result<(Self, u64), DataError> {
        let (task, assigned) = timed(async {
            let mut tx = pool.begin().await?;

            let task = sqlx::query_as::<_, Task>(
                r#"
                INSERT INTO tasks (title, room_id)
                VALUES ($1, $2)
                RETURNING id, title, room_id, created_at
                "#,
            )
            .bind(title)
            .bind(room_id)
            .fetch_one(&mut *tx)
            .await?;

            let assigned = sqlx::query(
                r#"
                INSERT INTO users_tasks (user_id, task_id, done)
                SELECT user_id, $1, FALSE FROM rooms_users WHERE room_id = $2
                "#,
            )
            .bind(task.id)
            .bind(room_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            tx.commit().await?;
            Ok::<_, sqlx::Error>((task, assigned))
        })
        .await?;

        tracing::info!(task_id = task.id, room_id, assigned, "Task created");
        Ok((task, assigned))
    }

    /// Finds a task by id
    ///
    /// # Errors
    ///
    /// Returns `DataError::NotFound` if no task has this id.
    pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Self, DataError> {
        timed(
            sqlx::query_as::<_, Task>(
                "SELECT id, title, room_id, created_at FROM tasks WHERE id = $1",
            )
            .bind(id)
            .fetch_one(pool),
        )
        .await
    }

    /// Renames a task
    ///
    /// # Errors
    ///
    /// Returns `DataError::EditConflict` if the task no longer exists.
    pub async fn update(&self, pool: &PgPool) -> Result<(), DataError> {
        let result = timed(
            sqlx::query("UPDATE tasks SET title = $1 WHERE id = $2")
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

    /// Tasks of a room, ordered by id
    pub async fn list_by_room(pool: &PgPool, room_id: i64) -> Result<Vec<Self>, DataError> {
        timed(
            sqlx::query_as::<_, Task>(
                r#"
                SELECT id, title, room_id, created_at
                FROM tasks
                WHERE room_id = $1
                ORDER BY id
                "#,
            )
            .bind(room_id)
            .fetch_all(pool),
        )
        .await
    }

    /// Deletes a task from a room along with every assignment of it
    ///
    /// The delete is scoped to `room_id`, so a task id from another room is
    /// left untouched.
    ///
    /// # Returns
    ///
    /// Whether the task existed in the room
    pub async fn remove_from_room(
        pool: &PgPool,
        task_id: i64,
        room_id: i64,
    ) -> Result<bool, DataError> {
        let removed = timed(async {
            let mut tx = pool.begin().await?;

            sqlx::query(
                r#"
                DELETE FROM users_tasks
                WHERE task_id IN (SELECT id FROM tasks WHERE id = $1 AND room_id = $2)
                "#,
            )
            .bind(task_id)
            .bind(room_id)
            .execute(&mut *tx)
            .await?;

            let task = sqlx::query("DELETE FROM tasks WHERE id = $1 AND room_id = $2")
                .bind(task_id)
                .bind(room_id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(task.rows_affected() > 0)
        })
        .await?;

        if removed {
            tracing::info!(task_id, room_id, "Task removed");
        }

        Ok(removed)
    }

    /// Marks every assignment of every task as not done
    ///
    /// Run by the daily reset job.
    ///
    /// # Returns
    ///
    /// Number of assignments that were reset
    pub async fn reset_all_assignments(pool: &PgPool) -> Result<u64, DataError> {
        let result = timed(
            sqlx::query("UPDATE users_tasks SET done = FALSE WHERE done = TRUE").execute(pool),
        )
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_serializes_room_id_as_room_id_key() {
        let task = Task {
            id: 5,
            title: "Dishes".to_string(),
            room_id: 2,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["roomID"], 2);
        assert!(json.get("room_id").is_none());
    }
}
