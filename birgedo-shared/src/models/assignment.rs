/// Task assignment model and database operations
///
/// An assignment is one user's completion state for one task. Rows are created
/// when the task is created (one per room member at that moment) and reset to
/// not done by the daily job.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users_tasks (
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     task_id BIGINT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     done BOOLEAN NOT NULL DEFAULT FALSE,
///     CONSTRAINT users_tasks_pkey PRIMARY KEY (user_id, task_id)
/// );
/// ```

use serde::Serialize;
use sqlx::PgPool;

use crate::db::timed;
use crate::models::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TaskAssignment {
    #[serde(rename = "userID")]
    pub user_id: i64,

    #[serde(rename = "taskID")]
    pub task_id: i64,

    pub done: bool,
}

/// A task as seen by one user, with that user's own completion state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct UserTask {
    #[serde(rename = "taskID")]
    pub task_id: i64,

    pub title: String,

    #[serde(rename = "roomID")]
    pub room_id: i64,

    pub done: bool,
}

/// One member's state for one task of a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct RoomAssignment {
    #[serde(rename = "userID")]
    pub user_id: i64,

    #[serde(rename = "userName")]
    pub user_name: String,

    #[serde(rename = "taskID")]
    pub task_id: i64,

    #[serde(rename = "taskTitle")]
    pub task_title: String,

    pub done: bool,
}

impl TaskAssignment {
    /// Assigns a task to a user, not done
    ///
    /// # Errors
    ///
    /// `DataError::DuplicateKey` if the assignment already exists.
    pub async fn insert(pool: &PgPool, user_id: i64, task_id: i64) -> Result<Self, DataError> {
        timed(
            sqlx::query_as::<_, TaskAssignment>(
                r#"
                INSERT INTO users_tasks (user_id, task_id, done)
                VALUES ($1, $2, FALSE)
                RETURNING user_id, task_id, done
                "#,
            )
            .bind(user_id)
            .bind(task_id)
            .fetch_one(pool),
        )
        .await
    }

    /// Loads a user's assignment for a task
    ///
    /// # Errors
    ///
    /// Returns `DataError::NotFound` if the user has no assignment for the task.
    pub async fn get(pool: &PgPool, user_id: i64, task_id: i64) -> Result<Self, DataError> {
        timed(
            sqlx::query_as::<_, TaskAssignment>(
                "SELECT user_id, task_id, done FROM users_tasks WHERE user_id = $1 AND task_id = $2",
            )
            .bind(user_id)
            .bind(task_id)
            .fetch_one(pool),
        )
        .await
    }

    /// Flips a user's completion state for a task
    ///
    /// A single `UPDATE ... SET done = NOT done`, so concurrent toggles never
    /// lose an update.
    ///
    /// # Returns
    ///
    /// The assignment with its new state
    ///
    /// # Errors
    ///
    /// Returns `DataError::NotFound` if the user has no assignment for the task.
    pub async fn toggle(pool: &PgPool, user_id: i64, task_id: i64) -> Result<Self, DataError> {
        let assignment = timed(
            sqlx::query_as::<_, TaskAssignment>(
                r#"
                UPDATE users_tasks
                SET done = NOT done
                WHERE user_id = $1 AND task_id = $2
                RETURNING user_id, task_id, done
                "#,
            )
            .bind(user_id)
            .bind(task_id)
            .fetch_one(pool),
        )
        .await?;

        tracing::debug!(user_id, task_id, done = assignment.done, "Assignment toggled");
        Ok(assignment)
    }

    /// Every task assigned to a user with their own state, ordered by task id
    pub async fn list_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<UserTask>, DataError> {
        timed(
            sqlx::query_as::<_, UserTask>(
                r#"
                SELECT tasks.id AS task_id, tasks.title, tasks.room_id, users_tasks.done
                FROM users_tasks
                INNER JOIN tasks ON tasks.id = users_tasks.task_id
                WHERE users_tasks.user_id = $1
                ORDER BY tasks.id
                "#,
            )
            .bind(user_id)
            .fetch_all(pool),
        )
        .await
    }

    /// Every member-task state in a room, ordered by task then user
    pub async fn list_by_room(
        pool: &PgPool,
        room_id: i64,
    ) -> Result<Vec<RoomAssignment>, DataError> {
        timed(
            sqlx::query_as::<_, RoomAssignment>(
                r#"
                SELECT users.id AS user_id, users.name AS user_name,
                       tasks.id AS task_id, tasks.title AS task_title,
                       users_tasks.done
                FROM users_tasks
                INNER JOIN tasks ON tasks.id = users_tasks.task_id
                INNER JOIN users ON users.id = users_tasks.user_id
                WHERE tasks.room_id = $1
                ORDER BY tasks.id, users.id
                "#,
            )
            .bind(room_id)
            .fetch_all(pool),
        )
        .await
    }
}
