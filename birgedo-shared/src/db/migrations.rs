/// Schema migrations
///
/// The SQL files under `migrations/` at the workspace root are compiled into
/// every binary that links this crate, as reversible `.up.sql`/`.down.sql`
/// pairs. Both the API server and the integration tests apply them on start;
/// sqlx records progress in `_sqlx_migrations` and skips what is applied.

use sqlx::migrate::{MigrateDatabase, MigrateError, Migrator};
use sqlx::{PgPool, Postgres};
use tracing::{debug, error, info};

pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Applied versions compared with the embedded ones
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied_migrations: usize,
    pub latest_version: Option<i64>,

    /// Embedded versions not yet applied, ascending
    pub pending: Vec<i64>,

    pub is_up_to_date: bool,
}

fn embedded_versions() -> impl Iterator<Item = i64> {
    MIGRATOR
        .iter()
        .filter(|m| m.migration_type.is_up_migration())
        .map(|m| m.version)
}

pub fn embedded_migration_count() -> usize {
    embedded_versions().count()
}

/// Applies every pending migration
///
/// Fails on a SQL error or when an applied migration's checksum no longer
/// matches its embedded file.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!(embedded = embedded_migration_count(), "Applying database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        error!(error = %e, "Database migration failed");
        e
    })?;

    info!("Database schema up to date");
    Ok(())
}

/// Reads the applied versions from `_sqlx_migrations`
///
/// A database that has never been migrated reports every embedded version as
/// pending.
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let tracked: bool = sqlx::query_scalar("SELECT to_regclass('_sqlx_migrations') IS NOT NULL")
        .fetch_one(pool)
        .await?;

    let applied: Vec<i64> = if tracked {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success ORDER BY version")
            .fetch_all(pool)
            .await?
    } else {
        Vec::new()
    };

    let pending: Vec<i64> = embedded_versions()
        .filter(|v| !applied.contains(v))
        .collect();

    debug!(applied = applied.len(), pending = pending.len(), "Migration status");

    Ok(MigrationStatus {
        applied_migrations: applied.len(),
        latest_version: applied.last().copied(),
        is_up_to_date: pending.is_empty(),
        pending,
    })
}

/// Creates the database named in `database_url` when it is missing
///
/// For development and tests.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        return Ok(());
    }

    Postgres::create_database(database_url).await?;
    info!("Created database");
    Ok(())
}
