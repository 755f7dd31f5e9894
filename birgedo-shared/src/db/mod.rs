/// Database layer for BirgeDo
///
/// This module provides connection pooling, migrations, and the statement
/// timeout wrapper every model operation runs under.
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: Embedded migration runner
/// - Models are in the `models` module at crate root level
///
/// # Example
///
/// ```no_run
/// use birgedo_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;

use std::future::Future;
use std::time::Duration;

use crate::models::DataError;

/// Upper bound for a single model operation (one statement or one transaction)
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Runs a database operation under [`QUERY_TIMEOUT`]
///
/// sqlx errors are classified into [`DataError`] variants; an elapsed deadline
/// becomes [`DataError::Timeout`]. Dropping a transaction future on timeout
/// rolls the transaction back.
pub async fn timed<F, T>(operation: F) -> Result<T, DataError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(QUERY_TIMEOUT, operation).await {
        Ok(result) => result.map_err(DataError::from),
        Err(_) => {
            tracing::warn!(timeout_ms = QUERY_TIMEOUT.as_millis() as u64, "Database operation timed out");
            Err(DataError::Timeout)
        }
    }
}
