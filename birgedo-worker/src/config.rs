/// Worker configuration
///
/// Parsed from command-line flags, falling back to environment variables
/// (and a `.env` file when present).
///
/// | Flag                    | Environment           | Default  |
/// |-------------------------|-----------------------|----------|
/// | `--db-dsn`              | `DATABASE_URL`        | required |
/// | `--db-max-connections`  | `DB_MAX_CONNECTIONS`  | 2        |
/// | `--reset-interval-secs` | `RESET_INTERVAL_SECS` | 86400    |

use std::time::Duration;

use birgedo_shared::db::pool::DatabaseConfig;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "birgedo-worker",
    version,
    about = "BirgeDo background jobs",
    args_override_self = true
)]
pub struct WorkerConfig {
    /// PostgreSQL connection string
    #[arg(long = "db-dsn", env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Maximum pooled database connections
    #[arg(long = "db-max-connections", env = "DB_MAX_CONNECTIONS", default_value_t = 2)]
    pub database_max_connections: u32,

    /// Seconds between assignment resets
    #[arg(long, env = "RESET_INTERVAL_SECS", default_value_t = 86400)]
    pub reset_interval_secs: u64,
}

impl WorkerConfig {
    /// Loads `.env` (if any), then parses flags and environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::try_parse()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.trim().is_empty() {
            anyhow::bail!("database URL must not be empty");
        }
        if self.reset_interval_secs == 0 {
            anyhow::bail!("reset interval must be at least one second");
        }
        if self.database_max_connections == 0 {
            anyhow::bail!("database pool needs at least one connection");
        }
        Ok(())
    }

    pub fn reset_interval(&self) -> Duration {
        Duration::from_secs(self.reset_interval_secs)
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone(),
            max_connections: self.database_max_connections,
            min_connections: 0,
            ..Default::default()
        }
    }
}
