/// Configuration management for the API server
///
/// Every setting is a command-line flag with an environment variable
/// fallback. A `.env` file in the working directory is loaded first (for
/// development).
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 4000)
/// - `APP_ENV`: development | staging | production (default: development)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 25)
/// - `APP_SECRET`: Secret key for JWT signing, at least 32 characters (required)
/// - `CORS_ORIGINS`: Comma-separated trusted origins, or `*` (default: *)
/// - `LIMITER_RPS` / `LIMITER_BURST` / `LIMITER_ENABLED`: Per-client rate limit
/// - `TRUST_PROXY`: Take the client address from forwarding headers (default: false)
/// - `TOKEN_TTL_HOURS`: Lifetime of authentication tokens (default: 24)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use birgedo_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use birgedo_shared::db::pool::DatabaseConfig;
use clap::{Parser, ValueEnum};
use serde::Serialize;

/// Minimum accepted length of the signing secret
pub const MIN_SECRET_LEN: usize = 32;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Complete application configuration
#[derive(Clone, Parser)]
#[command(
    name = "birgedo-api",
    version,
    about = "BirgeDo task-tracking API server",
    args_override_self = true
)]
pub struct Config {
    /// Host to bind to
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind to
    #[arg(long, env = "API_PORT", default_value_t = 4000)]
    pub port: u16,

    /// Deployment environment
    #[arg(long = "env", env = "APP_ENV", value_enum, default_value_t = Environment::Development)]
    pub environment: Environment,

    /// PostgreSQL connection URL
    #[arg(long = "db-dsn", env = "DATABASE_URL")]
    pub database_url: String,

    /// Maximum number of connections in the pool
    #[arg(long = "db-max-connections", env = "DATABASE_MAX_CONNECTIONS", default_value_t = 25)]
    pub database_max_connections: u32,

    /// Secret key for JWT signing
    ///
    /// Generate with: `openssl rand -hex 32`
    #[arg(long, env = "APP_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Trusted CORS origins, comma separated, or `*` for any
    #[arg(long, env = "CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Sustained requests per second allowed per client
    #[arg(long, env = "LIMITER_RPS", default_value_t = 2.0)]
    pub limiter_rps: f64,

    /// Requests a client may burst above the sustained rate
    #[arg(long, env = "LIMITER_BURST", default_value_t = 4)]
    pub limiter_burst: u32,

    /// Whether rate limiting is applied at all
    #[arg(long, env = "LIMITER_ENABLED", default_value_t = true, action = clap::ArgAction::Set)]
    pub limiter_enabled: bool,

    /// Whether `X-Forwarded-For`/`X-Real-IP` name the client; enable only
    /// behind a reverse proxy that overwrites them
    #[arg(long, env = "TRUST_PROXY", default_value_t = false, action = clap::ArgAction::Set)]
    pub trust_proxy: bool,

    /// Lifetime of issued authentication tokens, in hours
    #[arg(long, env = "TOKEN_TTL_HOURS", default_value_t = 24)]
    pub token_ttl_hours: i64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("database_max_connections", &self.database_max_connections)
            .field("secret", &"<redacted>")
            .field("cors_origins", &self.cors_origins)
            .field("limiter_rps", &self.limiter_rps)
            .field("limiter_burst", &self.limiter_burst)
            .field("limiter_enabled", &self.limiter_enabled)
            .field("trust_proxy", &self.trust_proxy)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Loads configuration from flags and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required settings are missing
    /// - Settings have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let config = Self::try_parse()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks constraints clap cannot express
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("APP_SECRET must be at least {MIN_SECRET_LEN} characters long");
        }
        if self.database_url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL must not be empty");
        }
        if self.limiter_rps.is_nan() || self.limiter_rps <= 0.0 {
            anyhow::bail!("LIMITER_RPS must be positive");
        }
        if self.limiter_burst == 0 {
            anyhow::bail!("LIMITER_BURST must be at least 1");
        }
        if self.token_ttl_hours <= 0 {
            anyhow::bail!("TOKEN_TTL_HOURS must be positive");
        }
        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Trusted origins, or `None` when any origin is allowed
    pub fn cors_origin_list(&self) -> Option<Vec<String>> {
        if self.cors_origins.trim() == "*" {
            return None;
        }

        Some(
            self.cors_origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Pool settings derived from this configuration
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone(),
            max_connections: self.database_max_connections,
            ..Default::default()
        }
    }
}
