/// Health check endpoint
///
/// Verifies the server is running and the database answers.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "health": {
///     "status": "healthy",
///     "version": "0.1.0",
///     "environment": "production",
///     "database": "connected",
///     "pool": { "active_connections": 1, "idle_connections": 1, "total_connections": 2 }
///   }
/// }
/// ```

use axum::{extract::State, Json};
use birgedo_shared::db::pool::{get_pool_stats, health_check as ping_database, PoolStats};
use serde::Serialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::config::Environment;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy", or "degraded" when the database does not answer
    pub status: &'static str,

    pub version: &'static str,

    pub environment: Environment,

    /// "connected" or "disconnected"
    pub database: &'static str,

    pub pool: PoolStats,
}

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let connected = match ping_database(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    let health = HealthResponse {
        status: if connected { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment,
        database: if connected { "connected" } else { "disconnected" },
        pool: get_pool_stats(&state.db),
    };

    Json(json!({ "health": health }))
}
