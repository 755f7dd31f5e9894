//! # BirgeDo Worker Library
//!
//! Background jobs that run beside the API server.
//!
//! ## Modules
//!
//! - `config`: Worker configuration (flags and environment)
//! - `reset`: Periodic reset of every task assignment back to not done
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use birgedo_worker::reset::DailyReset;
//!
//! # async fn example(pool: sqlx::PgPool) {
//! let job = DailyReset::new(pool, Duration::from_secs(86400));
//! let shutdown = job.shutdown_token();
//!
//! tokio::spawn(async move { job.run().await });
//! shutdown.cancel();
//! # }
//! ```

pub mod config;
pub mod reset;
