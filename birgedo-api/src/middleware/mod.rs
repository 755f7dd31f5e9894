/// Middleware for the API server
///
/// Applied by [`crate::app::build_router`], outermost first:
///
/// 1. panic recovery and request tracing (`tower_http`)
/// 2. [`security`]: security headers
/// 3. CORS (`tower_http`)
/// 4. [`rate_limit`]: per-client token bucket
/// 5. [`auth::authenticate`]: credential → identity
/// 6. [`csrf`]: double-submit check for cookie-authenticated requests
/// 7. [`auth`] gates, per route group

pub mod auth;
pub mod csrf;
pub mod rate_limit;
pub mod security;
