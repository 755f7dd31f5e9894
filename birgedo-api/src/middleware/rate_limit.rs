/// Per-client rate limiting
///
/// Token bucket per client IP, held in process memory:
/// - Tokens refill at `rps` per second up to `burst`
/// - Each request consumes 1 token
/// - A request finding the bucket empty is answered with 429 and a
///   `Retry-After` header
///
/// The client IP is the socket peer address. Behind a reverse proxy
/// (`--trust-proxy`), `X-Forwarded-For` (first entry) and then `X-Real-IP`
/// take precedence; otherwise those headers are ignored, since any client
/// can set them.
///
/// Buckets of clients not seen for [`STALE_AFTER`] are dropped by
/// [`RateLimiter::prune`], which the server runs every minute.
///
/// # Example
///
/// ```no_run
/// use birgedo_api::middleware::rate_limit::RateLimiter;
///
/// let limiter = RateLimiter::new(2.0, 4, true);
/// ```

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::error::ApiError;

/// Idle time after which a client's bucket is forgotten
pub const STALE_AFTER: Duration = Duration::from_secs(180);

/// Token bucket state for one client
#[derive(Debug, Clone)]
struct TokenBucket {
    /// Current number of tokens
    tokens: f64,

    /// Last refill time
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a new full bucket
    fn new(capacity: u32, now: Instant) -> Self {
        TokenBucket {
            tokens: f64::from(capacity),
            last_refill: now,
        }
    }

    /// Refills tokens based on elapsed time
    fn refill(&mut self, rate: f64, capacity: u32, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * rate).min(f64::from(capacity));
        self.last_refill = now;
    }

    /// Attempts to consume one token
    fn try_consume(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole seconds until one token is available
    fn seconds_until_available(&self, rate: f64) -> u64 {
        let deficit = 1.0 - self.tokens;
        if deficit <= 0.0 {
            0
        } else {
            (deficit / rate).ceil().max(1.0) as u64
        }
    }
}

/// Shared per-IP limiter
///
/// Cheap to clone; all clones share one bucket table.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<IpAddr, TokenBucket>>>,
    rps: f64,
    burst: u32,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(rps: f64, burst: u32, enabled: bool) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            rps,
            burst,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Takes one token from `ip`'s bucket
    ///
    /// # Errors
    ///
    /// The number of seconds to wait when the bucket is empty
    pub fn check(&self, ip: IpAddr, now: Instant) -> Result<(), u64> {
        if !self.enabled {
            return Ok(());
        }

        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let bucket = buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(self.burst, now));
        bucket.refill(self.rps, self.burst, now);

        if bucket.try_consume() {
            Ok(())
        } else {
            Err(bucket.seconds_until_available(self.rps))
        }
    }

    /// Forgets clients idle for longer than `max_idle`
    ///
    /// # Returns
    ///
    /// Number of buckets removed
    pub fn prune(&self, max_idle: Duration, now: Instant) -> usize {
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let before = buckets.len();
        buckets.retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) <= max_idle);
        before - buckets.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Determines the client address of a request
///
/// Forwarding headers are read only when `trust_proxy` is set.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> IpAddr {
    let header_ip = |name: &str| -> Option<IpAddr> {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|value| value.trim().parse().ok())
    };

    let forwarded = if trust_proxy {
        header_ip("x-forwarded-for").or_else(|| header_ip("x-real-ip"))
    } else {
        None
    };

    forwarded
        .or_else(|| peer.map(|addr| addr.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Rate limiting middleware
///
/// # Errors
///
/// - 429 Too Many Requests: the client's bucket is empty
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.limiter.is_enabled() {
        return Ok(next.run(request).await);
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer, state.config.trust_proxy);

    if let Err(retry_after) = state.limiter.check(ip, Instant::now()) {
        tracing::warn!(client_ip = %ip, retry_after, "Rate limit exceeded");
        return Err(ApiError::RateLimitExceeded { retry_after });
    }

    Ok(next.run(request).await)
}
