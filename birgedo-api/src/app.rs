/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum
/// router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use birgedo_api::{app::{build_router, AppState}, config::Config};
/// use birgedo_shared::db::pool::create_pool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(config.database()).await?;
/// let app = build_router(AppState::new(pool, config));
/// # Ok(())
/// # }
/// ```

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use birgedo_shared::auth::authenticator::Authenticator;
use sqlx::PgPool;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Config;
use crate::error::ApiError;
use crate::middleware::{
    auth::{authenticate, require_authenticated, require_room_access},
    csrf::{csrf_protect, require_csrf_token, CSRF_HEADER},
    rate_limit::{rate_limit, RateLimiter},
    security::SecurityHeadersLayer,
};
use crate::routes;

/// Shared application state
///
/// Cloned for each request via Axum's `State` extractor; every field is
/// cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Credential resolution
    pub authenticator: Authenticator,

    /// Application configuration
    pub config: Arc<Config>,

    /// Per-client request limiter
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let authenticator = Authenticator::new(db.clone(), &config.secret);
        let limiter = RateLimiter::new(
            config.limiter_rps,
            config.limiter_burst,
            config.limiter_enabled,
        );

        Self {
            db,
            authenticator,
            config: Arc::new(config),
            limiter,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        self.authenticator.jwt_secret()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                        # Health check (public)
/// └── /v1/
///     ├── POST   /users                  # Register (public)
///     ├── GET    /users                  # Current identity, may be null (public)
///     ├── POST   /tokens/authentication  # Log in (public)
///     ├── PATCH  /users/me               # Update own account
///     ├── DELETE /tokens/authentication  # Log out
///     ├── POST   /room                   # Create room
///     ├── GET    /room/:id               # Room detail (members only)
///     ├── PATCH  /room/:id               # Rename room (members only)
///     ├── POST   /task                   # Create task, assign to members
///     ├── GET    /task/:id               # Toggle own completion
///     ├── POST   /addUser                # Add member
///     ├── POST   /removeUser             # Remove member and their assignments
///     ├── POST   /removeTask             # Remove task from room
///     ├── GET    /myrooms                # Rooms of the current user
///     └── GET    /mytasks                # Tasks of the current user
/// ```
///
/// # Middleware Stack
///
/// Outermost first: panic recovery, tracing, security headers, CORS, rate
/// limiting, authentication, CSRF, then the per-group gates (the toggle route
/// adds a CSRF check that applies to GET as well).
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Reachable anonymously
    let public_routes = Router::new()
        .route(
            "/users",
            post(routes::users::register).get(routes::users::current_user),
        )
        .route(
            "/tokens/authentication",
            post(routes::tokens::create_authentication_token),
        );

    // Rooms addressed by path: membership checked before the handler
    let room_routes = Router::new()
        .route(
            "/room/:id",
            get(routes::rooms::show_room).patch(routes::rooms::update_room),
        )
        .route_layer(from_fn_with_state(state.clone(), require_room_access));

    // Toggling changes state on GET, so the CSRF check ignores the method
    let toggle_routes = Router::new()
        .route("/task/:id", get(routes::tasks::toggle_task))
        .route_layer(from_fn(require_csrf_token));

    let user_routes = Router::new()
        .route("/users/me", patch(routes::users::update_current_user))
        .route(
            "/tokens/authentication",
            axum::routing::delete(routes::tokens::delete_authentication_tokens),
        )
        .route("/room", post(routes::rooms::create_room))
        .route("/task", post(routes::tasks::create_task))
        .route("/addUser", post(routes::memberships::add_user))
        .route("/removeUser", post(routes::memberships::remove_user))
        .route("/removeTask", post(routes::tasks::remove_task))
        .route("/myrooms", get(routes::rooms::list_my_rooms))
        .route("/mytasks", get(routes::tasks::list_my_tasks))
        .merge(room_routes)
        .merge(toggle_routes)
        .route_layer(from_fn(require_authenticated));

    let v1_routes = Router::new().merge(public_routes).merge(user_routes);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .fallback(routes::not_found)
        .layer(from_fn(csrf_protect))
        .layer(from_fn_with_state(state.clone(), authenticate))
        .layer(from_fn_with_state(state.clone(), rate_limit))
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.is_production()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        user_id = tracing::field::Empty,
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// Configures CORS from the trusted origin list
fn cors_layer(config: &Config) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers = [
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        HeaderName::from_static(CSRF_HEADER),
    ];

    match config.cors_origin_list() {
        // Any origin: no cookies, so bearer tokens only
        None => CorsLayer::new()
            .allow_origin(AnyOrigin)
            .allow_methods(methods)
            .allow_headers(headers),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(methods)
                .allow_headers(headers)
                .allow_credentials(true)
                .max_age(Duration::from_secs(3600))
        }
    }
}

/// Turns a handler panic into a 500 response
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    ApiError::Internal(format!("handler panicked: {message}")).into_response()
}
