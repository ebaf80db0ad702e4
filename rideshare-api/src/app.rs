//! Application state and router builder
//!
//! # Example
//!
//! ```no_run
//! use rideshare_api::{app::{build_router, AppState}, config::Config};
//! use rideshare_shared::cache::InMemoryCountCache;
//! use sqlx::PgPool;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let pool = PgPool::connect(&config.database.url).await?;
//! let state = AppState::new(pool, config, Arc::new(InMemoryCountCache::new()));
//! let app = build_router(state);
//! # Ok(())
//! # }
//! ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, MethodRouter},
    Router,
};
use rideshare_shared::{
    auth::{authorization::admin_only_middleware, middleware::token_auth_middleware},
    cache::CountCache,
};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Pagination count cache (Redis or in-process)
    pub count_cache: Arc<dyn CountCache>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, count_cache: Arc<dyn CountCache>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            count_cache,
        }
    }

    /// Age limit for "recent" ride events
    pub fn event_window(&self) -> chrono::Duration {
        self.config.events.window
    }

    /// Lifetime of a cached pagination count
    pub fn count_ttl(&self) -> Duration {
        self.config.cache.count_ttl
    }
}

/// Registers `path` both with and without a trailing slash
fn route_both(router: Router<AppState>, path: &str, handler: MethodRouter<AppState>) -> Router<AppState> {
    router
        .route(path, handler.clone())
        .route(&format!("{}/", path), handler)
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// └── /api/
///     ├── POST /auth/login             # Obtain a token (public)
///     ├── /users, /users/:id           # Admin only
///     ├── /rides, /rides/:id           # Admin only
///     └── /ride-events, /ride-events/:id  # Admin only
/// ```
///
/// Every path also answers with a trailing slash.
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, request tracing. Resource routes
/// additionally run token authentication and then the admin check.
pub fn build_router(state: AppState) -> Router {
    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let auth_routes = route_both(Router::new(), "/auth/login", post(routes::auth::login));

    // Resource routes (token auth + admin role)
    let mut resource_routes = Router::new();
    resource_routes = route_both(
        resource_routes,
        "/users",
        get(routes::users::list_users).post(routes::users::create_user),
    );
    resource_routes = route_both(
        resource_routes,
        "/users/:id",
        get(routes::users::get_user)
            .put(routes::users::replace_user)
            .patch(routes::users::patch_user)
            .delete(routes::users::delete_user),
    );
    resource_routes = route_both(
        resource_routes,
        "/rides",
        get(routes::rides::list_rides).post(routes::rides::create_ride),
    );
    resource_routes = route_both(
        resource_routes,
        "/rides/:id",
        get(routes::rides::get_ride)
            .put(routes::rides::replace_ride)
            .patch(routes::rides::patch_ride)
            .delete(routes::rides::delete_ride),
    );
    resource_routes = route_both(
        resource_routes,
        "/ride-events",
        get(routes::ride_events::list_ride_events).post(routes::ride_events::create_ride_event),
    );
    resource_routes = route_both(
        resource_routes,
        "/ride-events/:id",
        get(routes::ride_events::get_ride_event)
            .put(routes::ride_events::replace_ride_event)
            .patch(routes::ride_events::patch_ride_event)
            .delete(routes::ride_events::delete_ride_event),
    );

    let resource_routes = resource_routes
        .route_layer(from_fn(admin_only_middleware))
        .route_layer(from_fn_with_state(state.db.clone(), token_auth_middleware));

    let api_routes = Router::new().merge(auth_routes).merge(resource_routes);

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
