//! # Rideshare API Server
//!
//! Admin-only REST API over users, rides and ride events, backed by
//! PostgreSQL with an optional Redis pagination count cache.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/rideshare cargo run -p rideshare-api
//! ```

use std::sync::Arc;

use rideshare_api::{
    app::{build_router, AppState},
    config::Config,
};
use rideshare_shared::{
    cache::{CountCache, InMemoryCountCache, RedisCountCache},
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    redis::{client::sanitize_url, RedisClient, RedisConfig},
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rideshare_api=debug,rideshare_shared=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Rideshare API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    let count_cache = count_cache(config.cache.redis_url.as_deref()).await;
    tracing::info!(
        backend = count_cache.backend(),
        ttl_secs = config.cache.count_ttl.as_secs(),
        "Pagination count cache ready"
    );

    let address = config.bind_address();
    let state = AppState::new(pool.clone(), config, count_cache);
    let app = build_router(state);

    let listener = TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Redis-backed cache when configured and reachable, in-process otherwise
async fn count_cache(redis_url: Option<&str>) -> Arc<dyn CountCache> {
    let Some(url) = redis_url else {
        tracing::info!("REDIS_URL not set, using in-process count cache");
        return Arc::new(InMemoryCountCache::new());
    };

    match RedisClient::new(RedisConfig::from_url(url)).await {
        Ok(client) => Arc::new(RedisCountCache::new(client)),
        Err(e) => {
            tracing::warn!(
                url = %sanitize_url(url),
                error = %e,
                "Redis unavailable, falling back to in-process count cache"
            );
            Arc::new(InMemoryCountCache::new())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
