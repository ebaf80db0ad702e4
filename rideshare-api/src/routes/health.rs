//! Health check endpoint
//!
//! ```text
//! GET /health
//! ```
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "database": "connected",
//!   "cache": "redis",
//!   "cache_status": "connected"
//! }
//! ```
//!
//! `status` is `degraded` when the database or the count cache doesn't
//! answer. Lists keep working without the cache, counting in the database.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use rideshare_shared::db::pool::health_check as db_health_check;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    /// Application version
    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,

    /// Count cache backend in use (`redis` or `memory`)
    pub cache: String,

    /// `connected` or `disconnected`
    pub cache_status: String,
}

fn overall_status(database_ok: bool, cache_ok: bool) -> &'static str {
    if database_ok && cache_ok {
        "healthy"
    } else {
        "degraded"
    }
}

fn connection_status(ok: bool) -> &'static str {
    if ok {
        "connected"
    } else {
        "disconnected"
    }
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database_ok = match db_health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check: database unreachable");
            false
        }
    };

    let cache_ok = match state.count_cache.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                backend = state.count_cache.backend(),
                error = %e,
                "Health check: count cache unreachable"
            );
            false
        }
    };

    Ok(Json(HealthResponse {
        status: overall_status(database_ok, cache_ok).to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: connection_status(database_ok).to_string(),
        cache: state.count_cache.backend().to_string(),
        cache_status: connection_status(cache_ok).to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use async_trait::async_trait;
    use rideshare_shared::cache::{CacheError, CountCache};
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use std::time::Duration;

    struct UnreachableCache;

    #[async_trait]
    impl CountCache for UnreachableCache {
        async fn get(&self, _key: &str) -> Result<Option<i64>, CacheError> {
            Err(CacheError::Timeout)
        }

        async fn set(&self, _key: &str, _count: i64, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Timeout)
        }

        async fn ping(&self) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        fn backend(&self) -> &'static str {
            "redis"
        }
    }

    #[test]
    fn test_overall_status() {
        assert_eq!(overall_status(true, true), "healthy");
        assert_eq!(overall_status(true, false), "degraded");
        assert_eq!(overall_status(false, true), "degraded");
    }

    #[tokio::test]
    async fn test_unreachable_cache_is_reported() {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://localhost:1/unused")
            .unwrap();
        let state = AppState::new(pool, test_config(), Arc::new(UnreachableCache));

        let Json(health) = health_check(State(state)).await.unwrap();

        assert_eq!(health.status, "degraded");
        assert_eq!(health.cache, "redis");
        assert_eq!(health.cache_status, "disconnected");
    }
}
