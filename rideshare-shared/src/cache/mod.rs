//! Pagination count cache
//!
//! Counting a filtered ride set is the expensive part of a paginated list, so
//! the total is memoized per filter for a fixed TTL. Two backends implement
//! [`CountCache`]:
//!
//! - [`RedisCountCache`]: shared between API instances (`SET key value EX ttl`)
//! - [`InMemoryCountCache`]: single process, used when Redis isn't configured
//!
//! A cached count can be stale for up to one TTL after rows are inserted or
//! deleted.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod memory;
pub mod redis;

pub use memory::InMemoryCountCache;
pub use self::redis::RedisCountCache;

/// Default count TTL (5 minutes)
pub const DEFAULT_COUNT_TTL: Duration = Duration::from_secs(300);

/// Count cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache operation timed out")]
    Timeout,

    #[error("Corrupt cached value for {key}: {value}")]
    Corrupt { key: String, value: String },
}

/// Storage for cached row counts
#[async_trait]
pub trait CountCache: Send + Sync {
    /// Returns the cached count, or `None` on a miss or after expiry
    async fn get(&self, key: &str) -> Result<Option<i64>, CacheError>;

    /// Stores a count for `ttl`
    async fn set(&self, key: &str, count: i64, ttl: Duration) -> Result<(), CacheError>;

    /// Checks that the backend answers
    ///
    /// In-process backends are always reachable.
    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    /// Backend name for health reporting
    fn backend(&self) -> &'static str;
}
