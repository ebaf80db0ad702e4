//! In-process count cache
//!
//! An expired entry is dropped when it is read, and every `set` sweeps all
//! expired entries so keys that are never read again don't pile up. Expiry
//! uses `tokio::time::Instant`, so tests can drive it with
//! `tokio::time::pause` and `advance`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{CacheError, CountCache};

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: i64,
    expires_at: Instant,
}

/// Count cache held in process memory
#[derive(Debug, Default)]
pub struct InMemoryCountCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until the next sweep
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CountCache for InMemoryCountCache {
    async fn get(&self, key: &str) -> Result<Option<i64>, CacheError> {
        let mut entries = self.entries.lock().await;

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.count)),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, count: i64, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                count,
                expires_at: now + ttl,
            },
        );

        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = InMemoryCountCache::new();

        assert_eq!(cache.get("k").await.unwrap(), None);
        cache.set("k", 42, Duration::from_secs(300)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(42));
        assert_eq!(cache.get("other").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = InMemoryCountCache::new();
        cache.set("k", 7, Duration::from_secs(300)).await.unwrap();

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get("k").await.unwrap(), Some(7));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_sweeps_expired_entries() {
        let cache = InMemoryCountCache::new();
        for i in 0..1000 {
            let key = format!("pagination_count:{}", i);
            cache.set(&key, i, Duration::from_secs(300)).await.unwrap();
        }
        cache.set("long_lived", 1, Duration::from_secs(7200)).await.unwrap();
        assert_eq!(cache.len().await, 1001);

        tokio::time::advance(Duration::from_secs(3600)).await;
        cache.set("fresh", 5, Duration::from_secs(300)).await.unwrap();

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("long_lived").await.unwrap(), Some(1));
        assert_eq!(cache.get("fresh").await.unwrap(), Some(5));
        assert_eq!(cache.get("pagination_count:0").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = InMemoryCountCache::new();
        cache.set("k", 1, Duration::from_secs(60)).await.unwrap();
        cache.set("k", 2, Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(2));
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.backend(), "memory");
        assert!(cache.ping().await.is_ok());
    }
}
