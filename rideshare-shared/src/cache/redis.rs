//! Redis-backed count cache

use async_trait::async_trait;
use std::time::Duration;

use super::{CacheError, CountCache};
use crate::redis::client::{RedisClient, RedisClientError};

/// Count cache shared through Redis
#[derive(Clone)]
pub struct RedisCountCache {
    client: RedisClient,
}

impl RedisCountCache {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, CacheError>
    where
        F: std::future::Future<Output = Result<T, ::redis::RedisError>>,
    {
        tokio::time::timeout(self.client.config().command_timeout(), fut)
            .await
            .map_err(|_| CacheError::Timeout)?
            .map_err(|e| CacheError::Backend(RedisClientError::from(e).to_string()))
    }
}

#[async_trait]
impl CountCache for RedisCountCache {
    async fn get(&self, key: &str) -> Result<Option<i64>, CacheError> {
        let mut conn = self.client.get_connection();

        let value: Option<String> = self
            .with_timeout(::redis::cmd("GET").arg(key).query_async(&mut conn))
            .await?;

        match value {
            None => Ok(None),
            Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| CacheError::Corrupt {
                key: key.to_string(),
                value: raw,
            }),
        }
    }

    async fn set(&self, key: &str, count: i64, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.client.get_connection();
        let seconds = ttl.as_secs().max(1);

        let _: () = self
            .with_timeout(
                ::redis::cmd("SET")
                    .arg(key)
                    .arg(count)
                    .arg("EX")
                    .arg(seconds)
                    .query_async(&mut conn),
            )
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        match self.client.ping().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(CacheError::Backend("Unexpected PING response".to_string())),
            Err(RedisClientError::Timeout(_)) => Err(CacheError::Timeout),
            Err(e) => Err(CacheError::Backend(e.to_string())),
        }
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
