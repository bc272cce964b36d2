//! Redis cache module for the PES trophy tracker
//!
//! This module provides functionality for connecting to Redis and performing
//! the cache operations the services rely on: time-boxed response caching,
//! prefix invalidation and session bookkeeping.

use anyhow::Result;
use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};
use tracing::info;

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> Result<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        Ok(RedisConfig { url })
    }
}

/// Redis connection handle, cheap to clone
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    /// Initialize a new Redis client
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.clone())?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool { client })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }

    /// Set a key-value pair in Redis with optional TTL
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let mut conn = self.get_connection().await?;

        if let Some(ttl) = ttl_seconds {
            let _: () = conn.set_ex(key, value, ttl).await?;
        } else {
            let _: () = conn.set(key, value).await?;
        }

        Ok(())
    }

    /// Get a value from Redis by key
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    /// Store a value as JSON
    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: Option<u64>,
    ) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw, ttl_seconds).await
    }

    /// Read a JSON value; entries that no longer deserialize count as a miss
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get(key).await? else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&raw).ok())
    }

    /// Delete a key from Redis
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let _: u64 = conn.del(key).await?;
        Ok(())
    }

    /// Delete every key starting with `prefix`, returning how many were removed
    pub async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut conn = self.get_connection().await?;
        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        let mut removed = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let n: u64 = conn.del(&keys).await?;
                removed += n;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn local_config() -> RedisConfig {
        RedisConfig {
            url: "redis://localhost:6379".to_string(),
        }
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_redis_connection() -> Result<()> {
        let pool = RedisPool::new(&local_config()).await?;
        assert!(pool.health_check().await?);
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_set_get_delete() -> Result<()> {
        let pool = RedisPool::new(&local_config()).await?;

        let key = "test_key";
        pool.set(key, "test_value", Some(5)).await?;
        assert_eq!(pool.get(key).await?, Some("test_value".to_string()));

        pool.delete(key).await?;
        assert_eq!(pool.get(key).await?, None);

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_json_roundtrip_and_prefix_delete() -> Result<()> {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Row {
            name: String,
            total: i64,
        }

        let pool = RedisPool::new(&local_config()).await?;
        let row = Row {
            name: "Aes".into(),
            total: 3,
        };
        pool.set_json("cachetest:a", &row, Some(5)).await?;
        pool.set("cachetest:b", "x", Some(5)).await?;

        let back: Option<Row> = pool.get_json("cachetest:a").await?;
        assert_eq!(back, Some(row));

        assert_eq!(pool.delete_prefix("cachetest:").await?, 2);
        assert_eq!(pool.get("cachetest:b").await?, None);
        Ok(())
    }
}
