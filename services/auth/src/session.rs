//! Refresh-token sessions stored in Redis

use anyhow::Result;
use common::cache::RedisPool;
use tracing::info;
use uuid::Uuid;

/// One live refresh token per user, under `session:{user_id}`
#[derive(Clone)]
pub struct SessionManager {
    redis_pool: RedisPool,
    ttl_seconds: u64,
}

pub fn session_key(user_id: Uuid) -> String {
    format!("session:{}", user_id)
}

impl SessionManager {
    pub fn new(redis_pool: RedisPool, ttl_seconds: u64) -> Self {
        Self {
            redis_pool,
            ttl_seconds,
        }
    }

    /// Store (or replace) the session of a user
    pub async fn store(&self, user_id: Uuid, refresh_token: &str) -> Result<()> {
        info!("Storing session for user: {}", user_id);
        self.redis_pool
            .set(&session_key(user_id), refresh_token, Some(self.ttl_seconds))
            .await
    }

    /// Whether `refresh_token` is the one currently on record
    pub async fn is_current(&self, user_id: Uuid, refresh_token: &str) -> Result<bool> {
        let stored = self.redis_pool.get(&session_key(user_id)).await?;
        Ok(stored.as_deref() == Some(refresh_token))
    }

    pub async fn delete(&self, user_id: Uuid) -> Result<()> {
        info!("Deleting session for user: {}", user_id);
        self.redis_pool.delete(&session_key(user_id)).await
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.redis_pool.health_check().await
    }
}
