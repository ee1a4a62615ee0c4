use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::errors::SessionCacheError;
use crate::auth::models::TokenId;
use crate::auth::ports::SessionCache;
use crate::domain::user::models::UserId;

const KEY_PREFIX: &str = "session:";

/// Value stored under `session:{jti}`.
#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

/// Redis-backed session cache. Expiry is enforced by Redis through `PSETEX`.
#[derive(Clone)]
pub struct RedisSessionCache {
    conn: ConnectionManager,
}

impl fmt::Debug for RedisSessionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSessionCache")
            .field("connection", &"ConnectionManager")
            .finish()
    }
}

impl RedisSessionCache {
    /// Connect to Redis.
    ///
    /// # Errors
    /// * `Unavailable` - URL is invalid or the server cannot be reached
    pub async fn new(redis_url: &str) -> Result<Self, SessionCacheError> {
        tracing::info!(cache = "redis", "Connecting to session cache");

        let client = redis::Client::open(redis_url).map_err(|e| {
            SessionCacheError::Unavailable(format!("Failed to create Redis client: {e}"))
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            SessionCacheError::Unavailable(format!("Failed to connect to Redis: {e}"))
        })?;

        tracing::info!(cache = "redis", "Session cache connected");

        Ok(Self { conn })
    }

    fn key(token_id: &TokenId) -> String {
        format!("{}{}", KEY_PREFIX, token_id)
    }
}

/// Milliseconds for `PSETEX`: rounded down so the record never outlives the
/// token, at least one.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn put(
        &self,
        token_id: &TokenId,
        user_id: &UserId,
        ttl: Duration,
    ) -> Result<(), SessionCacheError> {
        let key = Self::key(token_id);
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl)
                .map_err(|e| SessionCacheError::Serialization(e.to_string()))?;
        let record = serde_json::to_string(&SessionRecord {
            user_id: user_id.0,
            expires_at,
        })
        .map_err(|e| SessionCacheError::Serialization(e.to_string()))?;

        let mut conn = self.conn.clone();
        conn.pset_ex::<_, _, ()>(&key, record, ttl_millis(ttl))
            .await
            .map_err(|e| SessionCacheError::Unavailable(format!("Redis PSETEX failed: {e}")))?;

        tracing::debug!(token_id = %token_id, ttl_ms = ttl_millis(ttl), "Session stored");
        Ok(())
    }

    async fn get(&self, token_id: &TokenId) -> Result<Option<UserId>, SessionCacheError> {
        let key = Self::key(token_id);

        let mut conn = self.conn.clone();
        let data: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| SessionCacheError::Unavailable(format!("Redis GET failed: {e}")))?;

        match data {
            Some(json) => {
                let record: SessionRecord = serde_json::from_str(&json)
                    .map_err(|e| SessionCacheError::Serialization(e.to_string()))?;
                Ok(Some(UserId(record.user_id)))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, token_id: &TokenId) -> Result<bool, SessionCacheError> {
        let key = Self::key(token_id);

        let mut conn = self.conn.clone();
        let removed: u64 = conn
            .del(&key)
            .await
            .map_err(|e| SessionCacheError::Unavailable(format!("Redis DEL failed: {e}")))?;

        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_never_exceeds_requested_lifetime() {
        assert_eq!(ttl_millis(Duration::from_secs(30)), 30_000);
        assert_eq!(ttl_millis(Duration::from_millis(30_500)), 30_500);
        assert_eq!(ttl_millis(Duration::from_micros(30_500_900)), 30_500);
        assert_eq!(ttl_millis(Duration::from_micros(400)), 1);
        assert_eq!(ttl_millis(Duration::ZERO), 1);
    }

    #[test]
    fn test_key_is_prefixed() {
        assert_eq!(
            RedisSessionCache::key(&TokenId::new("abc")),
            "session:abc"
        );
    }

    // Requires a running Redis (REDIS_URL, default redis://localhost:6379)
    #[tokio::test]
    #[ignore]
    async fn test_redis_session_lifecycle() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let cache = RedisSessionCache::new(&url).await.unwrap();

        let token_id = TokenId::new(Uuid::new_v4().to_string());
        let user_id = UserId::new();

        cache
            .put(&token_id, &user_id, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get(&token_id).await.unwrap(), Some(user_id));

        assert!(cache.delete(&token_id).await.unwrap());
        assert!(!cache.delete(&token_id).await.unwrap());
        assert_eq!(cache.get(&token_id).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore]
    async fn test_redis_session_expires() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let cache = RedisSessionCache::new(&url).await.unwrap();

        let token_id = TokenId::new(Uuid::new_v4().to_string());
        cache
            .put(&token_id, &UserId::new(), Duration::from_secs(1))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert_eq!(cache.get(&token_id).await.unwrap(), None);
    }
}
