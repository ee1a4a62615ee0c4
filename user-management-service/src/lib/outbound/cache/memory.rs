use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::auth::errors::SessionCacheError;
use crate::auth::models::TokenId;
use crate::auth::ports::SessionCache;
use crate::domain::user::models::UserId;

#[derive(Debug, Clone, Copy)]
struct Entry {
    user_id: UserId,
    deadline: Instant,
}

/// Process-local session cache for single-instance deployments and tests.
///
/// Entries past their deadline are treated as absent on read and swept on
/// every write.
#[derive(Debug, Default)]
pub struct InMemorySessionCache {
    entries: RwLock<HashMap<TokenId, Entry>>,
}

impl InMemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.deadline > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn put(
        &self,
        token_id: &TokenId,
        user_id: &UserId,
        ttl: Duration,
    ) -> Result<(), SessionCacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        entries.retain(|_, entry| entry.deadline > now);
        entries.insert(
            token_id.clone(),
            Entry {
                user_id: *user_id,
                deadline: now + ttl,
            },
        );

        Ok(())
    }

    async fn get(&self, token_id: &TokenId) -> Result<Option<UserId>, SessionCacheError> {
        let now = Instant::now();
        let entries = self.entries.read().await;

        Ok(entries
            .get(token_id)
            .filter(|entry| entry.deadline > now)
            .map(|entry| entry.user_id))
    }

    async fn delete(&self, token_id: &TokenId) -> Result<bool, SessionCacheError> {
        let now = Instant::now();
        let removed = self.entries.write().await.remove(token_id);

        Ok(removed.is_some_and(|entry| entry.deadline > now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let cache = InMemorySessionCache::new();
        let token_id = TokenId::new("t1");
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
    async fn test_put_overwrites_existing_record() {
        let cache = InMemorySessionCache::new();
        let token_id = TokenId::new("t1");
        let second = UserId::new();

        cache
            .put(&token_id, &UserId::new(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .put(&token_id, &second, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get(&token_id).await.unwrap(), Some(second));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = InMemorySessionCache::new();
        let token_id = TokenId::new("t1");

        cache
            .put(&token_id, &UserId::new(), Duration::from_secs(5))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(cache.get(&token_id).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&token_id).await.unwrap(), None);
        assert!(!cache.delete(&token_id).await.unwrap());
        assert!(cache.is_empty().await);
    }
}
