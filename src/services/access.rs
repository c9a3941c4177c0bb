//! Channel-membership access control: a pure boundary trait plus a
//! TTL-caching decorator so repeated checks for the same (user, channel)
//! pair don't round-trip the chat platform on every request.

use crate::cache::Cache;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait AccessOracle: Send + Sync {
    async fn member_of(&self, user_id: Uuid, channel_id: &str) -> bool;
}

/// Always grants access. Stands in for the external chat-platform oracle
/// until a concrete binding is wired up outside the core.
pub struct AllowAllOracle;

#[async_trait]
impl AccessOracle for AllowAllOracle {
    async fn member_of(&self, _user_id: Uuid, _channel_id: &str) -> bool {
        true
    }
}

pub struct CachedAccessOracle<O: AccessOracle> {
    inner: O,
    cache: Cache<bool>,
}

impl<O: AccessOracle> CachedAccessOracle<O> {
    pub fn new(inner: O, cache: Cache<bool>) -> Self {
        Self { inner, cache }
    }

    fn key(user_id: Uuid, channel_id: &str) -> String {
        format!("member:{}:{}", user_id, channel_id)
    }

    pub async fn member_of(&self, user_id: Uuid, channel_id: &str) -> bool {
        let key = Self::key(user_id, channel_id);
        if let Ok(Some(cached)) = self.cache.get(&key).await {
            return cached;
        }
        let result = self.inner.member_of(user_id, channel_id).await;
        let _ = self.cache.set(&key, result).await;
        result
    }

    pub async fn invalidate(&self, user_id: Uuid, channel_id: &str) {
        let _ = self.cache.delete(&Self::key(user_id, channel_id)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;

    struct CountingOracle {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl AccessOracle for CountingOracle {
        async fn member_of(&self, _user_id: Uuid, _channel_id: &str) -> bool {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            true
        }
    }

    #[tokio::test]
    async fn caches_repeated_lookups() {
        let oracle = CachedAccessOracle::new(
            CountingOracle {
                calls: std::sync::atomic::AtomicUsize::new(0),
            },
            Cache::new_local(CacheConfig::default()),
        );
        let user = Uuid::now_v7();

        assert!(oracle.member_of(user, "C123").await);
        assert!(oracle.member_of(user, "C123").await);
        assert_eq!(oracle.inner.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
