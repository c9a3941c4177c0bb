//! Generic async TTL cache, backing the two in-process KV stores this
//! service needs: the access-oracle membership cache
//! (`services::access::CachedAccessOracle`) and the single-use download-token
//! store (`services::token_service::TokenService`). Both only ever get, set
//! with a TTL, and delete by key, so that's the entire surface kept here.

use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A cache entry with optional expiration time.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    /// The cached value
    value: V,
    /// Optional expiration timestamp (None means no expiration)
    expires_at: Option<DateTime<Utc>>,
}

impl<V> CacheEntry<V> {
    /// Create a new cache entry without expiration.
    fn new(value: V) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Create a new cache entry with expiration.
    fn with_expiration(value: V, ttl_seconds: i64) -> Self {
        Self {
            value,
            expires_at: Some(Utc::now() + Duration::seconds(ttl_seconds)),
        }
    }

    /// Check if the entry has expired.
    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| exp < Utc::now())
            .unwrap_or(false)
    }
}

/// Cache configuration options.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Background cleanup interval in seconds (default: 60)
    pub cleanup_interval_seconds: u64,
    /// Default TTL in seconds for entries (None means no expiration)
    pub default_ttl_seconds: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_seconds: 60,
            default_ttl_seconds: None,
        }
    }
}

/// Local backend implementation using DashMap.
#[derive(Debug)]
pub struct LocalBackend<V> {
    /// Thread-safe storage for cache entries
    storage: Arc<DashMap<String, CacheEntry<V>>>,
    /// Background cleanup task handle
    cleanup_task: Option<JoinHandle<()>>,
    /// Cache configuration
    config: CacheConfig,
}

impl<V> LocalBackend<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + Clone + 'static,
{
    /// Create a new local backend with the given configuration.
    fn new(config: CacheConfig) -> Self {
        let storage = Arc::new(DashMap::new());
        let cleanup_task = Some(Self::spawn_cleanup_task(
            Arc::clone(&storage),
            config.cleanup_interval_seconds,
        ));

        Self {
            storage,
            cleanup_task,
            config,
        }
    }

    /// Spawn a background task to clean up expired entries.
    fn spawn_cleanup_task(
        storage: Arc<DashMap<String, CacheEntry<V>>>,
        interval_seconds: u64,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds));
            loop {
                interval.tick().await;
                let now = Utc::now();
                storage.retain(|_, entry| {
                    entry
                        .expires_at
                        .map(|exp| exp > now)
                        .unwrap_or(true)
                });
            }
        })
    }

    /// Get a value by key (returns None if key doesn't exist or is expired).
    async fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.storage.get(key) {
            if !entry.is_expired() {
                return Some(entry.value.clone());
            }
        }
        None
    }

    /// Set a value without expiration.
    async fn set(&self, key: &str, value: V) {
        let entry = if let Some(default_ttl) = self.config.default_ttl_seconds {
            CacheEntry::with_expiration(value, default_ttl as i64)
        } else {
            CacheEntry::new(value)
        };
        self.storage.insert(key.to_string(), entry);
    }

    /// Set a value with expiration in seconds.
    async fn set_ex(&self, key: &str, value: V, ttl_seconds: u64) {
        let entry = CacheEntry::with_expiration(value, ttl_seconds as i64);
        self.storage.insert(key.to_string(), entry);
    }

    /// Delete a key (returns true if key existed).
    async fn delete(&self, key: &str) -> bool {
        self.storage.remove(key).is_some()
    }
}

impl<V> Drop for LocalBackend<V> {
    fn drop(&mut self) {
        // Abort the cleanup task when the backend is dropped
        if let Some(task) = self.cleanup_task.take() {
            task.abort();
        }
    }
}

/// Wraps a `LocalBackend`. Only one variant exists; the enum shape keeps the
/// membership cache and the token store swappable onto a shared-process
/// backend later without changing either call site.
///
/// # Example
/// ```rust
/// use filevault::cache::Cache;
///
/// // Create a local cache
/// let cache: Cache<String> = Cache::new_local(Default::default());
/// ```
#[derive(Debug)]
pub enum Cache<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Local in-memory cache using DashMap
    LocalCache(LocalBackend<V>),
}

impl<V> Cache<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + Clone + 'static,
{
    /// Create a new local cache with the given configuration.
    ///
    /// # Arguments
    /// * `config` - Cache configuration options
    ///
    /// # Example
    /// ```rust
    /// use filevault::cache::{Cache, CacheConfig};
    ///
    /// let cache: Cache<String> = Cache::new_local(CacheConfig::default());
    /// ```
    pub fn new_local(config: CacheConfig) -> Self {
        Self::LocalCache(LocalBackend::new(config))
    }

    /// Get a value by key.
    ///
    /// # Arguments
    /// * `key` - The key to retrieve
    ///
    /// # Returns
    /// * `Ok(Some(value))` if key exists and is not expired
    /// * `Ok(None)` if key doesn't exist or is expired
    pub async fn get(&self, key: &str) -> Result<Option<V>> {
        match self {
            Self::LocalCache(backend) => Ok(backend.get(key).await),
        }
    }

    /// Set a value without expiration (or with default TTL if configured).
    ///
    /// # Arguments
    /// * `key` - The key to set
    /// * `value` - The value to store
    pub async fn set(&self, key: &str, value: V) -> Result<()> {
        match self {
            Self::LocalCache(backend) => {
                backend.set(key, value).await;
                Ok(())
            }
        }
    }

    /// Set a value with expiration in seconds.
    ///
    /// # Arguments
    /// * `key` - The key to set
    /// * `value` - The value to store
    /// * `ttl_seconds` - Time to live in seconds
    pub async fn set_ex(&self, key: &str, value: V, ttl_seconds: u64) -> Result<()> {
        match self {
            Self::LocalCache(backend) => {
                backend.set_ex(key, value, ttl_seconds).await;
                Ok(())
            }
        }
    }

    /// Delete a key.
    ///
    /// # Arguments
    /// * `key` - The key to delete
    ///
    /// # Returns
    /// * `Ok(true)` if key existed and was deleted
    /// * `Ok(false)` if key didn't exist
    pub async fn delete(&self, key: &str) -> Result<bool> {
        match self {
            Self::LocalCache(backend) => Ok(backend.delete(key).await),
        }
    }
}

// Implement Clone for Cache (shallow clone via Arc)
impl<V> Clone for Cache<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        match self {
            // Note: LocalBackend stores Arc<DashMap>, so cloning is cheap
            // We don't implement Clone on LocalBackend directly to avoid
            // accidentally cloning the cleanup task
            Self::LocalCache(backend) => {
                // Create a new LocalBackend that shares the same storage
                // but doesn't have its own cleanup task
                let storage = Arc::clone(&backend.storage);
                let config = backend.config.clone();

                // Create a new backend without cleanup task (shared storage)
                // This is safe because the original backend's cleanup task
                // will clean up entries for all shared references
                Self::LocalCache(LocalBackend {
                    storage,
                    cleanup_task: None,
                    config,
                })
            }
        }
    }
}
