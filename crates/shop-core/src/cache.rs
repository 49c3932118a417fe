//! # Cache
//!
//! Key/value cache with a fixed entry TTL, plus the read-through helper the
//! repository decorators in [`cached`](crate::cached) are built on.
//!
//! Values are stored as JSON strings. The cache is an optimization only:
//! a failing or corrupt cache degrades to a direct store read and never
//! fails the caller.

use crate::error::ShopResult;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cache keys, one per entity identity
pub mod keys {
    use crate::order::OrderId;
    use crate::product::{Category, ProductId};
    use crate::UserId;

    pub const PRODUCTS_ALL: &str = "products:all";
    pub const PRODUCTS_FEATURED: &str = "products:featured";

    pub fn product(id: ProductId) -> String {
        format!("product:{}", id)
    }

    pub fn products_by_category(category: Category) -> String {
        format!("products:category:{}", category)
    }

    pub fn cart(user_id: UserId) -> String {
        format!("cart:user:{}", user_id)
    }

    pub fn order(id: OrderId) -> String {
        format!("order:{}", id)
    }

    pub fn user_orders(user_id: UserId) -> String {
        format!("orders:user:{}", user_id)
    }

    pub fn wishlist(user_id: UserId) -> String {
        format!("wishlist:user:{}", user_id)
    }

    pub fn user(user_id: UserId) -> String {
        format!("user:{}", user_id)
    }
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> ShopResult<Option<String>>;

    async fn set(&self, key: &str, value: String) -> ShopResult<()>;

    async fn delete(&self, keys: &[String]) -> ShopResult<()>;
}

pub type SharedCache = Arc<dyn Cache>;

/// Upper bound on resident entries
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// In-process TTL cache backed by `moka`. Expired entries are evicted by
/// moka's housekeeping, not only when their key is read again.
#[derive(Clone)]
pub struct MemoryCache {
    inner: moka::future::Cache<String, String>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(ttl: Duration, max_entries: u64) -> Self {
        let inner = moka::future::Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }

    /// Number of resident entries, after pending evictions have run
    pub async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.inner.get(key).await.is_some()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> ShopResult<Option<String>> {
        Ok(self.inner.get(key).await)
    }

    async fn set(&self, key: &str, value: String) -> ShopResult<()> {
        self.inner.insert(key.to_string(), value).await;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> ShopResult<()> {
        for key in keys {
            self.inner.invalidate(key).await;
        }
        Ok(())
    }
}

/// Cache handle shared by the repository decorators
#[derive(Clone)]
pub struct CacheLayer {
    cache: SharedCache,
}

impl CacheLayer {
    pub fn new(cache: SharedCache) -> Self {
        Self { cache }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(key, "cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(key, error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => {
                debug!(key, "cache miss");
                None
            }
            Err(e) => {
                warn!(key, error = %e, "cache read failed");
                None
            }
        }
    }

    async fn store<T: Serialize + Sync>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "failed to encode cache entry");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, raw).await {
            warn!(key, error = %e, "cache write failed");
        }
    }

    /// Serve `key` from cache, or load it and populate the cache.
    pub async fn read_through<T, F, Fut>(&self, key: &str, load: F) -> ShopResult<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ShopResult<T>> + Send,
    {
        if let Some(value) = self.lookup(key).await {
            return Ok(value);
        }
        let value = load().await?;
        self.store(key, &value).await;
        Ok(value)
    }

    /// Like [`read_through`](Self::read_through), but absent values are
    /// not cached.
    pub async fn read_through_optional<T, F, Fut>(&self, key: &str, load: F) -> ShopResult<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ShopResult<Option<T>>> + Send,
    {
        if let Some(value) = self.lookup(key).await {
            return Ok(Some(value));
        }
        let value = load().await?;
        if let Some(found) = &value {
            self.store(key, found).await;
        }
        Ok(value)
    }

    /// Delete keys; failures are logged and swallowed
    pub async fn invalidate(&self, keys: &[String]) {
        debug!(?keys, "invalidating cache keys");
        if let Err(e) = self.cache.delete(keys).await {
            warn!(?keys, error = %e, "cache invalidation failed");
        }
    }
}
