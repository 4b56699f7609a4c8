//! Cached repository decorators.
//!
//! This module provides decorator implementations that wrap repository traits
//! with caching behavior. The decorators implement the cache-aside pattern:
//!
//! - **Reads**: Check cache first, on miss fetch from repository and populate cache
//! - **Writes**: Persist to repository, invalidate cache, publish events
//!
//! Invalidation happens before a write returns, so a caller that reads right
//! after its own write never sees the old value. Cache failures only log.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let repo = Arc::new(SqliteRepository::new("propdesk.db").await?);
//! let cache = Arc::new(MemoryCache::new(10_000)?);
//!
//! let properties = CachedPropertyRepository::new(repo, cache, Duration::from_secs(300));
//! ```

mod floor_plan;
mod lease;
mod occupancy;
mod property;
mod user;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use propdesk_core::cache::{deserialize, serialize, Cache};
use propdesk_core::storage::Result;

pub use floor_plan::CachedFloorPlanRepository;
pub use lease::CachedLeaseRepository;
pub use occupancy::CachedOccupancyRepository;
pub use property::CachedPropertyRepository;
pub use user::CachedUserRepository;

/// Look-aside plumbing shared by the decorators.
struct LookAside<C: Cache> {
    cache: Arc<C>,
    ttl: Duration,
}

impl<C: Cache> LookAside<C> {
    fn new(cache: Arc<C>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Returns the cached value under `key` if it decodes.
    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match deserialize(&bytes) {
                Ok(value) => {
                    tracing::trace!(%key, "Cache hit");
                    Some(value)
                }
                Err(err) => {
                    // Deserialization failed - treat as cache miss
                    tracing::warn!(%key, error = %err, "Cache entry deserialization failed");
                    None
                }
            },
            Ok(None) => {
                tracing::trace!(%key, "Cache miss");
                None
            }
            Err(err) => {
                tracing::warn!(%key, error = %err, "Cache read failed");
                None
            }
        }
    }

    async fn store<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serialize(value) {
            Ok(bytes) => {
                if let Err(err) = self.cache.set(key, &bytes, Some(self.ttl)).await {
                    tracing::warn!(%key, error = %err, "Failed to populate cache");
                }
            }
            Err(err) => tracing::warn!(%key, error = %err, "Failed to serialize cache value"),
        }
    }

    /// Read-through for a single record. Absent records are not cached.
    async fn record<T, F, Fut>(&self, key: String, load: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        if let Some(value) = self.lookup(&key).await {
            return Ok(Some(value));
        }
        let loaded = load().await?;
        if let Some(value) = &loaded {
            self.store(&key, value).await;
        }
        Ok(loaded)
    }

    /// Read-through for a listing or aggregate.
    async fn value<T, F, Fut>(&self, key: String, load: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.lookup(&key).await {
            return Ok(value);
        }
        let loaded = load().await?;
        self.store(&key, &loaded).await;
        Ok(loaded)
    }

    async fn invalidate(&self, key: &str) {
        if let Err(err) = self.cache.delete(key).await {
            tracing::warn!(%key, error = %err, "Failed to invalidate cache key");
        }
    }

    async fn invalidate_pattern(&self, pattern: &str) {
        if let Err(err) = self.cache.delete_pattern(pattern).await {
            tracing::warn!(%pattern, error = %err, "Failed to invalidate cache pattern");
        }
    }
}
