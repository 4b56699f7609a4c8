//! Redis cache implementation.
//!
//! Listing keys are tracked in one Redis Set per [`KeyScope`]
//! (`property:{id}:_keys`, `properties:_keys`, ...) so scoped pattern deletion
//! never needs `SCAN`.
//!
//! The multi-command operations here are not atomic. A crash between `DEL`
//! and `SREM` leaves a stale member in a tracking set, which the next pattern
//! deletion removes again; deleting a missing key is a no-op.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use propdesk_core::cache::{pattern_matches, scope_of_key, scope_of_pattern, Cache, Result};

use super::error::map_redis_error;

/// Redis cache backend using a connection manager for pooling.
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Creates a new Redis cache connection.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let result: Option<Vec<u8>> = conn.get(key).await.map_err(map_redis_error)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();

        match ttl {
            Some(duration) => {
                let seconds = duration.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, value, seconds)
                    .await
                    .map_err(map_redis_error)?;
            }
            None => {
                conn.set::<_, _, ()>(key, value)
                    .await
                    .map_err(map_redis_error)?;
            }
        }

        if let Some(scope) = scope_of_key(key) {
            conn.sadd::<_, _, ()>(scope.tracking_key(), key)
                .await
                .map_err(map_redis_error)?;
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();

        if let Some(scope) = scope_of_key(key) {
            conn.srem::<_, _, ()>(scope.tracking_key(), key)
                .await
                .map_err(map_redis_error)?;
        }

        conn.del::<_, ()>(key).await.map_err(map_redis_error)?;

        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let Some(scope) = scope_of_pattern(pattern) else {
            // Only scoped listing keys are tracked.
            tracing::trace!(%pattern, "Ignoring unscoped cache pattern");
            return Ok(());
        };

        let mut conn = self.conn.clone();
        let tracking_key = scope.tracking_key();

        let tracked_keys: Vec<String> = conn
            .smembers(&tracking_key)
            .await
            .map_err(map_redis_error)?;

        let keys_to_delete: Vec<&String> = tracked_keys
            .iter()
            .filter(|k| pattern_matches(pattern, k))
            .collect();

        if !keys_to_delete.is_empty() {
            conn.del::<_, ()>(&keys_to_delete)
                .await
                .map_err(map_redis_error)?;

            conn.srem::<_, _, ()>(&tracking_key, &keys_to_delete)
                .await
                .map_err(map_redis_error)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propdesk_core::cache::{
        occupancy_latest_key, property_floor_plans_key, property_floor_plans_pattern,
        property_key, property_leases_key, property_scope_pattern, KeyScope,
    };
    use uuid::Uuid;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    /// Skip test if Redis not available.
    async fn get_test_cache() -> Option<RedisCache> {
        RedisCache::new(&redis_url()).await.ok()
    }

    fn test_key(suffix: &str) -> String {
        format!("test:redis_cache:{}:{}", Uuid::new_v4(), suffix)
    }

    #[tokio::test]
    async fn test_redis_set_and_get() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let key = test_key("set_get");
        cache.set(&key, b"hello world", None).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(b"hello world".to_vec()));

        cache.delete(&key).await.unwrap();
        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redis_ttl() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let key = test_key("ttl");
        cache
            .set(&key, b"expiring value", Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(cache.get(&key).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redis_delete_pattern_within_scope() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let property_id = Uuid::new_v4();
        let plans_a = property_floor_plans_key(property_id, "limit=50&offset=0");
        let plans_b = property_floor_plans_key(property_id, "limit=10&offset=0");
        let leases = property_leases_key(property_id, "limit=50&offset=0");
        let record = property_key(property_id);

        for key in [&plans_a, &plans_b, &leases, &record] {
            cache.set(key, b"value", None).await.unwrap();
        }

        cache
            .delete_pattern(&property_floor_plans_pattern(property_id))
            .await
            .unwrap();

        assert!(cache.get(&plans_a).await.unwrap().is_none());
        assert!(cache.get(&plans_b).await.unwrap().is_none());
        assert!(cache.get(&leases).await.unwrap().is_some());
        assert!(cache.get(&record).await.unwrap().is_some());

        cache
            .delete_pattern(&property_scope_pattern(property_id))
            .await
            .unwrap();
        cache.delete(&record).await.unwrap();
        assert!(cache.get(&leases).await.unwrap().is_none());

        let mut conn = cache.conn.clone();
        let tracked: Vec<String> = conn
            .smembers(KeyScope::Property(property_id).tracking_key())
            .await
            .unwrap();
        assert!(tracked.is_empty());
    }

    #[tokio::test]
    async fn test_redis_delete_removes_from_tracking() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let property_id = Uuid::new_v4();
        let key = occupancy_latest_key(property_id);
        let tracking_key = KeyScope::Property(property_id).tracking_key();

        cache.set(&key, b"latest", None).await.unwrap();

        let mut conn = cache.conn.clone();
        let tracked: Vec<String> = conn.smembers(&tracking_key).await.unwrap();
        assert!(tracked.contains(&key));

        cache.delete(&key).await.unwrap();

        let tracked_after: Vec<String> = conn.smembers(&tracking_key).await.unwrap();
        assert!(!tracked_after.contains(&key));
    }

    #[tokio::test]
    async fn test_redis_unscoped_pattern_is_noop() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let key = test_key("noop");
        cache.set(&key, b"value", None).await.unwrap();

        cache.delete_pattern("test:*").await.unwrap();

        assert!(cache.get(&key).await.unwrap().is_some());
        cache.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_binary_data() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let key = test_key("binary");
        let value: Vec<u8> = (0..=255).collect();

        cache.set(&key, &value, None).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(value));

        cache.delete(&key).await.unwrap();
    }
}
