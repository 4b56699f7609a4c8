//! Cached property repository decorator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use propdesk_core::cache::{
    properties_list_key, properties_list_pattern, property_key, property_scope_pattern, Cache,
};
use propdesk_core::domain::Property;
use propdesk_core::storage::{Paginated, PropertyFilter, PropertyRepository, Result};

use super::LookAside;

/// Cached property repository decorator.
///
/// Archiving a property also drops every listing scoped to it, since its
/// floor plan, lease and occupancy views are no longer served.
///
/// # Type Parameters
///
/// * `R` - The underlying repository implementation
/// * `C` - The cache implementation
pub struct CachedPropertyRepository<R, C>
where
    R: PropertyRepository,
    C: Cache,
{
    repository: Arc<R>,
    cache: LookAside<C>,
}

impl<R, C> CachedPropertyRepository<R, C>
where
    R: PropertyRepository,
    C: Cache,
{
    pub fn new(repository: Arc<R>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            repository,
            cache: LookAside::new(cache, ttl),
        }
    }
}

#[async_trait]
impl<R, C> PropertyRepository for CachedPropertyRepository<R, C>
where
    R: PropertyRepository + 'static,
    C: Cache + 'static,
{
    async fn get_property(&self, id: Uuid) -> Result<Option<Property>> {
        self.cache
            .record(property_key(id), || self.repository.get_property(id))
            .await
    }

    async fn load_property_for_update(&self, id: Uuid) -> Result<Option<Property>> {
        self.repository.get_property(id).await
    }

    async fn list_properties(&self, filter: &PropertyFilter) -> Result<Paginated<Property>> {
        self.cache
            .value(properties_list_key(&filter.cache_fragment()), || {
                self.repository.list_properties(filter)
            })
            .await
    }

    async fn create_property(&self, property: &Property) -> Result<()> {
        self.repository.create_property(property).await?;

        self.cache
            .invalidate_pattern(&properties_list_pattern())
            .await;

        tracing::debug!(property_id = %property.id, "Property created");
        Ok(())
    }

    async fn update_property(&self, property: &Property, expected_version: i64) -> Result<()> {
        self.repository
            .update_property(property, expected_version)
            .await?;

        self.cache.invalidate(&property_key(property.id)).await;
        self.cache
            .invalidate_pattern(&properties_list_pattern())
            .await;

        tracing::debug!(property_id = %property.id, version = property.version, "Property updated");
        Ok(())
    }

    async fn archive_property(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<Property> {
        let property = self
            .repository
            .archive_property(id, actor, at, expected_version)
            .await?;

        self.cache.invalidate(&property_key(id)).await;
        self.cache
            .invalidate_pattern(&properties_list_pattern())
            .await;
        self.cache
            .invalidate_pattern(&property_scope_pattern(id))
            .await;

        tracing::debug!(property_id = %id, "Property archived");
        Ok(property)
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use propdesk_core::cache::{property_floor_plans_key, property_leases_key};
    use propdesk_core::domain::{CreatePropertyRequest, PropertyStatus};

    use crate::storage::cached::test_support::{FailingCache, MockCache};
    use crate::storage::inmemory::InMemoryRepository;

    // Counts reads that reach storage.
    struct CountingRepository {
        inner: InMemoryRepository,
        get_calls: AtomicUsize,
        list_calls: AtomicUsize,
    }

    impl CountingRepository {
        fn new() -> Self {
            Self {
                inner: InMemoryRepository::new(),
                get_calls: AtomicUsize::new(0),
                list_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PropertyRepository for CountingRepository {
        async fn get_property(&self, id: Uuid) -> Result<Option<Property>> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_property(id).await
        }

        async fn list_properties(&self, filter: &PropertyFilter) -> Result<Paginated<Property>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list_properties(filter).await
        }

        async fn create_property(&self, property: &Property) -> Result<()> {
            self.inner.create_property(property).await
        }

        async fn update_property(&self, property: &Property, expected_version: i64) -> Result<()> {
            self.inner.update_property(property, expected_version).await
        }

        async fn archive_property(
            &self,
            id: Uuid,
            actor: Option<Uuid>,
            at: DateTime<Utc>,
            expected_version: Option<i64>,
        ) -> Result<Property> {
            self.inner
                .archive_property(id, actor, at, expected_version)
                .await
        }
    }

    fn property(name: &str) -> Property {
        CreatePropertyRequest::new(name, "1 Harbour St").into_property(None, Utc::now())
    }

    fn setup() -> (
        Arc<CountingRepository>,
        Arc<MockCache>,
        CachedPropertyRepository<CountingRepository, MockCache>,
    ) {
        let repo = Arc::new(CountingRepository::new());
        let cache = Arc::new(MockCache::new());
        let cached =
            CachedPropertyRepository::new(repo.clone(), cache.clone(), Duration::from_secs(300));
        (repo, cache, cached)
    }

    #[tokio::test]
    async fn test_get_property_cache_miss_then_hit() {
        let (repo, cache, cached) = setup();
        let p = property("Dockside");
        repo.inner.create_property(&p).await.unwrap();

        let first = cached.get_property(p.id).await.unwrap();
        assert_eq!(first.as_ref(), Some(&p));
        assert!(cache.contains(&property_key(p.id)).await);

        let second = cached.get_property(p.id).await.unwrap();
        assert_eq!(second, Some(p));
        assert_eq!(repo.get_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_property_is_not_cached() {
        let (repo, cache, cached) = setup();
        let id = Uuid::new_v4();

        assert!(cached.get_property(id).await.unwrap().is_none());
        assert!(cached.get_property(id).await.unwrap().is_none());

        assert!(!cache.contains(&property_key(id)).await);
        assert_eq!(repo.get_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_load_for_update_bypasses_cache() {
        let (repo, _cache, cached) = setup();
        let p = property("Dockside");
        repo.inner.create_property(&p).await.unwrap();

        cached.get_property(p.id).await.unwrap();
        cached.load_property_for_update(p.id).await.unwrap();

        assert_eq!(repo.get_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_create_invalidates_listings() {
        let (repo, _cache, cached) = setup();
        let filter = PropertyFilter::default();

        assert_eq!(cached.list_properties(&filter).await.unwrap().total, 0);
        cached.create_property(&property("Dockside")).await.unwrap();

        let listed = cached.list_properties(&filter).await.unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_update_invalidates_record() {
        let (_repo, cache, cached) = setup();
        let mut p = property("Dockside");
        cached.create_property(&p).await.unwrap();
        cached.get_property(p.id).await.unwrap();

        p.name = "Quayside".to_string();
        p.version = 2;
        cached.update_property(&p, 1).await.unwrap();

        assert!(!cache.contains(&property_key(p.id)).await);
        let fresh = cached.get_property(p.id).await.unwrap().unwrap();
        assert_eq!(fresh.name, "Quayside");
    }

    #[tokio::test]
    async fn test_failed_update_keeps_cache() {
        let (_repo, cache, cached) = setup();
        let mut p = property("Dockside");
        cached.create_property(&p).await.unwrap();
        cached.get_property(p.id).await.unwrap();

        p.version = 2;
        assert!(cached.update_property(&p, 9).await.is_err());

        assert!(cache.contains(&property_key(p.id)).await);
    }

    #[tokio::test]
    async fn test_archive_drops_scoped_listings() {
        let (_repo, cache, cached) = setup();
        let p = property("Dockside");
        cached.create_property(&p).await.unwrap();

        let plans_key = property_floor_plans_key(p.id, "status=any");
        let leases_key = property_leases_key(p.id, "status=any");
        cache.set(&plans_key, b"[]", None).await.unwrap();
        cache.set(&leases_key, b"[]", None).await.unwrap();

        let archived = cached
            .archive_property(p.id, None, Utc::now(), Some(1))
            .await
            .unwrap();

        assert_eq!(archived.status, PropertyStatus::Archived);
        assert!(!cache.contains(&plans_key).await);
        assert!(!cache.contains(&leases_key).await);
    }

    #[tokio::test]
    async fn test_failing_cache_never_fails_requests() {
        let repo = Arc::new(InMemoryRepository::new());
        let cached =
            CachedPropertyRepository::new(repo, Arc::new(FailingCache), Duration::from_secs(300));
        let mut p = property("Dockside");

        cached.create_property(&p).await.unwrap();
        assert_eq!(cached.get_property(p.id).await.unwrap(), Some(p.clone()));

        p.version = 2;
        cached.update_property(&p, 1).await.unwrap();
        cached
            .archive_property(p.id, None, Utc::now(), None)
            .await
            .unwrap();
        assert_eq!(
            cached
                .list_properties(&PropertyFilter::default())
                .await
                .unwrap()
                .total,
            0
        );
    }
}
