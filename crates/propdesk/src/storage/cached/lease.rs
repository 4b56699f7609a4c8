//! Cached lease repository decorator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use propdesk_core::cache::{
    lease_key, lease_list_key, property_leases_pattern, tenant_leases_pattern, Cache,
};
use propdesk_core::domain::Lease;
use propdesk_core::storage::{LeaseFilter, LeaseRepository, Paginated, Result};

use super::LookAside;

/// Cached lease repository decorator.
///
/// A lease is listed under both its property and its tenant, so every write
/// drops the listings of both scopes.
pub struct CachedLeaseRepository<R, C>
where
    R: LeaseRepository,
    C: Cache,
{
    repository: Arc<R>,
    cache: LookAside<C>,
}

impl<R, C> CachedLeaseRepository<R, C>
where
    R: LeaseRepository,
    C: Cache,
{
    pub fn new(repository: Arc<R>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            repository,
            cache: LookAside::new(cache, ttl),
        }
    }

    async fn invalidate(&self, lease: &Lease) {
        self.cache.invalidate(&lease_key(lease.id)).await;
        self.cache
            .invalidate_pattern(&property_leases_pattern(lease.property_id))
            .await;
        self.cache
            .invalidate_pattern(&tenant_leases_pattern(lease.tenant_id))
            .await;
    }
}

#[async_trait]
impl<R, C> LeaseRepository for CachedLeaseRepository<R, C>
where
    R: LeaseRepository + 'static,
    C: Cache + 'static,
{
    async fn get_lease(&self, id: Uuid) -> Result<Option<Lease>> {
        self.cache
            .record(lease_key(id), || self.repository.get_lease(id))
            .await
    }

    async fn load_lease_for_update(&self, id: Uuid) -> Result<Option<Lease>> {
        self.repository.get_lease(id).await
    }

    async fn list_leases(&self, filter: &LeaseFilter) -> Result<Paginated<Lease>> {
        let key = lease_list_key(filter.scope, &filter.cache_fragment());
        self.cache
            .value(key, || self.repository.list_leases(filter))
            .await
    }

    async fn create_lease(&self, lease: &Lease) -> Result<()> {
        self.repository.create_lease(lease).await?;
        self.invalidate(lease).await;

        tracing::debug!(lease_id = %lease.id, property_id = %lease.property_id, "Lease created");
        Ok(())
    }

    async fn update_lease(&self, lease: &Lease, expected_version: i64) -> Result<()> {
        self.repository.update_lease(lease, expected_version).await?;
        self.invalidate(lease).await;

        tracing::debug!(lease_id = %lease.id, version = lease.version, "Lease updated");
        Ok(())
    }

    async fn archive_lease(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<Lease> {
        let lease = self
            .repository
            .archive_lease(id, actor, at, expected_version)
            .await?;
        self.invalidate(&lease).await;

        tracing::debug!(lease_id = %id, "Lease archived");
        Ok(lease)
    }
}
