use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use propdesk_core::domain::{validate_lease, CreateLeaseRequest, Lease, Record, UpdateLeaseRequest};
use propdesk_core::storage::{
    LeaseFilter, LeaseRepository, Paginated, PropertyRepository, UserRepository,
};

use super::{check_property, check_user, expected_version, found, writable, Actor, Result};

#[derive(Clone)]
pub struct LeaseService {
    leases: Arc<dyn LeaseRepository>,
    properties: Arc<dyn PropertyRepository>,
    users: Arc<dyn UserRepository>,
}

impl LeaseService {
    pub fn new(
        leases: Arc<dyn LeaseRepository>,
        properties: Arc<dyn PropertyRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            leases,
            properties,
            users,
        }
    }

    pub async fn create(&self, request: CreateLeaseRequest, actor: Actor) -> Result<Lease> {
        let lease = request.into_lease(actor.id(), Utc::now());

        let mut errors = validate_lease(&lease).err().unwrap_or_default();
        check_property(&*self.properties, &mut errors, "property_id", lease.property_id).await?;
        check_user(&*self.users, &mut errors, "tenant_id", lease.tenant_id).await?;
        errors.into_result()?;

        self.leases.create_lease(&lease).await?;

        tracing::info!(
            lease_id = %lease.id,
            property_id = %lease.property_id,
            tenant_id = %lease.tenant_id,
            "Created lease"
        );
        Ok(lease)
    }

    pub async fn get(&self, id: Uuid) -> Result<Lease> {
        found(id, self.leases.get_lease(id).await?)
    }

    pub async fn list(&self, filter: &LeaseFilter) -> Result<Paginated<Lease>> {
        Ok(self.leases.list_leases(filter).await?)
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateLeaseRequest,
        if_match: Option<i64>,
        actor: Actor,
    ) -> Result<Lease> {
        let expected = expected_version(Lease::ENTITY, if_match, request.version)?;
        let mut lease = writable(id, self.leases.load_lease_for_update(id).await?, expected)?;

        request.apply(&mut lease)?;
        validate_lease(&lease)?;
        lease.audit.touch(actor.id(), Utc::now());
        lease.version = expected + 1;

        self.leases.update_lease(&lease, expected).await?;

        tracing::info!(lease_id = %id, status = %lease.status, version = lease.version, "Updated lease");
        Ok(lease)
    }

    pub async fn archive(&self, id: Uuid, if_match: Option<i64>, actor: Actor) -> Result<Lease> {
        let lease = self
            .leases
            .archive_lease(id, actor.id(), Utc::now(), if_match)
            .await?;

        tracing::info!(lease_id = %id, "Archived lease");
        Ok(lease)
    }
}
