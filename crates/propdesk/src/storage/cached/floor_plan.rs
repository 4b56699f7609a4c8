//! Cached floor plan repository decorator.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use propdesk_core::cache::{
    floor_plan_key, property_floor_plans_key, property_floor_plans_pattern, Cache,
};
use propdesk_core::domain::FloorPlan;
use propdesk_core::storage::{FloorPlanFilter, FloorPlanRepository, Paginated, Result};

use super::LookAside;

/// Cached floor plan repository decorator.
///
/// Listings are cached per property; any write to a plan drops every cached
/// listing of its property.
pub struct CachedFloorPlanRepository<R, C>
where
    R: FloorPlanRepository,
    C: Cache,
{
    repository: Arc<R>,
    cache: LookAside<C>,
}

impl<R, C> CachedFloorPlanRepository<R, C>
where
    R: FloorPlanRepository,
    C: Cache,
{
    pub fn new(repository: Arc<R>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            repository,
            cache: LookAside::new(cache, ttl),
        }
    }

    async fn invalidate_listings(&self, property_id: Uuid) {
        self.cache
            .invalidate_pattern(&property_floor_plans_pattern(property_id))
            .await;
    }
}

#[async_trait]
impl<R, C> FloorPlanRepository for CachedFloorPlanRepository<R, C>
where
    R: FloorPlanRepository + 'static,
    C: Cache + 'static,
{
    async fn get_floor_plan(&self, id: Uuid) -> Result<Option<FloorPlan>> {
        self.cache
            .record(floor_plan_key(id), || self.repository.get_floor_plan(id))
            .await
    }

    async fn load_floor_plan_for_update(&self, id: Uuid) -> Result<Option<FloorPlan>> {
        self.repository.get_floor_plan(id).await
    }

    async fn list_floor_plans(&self, filter: &FloorPlanFilter) -> Result<Paginated<FloorPlan>> {
        let key = property_floor_plans_key(filter.property_id, &filter.cache_fragment());
        self.cache
            .value(key, || self.repository.list_floor_plans(filter))
            .await
    }

    async fn create_floor_plan(&self, plan: &FloorPlan) -> Result<()> {
        self.repository.create_floor_plan(plan).await?;

        self.invalidate_listings(plan.property_id).await;

        tracing::debug!(floor_plan_id = %plan.id, property_id = %plan.property_id, "Floor plan created");
        Ok(())
    }

    async fn create_floor_plans(&self, plans: &[FloorPlan]) -> Result<()> {
        self.repository.create_floor_plans(plans).await?;

        let properties: BTreeSet<Uuid> = plans.iter().map(|p| p.property_id).collect();
        for property_id in properties {
            self.invalidate_listings(property_id).await;
        }

        tracing::debug!(count = plans.len(), "Floor plans created");
        Ok(())
    }

    async fn update_floor_plan(&self, plan: &FloorPlan, expected_version: i64) -> Result<()> {
        self.repository
            .update_floor_plan(plan, expected_version)
            .await?;

        self.cache.invalidate(&floor_plan_key(plan.id)).await;
        self.invalidate_listings(plan.property_id).await;

        tracing::debug!(floor_plan_id = %plan.id, version = plan.version, "Floor plan updated");
        Ok(())
    }

    async fn archive_floor_plan(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> Result<FloorPlan> {
        let plan = self
            .repository
            .archive_floor_plan(id, actor, at, expected_version)
            .await?;

        self.cache.invalidate(&floor_plan_key(id)).await;
        self.invalidate_listings(plan.property_id).await;

        tracing::debug!(floor_plan_id = %id, "Floor plan archived");
        Ok(plan)
    }
}
