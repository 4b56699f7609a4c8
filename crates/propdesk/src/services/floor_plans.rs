use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use propdesk_core::domain::{
    validate_floor_plan, BulkCreateFloorPlansRequest, CreateFloorPlanRequest, FloorPlan, Record,
    UpdateFloorPlanRequest, ValidationErrors,
};
use propdesk_core::storage::{FloorPlanFilter, FloorPlanRepository, Paginated, PropertyRepository};

use super::{check_batch_size, check_property, expected_version, found, writable, Actor, Result};

#[derive(Clone)]
pub struct FloorPlanService {
    floor_plans: Arc<dyn FloorPlanRepository>,
    properties: Arc<dyn PropertyRepository>,
    max_batch_size: usize,
}

impl FloorPlanService {
    pub fn new(
        floor_plans: Arc<dyn FloorPlanRepository>,
        properties: Arc<dyn PropertyRepository>,
        max_batch_size: usize,
    ) -> Self {
        Self {
            floor_plans,
            properties,
            max_batch_size,
        }
    }

    pub async fn create(&self, request: CreateFloorPlanRequest, actor: Actor) -> Result<FloorPlan> {
        let plan = request.into_floor_plan(actor.id(), Utc::now());

        let mut errors = validate_floor_plan(&plan).err().unwrap_or_default();
        check_property(&*self.properties, &mut errors, "property_id", plan.property_id).await?;
        errors.into_result()?;

        self.floor_plans.create_floor_plan(&plan).await?;

        tracing::info!(
            floor_plan_id = %plan.id,
            property_id = %plan.property_id,
            "Created floor plan"
        );
        Ok(plan)
    }

    /// Creates every plan in the batch or none of them.
    ///
    /// Field errors are reported as `items[i].<field>`.
    pub async fn bulk_create(
        &self,
        request: BulkCreateFloorPlansRequest,
        actor: Actor,
    ) -> Result<Vec<FloorPlan>> {
        check_batch_size("items", request.items.len(), self.max_batch_size)?;

        let now = Utc::now();
        let plans: Vec<FloorPlan> = request
            .items
            .into_iter()
            .map(|item| item.into_floor_plan(actor.id(), now))
            .collect();

        let mut errors = ValidationErrors::new();
        // One lookup per distinct property; the verdict is reused per item.
        let mut parents: HashMap<Uuid, ValidationErrors> = HashMap::new();
        for (index, plan) in plans.iter().enumerate() {
            let prefix = format!("items[{index}]");
            if let Err(item_errors) = validate_floor_plan(plan) {
                errors.extend_prefixed(&prefix, item_errors);
            }
            if !parents.contains_key(&plan.property_id) {
                let mut parent = ValidationErrors::new();
                check_property(&*self.properties, &mut parent, "property_id", plan.property_id)
                    .await?;
                parents.insert(plan.property_id, parent);
            }
            if let Some(parent) = parents.get(&plan.property_id) {
                errors.extend_prefixed(&prefix, parent.clone());
            }
        }
        errors.into_result()?;

        self.floor_plans.create_floor_plans(&plans).await?;

        tracing::info!(count = plans.len(), "Created floor plans in bulk");
        Ok(plans)
    }

    pub async fn get(&self, id: Uuid) -> Result<FloorPlan> {
        found(id, self.floor_plans.get_floor_plan(id).await?)
    }

    pub async fn list(&self, filter: &FloorPlanFilter) -> Result<Paginated<FloorPlan>> {
        Ok(self.floor_plans.list_floor_plans(filter).await?)
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateFloorPlanRequest,
        if_match: Option<i64>,
        actor: Actor,
    ) -> Result<FloorPlan> {
        let expected = expected_version(FloorPlan::ENTITY, if_match, request.version)?;
        let mut plan = writable(
            id,
            self.floor_plans.load_floor_plan_for_update(id).await?,
            expected,
        )?;

        request.apply(&mut plan)?;
        validate_floor_plan(&plan)?;
        plan.audit.touch(actor.id(), Utc::now());
        plan.version = expected + 1;

        self.floor_plans.update_floor_plan(&plan, expected).await?;

        tracing::info!(floor_plan_id = %id, version = plan.version, "Updated floor plan");
        Ok(plan)
    }

    pub async fn archive(&self, id: Uuid, if_match: Option<i64>, actor: Actor) -> Result<FloorPlan> {
        let plan = self
            .floor_plans
            .archive_floor_plan(id, actor.id(), Utc::now(), if_match)
            .await?;

        tracing::info!(floor_plan_id = %id, "Archived floor plan");
        Ok(plan)
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use propdesk_core::domain::{CreatePropertyRequest, Property};

    use crate::services::ServiceError;
    use crate::storage::InMemoryRepository;

    async fn setup(max_batch_size: usize) -> (Arc<InMemoryRepository>, FloorPlanService, Property) {
        let repo = Arc::new(InMemoryRepository::new());
        let property =
            CreatePropertyRequest::new("Dockside", "1 Quay").into_property(None, Utc::now());
        repo.create_property(&property).await.unwrap();
        let service = FloorPlanService::new(repo.clone(), repo.clone(), max_batch_size);
        (repo, service, property)
    }

    fn item(property_id: Uuid, floor: i32) -> CreateFloorPlanRequest {
        CreateFloorPlanRequest::new(property_id, format!("Level {floor}"), floor, 30.0, 20.0)
    }

    #[tokio::test]
    async fn test_create_derives_area() {
        let (_repo, service, property) = setup(10).await;

        let plan = service
            .create(item(property.id, 2).with_capacity(40), Actor::anonymous())
            .await
            .unwrap();

        assert_eq!(plan.area_sqm, 600.0);
        assert_eq!(plan.capacity, Some(40));
        assert_eq!(plan.version, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_missing_and_archived_property() {
        let (repo, service, property) = setup(10).await;

        let missing = service
            .create(item(Uuid::new_v4(), 1), Actor::anonymous())
            .await;
        let Err(ServiceError::Validation(errors)) = missing else {
            panic!("expected validation errors");
        };
        assert!(errors.has_field("property_id"));

        repo.archive_property(property.id, None, Utc::now(), None)
            .await
            .unwrap();
        let archived = service.create(item(property.id, 1), Actor::anonymous()).await;
        assert!(matches!(archived, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_collects_dimension_errors() {
        let (_repo, service, property) = setup(10).await;
        let request = CreateFloorPlanRequest::new(property.id, "Pit", -11, -1.0, 20_000.0);

        let Err(ServiceError::Validation(errors)) =
            service.create(request, Actor::anonymous()).await
        else {
            panic!("expected validation errors");
        };

        assert!(errors.has_field("floor_number"));
        assert!(errors.has_field("width_m"));
        assert!(errors.has_field("length_m"));
    }

    #[tokio::test]
    async fn test_bulk_create_enforces_batch_limits() {
        let (_repo, service, property) = setup(2).await;

        let empty = service
            .bulk_create(BulkCreateFloorPlansRequest { items: vec![] }, Actor::anonymous())
            .await;
        assert!(matches!(empty, Err(ServiceError::Validation(_))));

        let too_many = BulkCreateFloorPlansRequest {
            items: (0..3).map(|f| item(property.id, f)).collect(),
        };
        let Err(ServiceError::Validation(errors)) =
            service.bulk_create(too_many, Actor::anonymous()).await
        else {
            panic!("expected validation errors");
        };
        assert!(errors.has_field("items"));
    }

    #[tokio::test]
    async fn test_bulk_create_is_all_or_nothing() {
        let (_repo, service, property) = setup(10).await;
        let mut bad = item(property.id, 2);
        bad.width_m = 0.0;
        let request = BulkCreateFloorPlansRequest {
            items: vec![item(property.id, 1), bad],
        };

        let Err(ServiceError::Validation(errors)) =
            service.bulk_create(request, Actor::anonymous()).await
        else {
            panic!("expected validation errors");
        };
        assert!(errors.has_field("items[1].width_m"));

        let listed = service
            .list(&FloorPlanFilter::new(property.id))
            .await
            .unwrap();
        assert_eq!(listed.total, 0);
    }

    #[tokio::test]
    async fn test_bulk_create_persists_all() {
        let (_repo, service, property) = setup(10).await;
        let request = BulkCreateFloorPlansRequest {
            items: (0..3).map(|f| item(property.id, f)).collect(),
        };

        let created = service
            .bulk_create(request, Actor::anonymous())
            .await
            .unwrap();

        assert_eq!(created.len(), 3);
        let listed = service
            .list(&FloorPlanFilter::new(property.id))
            .await
            .unwrap();
        assert_eq!(listed.total, 3);
        assert_eq!(listed.items[0].floor_number, 0);
    }

    #[tokio::test]
    async fn test_update_recomputes_area_and_clears_capacity() {
        let (_repo, service, property) = setup(10).await;
        let plan = service
            .create(item(property.id, 1).with_capacity(12), Actor::anonymous())
            .await
            .unwrap();

        let updated = service
            .update(
                plan.id,
                UpdateFloorPlanRequest {
                    width_m: Some(10.0),
                    capacity: Some(None),
                    ..Default::default()
                },
                Some(1),
                Actor::anonymous(),
            )
            .await
            .unwrap();

        assert_eq!(updated.area_sqm, 200.0);
        assert_eq!(updated.capacity, None);
        assert_eq!(updated.version, 2);
    }
}
