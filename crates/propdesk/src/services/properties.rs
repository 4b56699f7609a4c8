use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use propdesk_core::domain::{
    validate_property, CreatePropertyRequest, Property, Record, UpdatePropertyRequest,
};
use propdesk_core::storage::{Paginated, PropertyFilter, PropertyRepository};

use super::{expected_version, found, writable, Actor, Result};

#[derive(Clone)]
pub struct PropertyService {
    properties: Arc<dyn PropertyRepository>,
}

impl PropertyService {
    pub fn new(properties: Arc<dyn PropertyRepository>) -> Self {
        Self { properties }
    }

    pub async fn create(&self, request: CreatePropertyRequest, actor: Actor) -> Result<Property> {
        let property = request.into_property(actor.id(), Utc::now());
        validate_property(&property)?;

        self.properties.create_property(&property).await?;

        tracing::info!(property_id = %property.id, name = %property.name, "Created property");
        Ok(property)
    }

    pub async fn get(&self, id: Uuid) -> Result<Property> {
        found(id, self.properties.get_property(id).await?)
    }

    pub async fn list(&self, filter: &PropertyFilter) -> Result<Paginated<Property>> {
        Ok(self.properties.list_properties(filter).await?)
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdatePropertyRequest,
        if_match: Option<i64>,
        actor: Actor,
    ) -> Result<Property> {
        let expected = expected_version(Property::ENTITY, if_match, request.version)?;
        let mut property = writable(
            id,
            self.properties.load_property_for_update(id).await?,
            expected,
        )?;

        request.apply(&mut property)?;
        validate_property(&property)?;
        property.audit.touch(actor.id(), Utc::now());
        property.version = expected + 1;

        self.properties.update_property(&property, expected).await?;

        tracing::info!(property_id = %id, version = property.version, "Updated property");
        Ok(property)
    }

    /// Soft-deletes a property. Archiving an archived property returns it
    /// unchanged. Floor plans and leases under it are left as they are.
    pub async fn archive(&self, id: Uuid, if_match: Option<i64>, actor: Actor) -> Result<Property> {
        let property = self
            .properties
            .archive_property(id, actor.id(), Utc::now(), if_match)
            .await?;

        tracing::info!(property_id = %id, "Archived property");
        Ok(property)
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use propdesk_core::domain::PropertyStatus;
    use propdesk_core::storage::RepositoryError;

    use crate::services::ServiceError;
    use crate::storage::InMemoryRepository;

    fn service() -> PropertyService {
        PropertyService::new(Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn test_create_enriches_record() {
        let actor = Actor::new(Some(Uuid::new_v4()));
        let property = service()
            .create(CreatePropertyRequest::new(" Dockside ", "1 Quay"), actor)
            .await
            .unwrap();

        assert_eq!(property.name, "Dockside");
        assert_eq!(property.status, PropertyStatus::Active);
        assert_eq!(property.version, 1);
        assert_eq!(property.audit.created_by, actor.id());
        assert_eq!(property.metadata, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_create_reports_every_field() {
        let mut request = CreatePropertyRequest::new("", " ");
        request.metadata = Some(serde_json::json!([1]));

        let Err(ServiceError::Validation(errors)) =
            service().create(request, Actor::anonymous()).await
        else {
            panic!("expected validation errors");
        };

        assert_eq!(errors.len(), 3);
        assert!(errors.has_field("name"));
        assert!(errors.has_field("address"));
        assert!(errors.has_field("metadata"));
    }

    #[tokio::test]
    async fn test_update_requires_version() {
        let service = service();
        let property = service
            .create(CreatePropertyRequest::new("Dockside", "1 Quay"), Actor::anonymous())
            .await
            .unwrap();

        let result = service
            .update(property.id, UpdatePropertyRequest::default(), None, Actor::anonymous())
            .await;

        assert!(matches!(result, Err(ServiceError::PreconditionRequired(_))));
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_merges_metadata() {
        let service = service();
        let mut create = CreatePropertyRequest::new("Dockside", "1 Quay");
        create.metadata = Some(serde_json::json!({"floors": 4, "parking": true}));
        let property = service.create(create, Actor::anonymous()).await.unwrap();

        let editor = Actor::new(Some(Uuid::new_v4()));
        let updated = service
            .update(
                property.id,
                UpdatePropertyRequest {
                    name: Some("Quayside".to_string()),
                    metadata: Some(serde_json::json!({"parking": null, "lifts": 2})),
                    version: Some(1),
                    ..Default::default()
                },
                None,
                editor,
            )
            .await
            .unwrap();

        assert_eq!(updated.version, 2);
        assert_eq!(updated.name, "Quayside");
        assert_eq!(updated.audit.updated_by, editor.id());
        assert_eq!(updated.metadata, serde_json::json!({"floors": 4, "lifts": 2}));
        assert_eq!(service.get(property.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_stale_update_conflicts_without_writing() {
        let service = service();
        let property = service
            .create(CreatePropertyRequest::new("Dockside", "1 Quay"), Actor::anonymous())
            .await
            .unwrap();
        let rename = UpdatePropertyRequest {
            name: Some("Quayside".to_string()),
            ..Default::default()
        };
        service
            .update(property.id, rename.clone(), Some(1), Actor::anonymous())
            .await
            .unwrap();

        let stale = service
            .update(property.id, rename, Some(1), Actor::anonymous())
            .await;

        assert!(matches!(
            stale,
            Err(ServiceError::Repository(RepositoryError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            }))
        ));
        assert_eq!(service.get(property.id).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_archive_then_update_is_rejected() {
        let service = service();
        let property = service
            .create(CreatePropertyRequest::new("Dockside", "1 Quay"), Actor::anonymous())
            .await
            .unwrap();

        let archived = service
            .archive(property.id, None, Actor::anonymous())
            .await
            .unwrap();
        assert_eq!(archived.status, PropertyStatus::Archived);

        let again = service
            .archive(property.id, Some(1), Actor::anonymous())
            .await
            .unwrap();
        assert_eq!(again.version, archived.version);

        let result = service
            .update(
                property.id,
                UpdatePropertyRequest::default(),
                Some(archived.version),
                Actor::anonymous(),
            )
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::Repository(RepositoryError::Archived { .. }))
        ));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let result = service().get(Uuid::new_v4()).await;
        assert!(matches!(
            result,
            Err(ServiceError::Repository(RepositoryError::NotFound { .. }))
        ));
    }
}
