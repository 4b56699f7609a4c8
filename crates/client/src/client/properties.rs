//! Property API operations.

use propdesk_core::domain::{
    CreatePropertyRequest, Property, PropertyStatus, UpdatePropertyRequest,
};
use propdesk_core::storage::Paginated;
use reqwest::Method;
use serde::Serialize;
use uuid::Uuid;

use super::{handle_response, PropdeskClient, Resource};
use crate::error::Result;

/// Query for listing properties.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListPropertiesQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PropertyStatus>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl PropdeskClient {
    /// List properties.
    pub async fn list_properties(&self, query: &ListPropertiesQuery) -> Result<Paginated<Property>> {
        let response = self
            .request(Method::GET, Property::PATH)
            .query(query)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Create a new property.
    pub async fn create_property(&self, req: &CreatePropertyRequest) -> Result<Property> {
        let response = self
            .request(Method::POST, Property::PATH)
            .json(req)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Get property by ID.
    pub async fn get_property(&self, id: Uuid) -> Result<Property> {
        self.get(id).await
    }

    /// Update a property the caller last read at `version`.
    pub async fn update_property(
        &self,
        id: Uuid,
        version: i64,
        req: &UpdatePropertyRequest,
    ) -> Result<Property> {
        self.patch(id, version, req).await
    }

    /// Archive a property.
    pub async fn archive_property(&self, id: Uuid, version: Option<i64>) -> Result<Property> {
        self.archive(id, version).await
    }
}
