//! Floor plan API operations.

use propdesk_core::domain::{
    BulkCreateFloorPlansRequest, CreateFloorPlanRequest, FloorPlan, FloorPlanStatus,
    UpdateFloorPlanRequest,
};
use propdesk_core::storage::Paginated;
use reqwest::Method;
use serde::Serialize;
use uuid::Uuid;

use super::{handle_response, PropdeskClient, Resource};
use crate::error::Result;

/// Query for listing the floor plans of a property.
#[derive(Debug, Clone, Serialize)]
pub struct ListFloorPlansQuery {
    pub property_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FloorPlanStatus>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl ListFloorPlansQuery {
    pub fn new(property_id: Uuid) -> Self {
        Self {
            property_id,
            status: None,
            include_archived: false,
            limit: None,
            offset: None,
        }
    }
}

impl PropdeskClient {
    /// List floor plans of a property.
    pub async fn list_floor_plans(
        &self,
        query: &ListFloorPlansQuery,
    ) -> Result<Paginated<FloorPlan>> {
        let response = self
            .request(Method::GET, FloorPlan::PATH)
            .query(query)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Create a floor plan.
    pub async fn create_floor_plan(&self, req: &CreateFloorPlanRequest) -> Result<FloorPlan> {
        let response = self
            .request(Method::POST, FloorPlan::PATH)
            .json(req)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Create several floor plans in one all-or-nothing batch.
    pub async fn bulk_create_floor_plans(
        &self,
        items: Vec<CreateFloorPlanRequest>,
    ) -> Result<Vec<FloorPlan>> {
        let response = self
            .request(Method::POST, &format!("{}/bulk", FloorPlan::PATH))
            .json(&BulkCreateFloorPlansRequest { items })
            .send()
            .await?;
        handle_response(response).await
    }

    /// Get floor plan by ID.
    pub async fn get_floor_plan(&self, id: Uuid) -> Result<FloorPlan> {
        self.get(id).await
    }

    /// Update a floor plan the caller last read at `version`.
    pub async fn update_floor_plan(
        &self,
        id: Uuid,
        version: i64,
        req: &UpdateFloorPlanRequest,
    ) -> Result<FloorPlan> {
        self.patch(id, version, req).await
    }

    /// Archive a floor plan.
    pub async fn archive_floor_plan(&self, id: Uuid, version: Option<i64>) -> Result<FloorPlan> {
        self.archive(id, version).await
    }
}
