//! Lease API operations.

use propdesk_core::domain::{CreateLeaseRequest, Lease, LeaseStatus, UpdateLeaseRequest};
use propdesk_core::storage::{LeaseScope, Paginated};
use reqwest::Method;
use serde::Serialize;
use uuid::Uuid;

use super::{handle_response, PropdeskClient, Resource};
use crate::error::Result;

/// Query for listing leases of one property or one tenant.
#[derive(Debug, Clone, Serialize)]
pub struct ListLeasesQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    property_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tenant_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeaseStatus>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl ListLeasesQuery {
    pub fn new(scope: LeaseScope) -> Self {
        let (property_id, tenant_id) = match scope {
            LeaseScope::Property(id) => (Some(id), None),
            LeaseScope::Tenant(id) => (None, Some(id)),
        };
        Self {
            property_id,
            tenant_id,
            status: None,
            include_archived: false,
            limit: None,
            offset: None,
        }
    }
}

impl PropdeskClient {
    /// List leases in a scope.
    pub async fn list_leases(&self, query: &ListLeasesQuery) -> Result<Paginated<Lease>> {
        let response = self
            .request(Method::GET, Lease::PATH)
            .query(query)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Create a lease.
    pub async fn create_lease(&self, req: &CreateLeaseRequest) -> Result<Lease> {
        let response = self
            .request(Method::POST, Lease::PATH)
            .json(req)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Get lease by ID.
    pub async fn get_lease(&self, id: Uuid) -> Result<Lease> {
        self.get(id).await
    }

    /// Update a lease the caller last read at `version`.
    pub async fn update_lease(
        &self,
        id: Uuid,
        version: i64,
        req: &UpdateLeaseRequest,
    ) -> Result<Lease> {
        self.patch(id, version, req).await
    }

    /// Archive a lease.
    pub async fn archive_lease(&self, id: Uuid, version: Option<i64>) -> Result<Lease> {
        self.archive(id, version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_sets_exactly_one_parent() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(ListLeasesQuery::new(LeaseScope::Tenant(id))).unwrap();

        assert_eq!(json["tenant_id"], id.to_string());
        assert!(json.get("property_id").is_none());
        assert!(json.get("include_archived").is_none());
    }
}
