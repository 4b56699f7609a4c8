//! Lease handlers.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::HeaderMap,
    response::Response,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use propdesk_core::domain::{CreateLeaseRequest, LeaseStatus, UpdateLeaseRequest, ValidationErrors};
use propdesk_core::storage::{LeaseFilter, LeaseScope, Page};

use super::{response, AppError};
use crate::{context::RequestContext, state::AppState};

/// Query parameters for listing leases. Exactly one scope is required.
#[derive(Debug, Deserialize)]
pub struct ListLeasesQuery {
    pub property_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub status: Option<LeaseStatus>,
    #[serde(default)]
    pub include_archived: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListLeasesQuery {
    fn scope(&self) -> Result<LeaseScope, ValidationErrors> {
        match (self.property_id, self.tenant_id) {
            (Some(property_id), None) => Ok(LeaseScope::Property(property_id)),
            (None, Some(tenant_id)) => Ok(LeaseScope::Tenant(tenant_id)),
            (Some(_), Some(_)) => Err(ValidationErrors::single(
                "tenant_id",
                "cannot be combined with property_id",
            )),
            (None, None) => Err(ValidationErrors::single(
                "property_id",
                "property_id or tenant_id is required",
            )),
        }
    }
}

/// GET /api/v1/leases?property_id= | ?tenant_id=
pub async fn list_leases(
    State(state): State<AppState>,
    query: Result<Query<ListLeasesQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let filter = LeaseFilter {
        scope: query.scope()?,
        status: query.status,
        include_archived: query.include_archived,
        page: Page::new(query.limit, query.offset),
    };

    let page = state.leases.list(&filter).await?;
    Ok(response::cached(page, state.cache_ttl_secs))
}

/// POST /api/v1/leases
pub async fn create_lease(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<CreateLeaseRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;

    let lease = state.leases.create(request, ctx.actor).await?;
    Ok(response::created(format!("/api/v1/leases/{}", lease.id), lease))
}

/// GET /api/v1/leases/{id}
pub async fn get_lease(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = path?;
    let lease = state.leases.get(id).await?;
    Ok(response::record(&headers, lease, state.cache_ttl_secs))
}

/// PATCH /api/v1/leases/{id}
pub async fn update_lease(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateLeaseRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let if_match = response::if_match(&headers, id)?;

    let lease = state.leases.update(id, request, if_match, ctx.actor).await?;
    Ok(response::written(lease))
}

/// DELETE /api/v1/leases/{id}
pub async fn archive_lease(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> Result<Response, AppError> {
    let Path(id) = path?;
    let expected = response::archive_version(&headers, id, &body)?;

    let lease = state.leases.archive(id, expected, ctx.actor).await?;
    Ok(response::written(lease))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(property_id: Option<Uuid>, tenant_id: Option<Uuid>) -> ListLeasesQuery {
        ListLeasesQuery {
            property_id,
            tenant_id,
            status: None,
            include_archived: false,
            limit: None,
            offset: None,
        }
    }

    #[test]
    fn test_scope_requires_exactly_one_parent() {
        let id = Uuid::new_v4();
        assert_eq!(query(Some(id), None).scope(), Ok(LeaseScope::Property(id)));
        assert_eq!(query(None, Some(id)).scope(), Ok(LeaseScope::Tenant(id)));
        assert!(query(None, None).scope().is_err());
        assert!(query(Some(id), Some(id)).scope().is_err());
    }
}
