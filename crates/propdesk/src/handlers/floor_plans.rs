//! Floor plan handlers, including bulk creation.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use propdesk_core::domain::{
    BulkCreateFloorPlansRequest, CreateFloorPlanRequest, FloorPlanStatus, UpdateFloorPlanRequest,
};
use propdesk_core::storage::{FloorPlanFilter, Page};

use super::{response, AppError};
use crate::{context::RequestContext, state::AppState};

/// Query parameters for listing floor plans.
#[derive(Debug, Deserialize)]
pub struct ListFloorPlansQuery {
    /// Owning property (required)
    pub property_id: Uuid,
    pub status: Option<FloorPlanStatus>,
    #[serde(default)]
    pub include_archived: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// GET /api/v1/floor-plans?property_id=
pub async fn list_floor_plans(
    State(state): State<AppState>,
    query: Result<Query<ListFloorPlansQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let filter = FloorPlanFilter {
        property_id: query.property_id,
        status: query.status,
        include_archived: query.include_archived,
        page: Page::new(query.limit, query.offset),
    };

    let page = state.floor_plans.list(&filter).await?;
    Ok(response::cached(page, state.cache_ttl_secs))
}

/// POST /api/v1/floor-plans
pub async fn create_floor_plan(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<CreateFloorPlanRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;

    let plan = state.floor_plans.create(request, ctx.actor).await?;
    Ok(response::created(
        format!("/api/v1/floor-plans/{}", plan.id),
        plan,
    ))
}

/// POST /api/v1/floor-plans/bulk
pub async fn bulk_create_floor_plans(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<BulkCreateFloorPlansRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    tracing::debug!(request_id = %ctx.request_id, items = request.items.len(), "Received bulk floor plan request");

    let plans = state.floor_plans.bulk_create(request, ctx.actor).await?;
    Ok(response::uncached(StatusCode::CREATED, plans))
}

/// GET /api/v1/floor-plans/{id}
pub async fn get_floor_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = path?;
    let plan = state.floor_plans.get(id).await?;
    Ok(response::record(&headers, plan, state.cache_ttl_secs))
}

/// PATCH /api/v1/floor-plans/{id}
pub async fn update_floor_plan(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateFloorPlanRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let if_match = response::if_match(&headers, id)?;

    let plan = state
        .floor_plans
        .update(id, request, if_match, ctx.actor)
        .await?;
    Ok(response::written(plan))
}

/// DELETE /api/v1/floor-plans/{id}
pub async fn archive_floor_plan(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> Result<Response, AppError> {
    let Path(id) = path?;
    let expected = response::archive_version(&headers, id, &body)?;

    let plan = state.floor_plans.archive(id, expected, ctx.actor).await?;
    Ok(response::written(plan))
}
