//! Property CRUD handlers.

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

use propdesk_core::domain::{CreatePropertyRequest, PropertyStatus, UpdatePropertyRequest};
use propdesk_core::storage::{Page, PropertyFilter};

use super::{response, AppError};
use crate::{context::RequestContext, state::AppState};

/// Query parameters for listing properties.
#[derive(Debug, Deserialize)]
pub struct ListPropertiesQuery {
    pub status: Option<PropertyStatus>,
    #[serde(default)]
    pub include_archived: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// GET /api/v1/properties
pub async fn list_properties(
    State(state): State<AppState>,
    query: Result<Query<ListPropertiesQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let filter = PropertyFilter {
        status: query.status,
        include_archived: query.include_archived,
        page: Page::new(query.limit, query.offset),
    };

    let page = state.properties.list(&filter).await?;
    Ok(response::cached(page, state.cache_ttl_secs))
}

/// POST /api/v1/properties
pub async fn create_property(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<CreatePropertyRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    tracing::debug!(request_id = %ctx.request_id, "Received create property request");

    let property = state.properties.create(request, ctx.actor).await?;
    Ok(response::created(
        format!("/api/v1/properties/{}", property.id),
        property,
    ))
}

/// GET /api/v1/properties/{id}
pub async fn get_property(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = path?;
    let property = state.properties.get(id).await?;
    Ok(response::record(&headers, property, state.cache_ttl_secs))
}

/// PATCH /api/v1/properties/{id}
pub async fn update_property(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdatePropertyRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let if_match = response::if_match(&headers, id)?;

    let property = state
        .properties
        .update(id, request, if_match, ctx.actor)
        .await?;
    Ok(response::written(property))
}

/// DELETE /api/v1/properties/{id}
pub async fn archive_property(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> Result<Response, AppError> {
    let Path(id) = path?;
    let expected = response::archive_version(&headers, id, &body)?;

    let property = state.properties.archive(id, expected, ctx.actor).await?;
    Ok(response::written(property))
}
