//! User handlers.

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

use propdesk_core::domain::{CreateUserRequest, UpdateUserRequest, UserRole, UserStatus};
use propdesk_core::storage::{Page, UserFilter};

use super::{response, AppError};
use crate::{context::RequestContext, state::AppState};

/// Query parameters for listing users.
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    #[serde(default)]
    pub include_archived: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let filter = UserFilter {
        role: query.role,
        status: query.status,
        include_archived: query.include_archived,
        page: Page::new(query.limit, query.offset),
    };

    let page = state.users.list(&filter).await?;
    Ok(response::cached(page, state.cache_ttl_secs))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;

    let user = state.users.create(request, ctx.actor).await?;
    Ok(response::created(format!("/api/v1/users/{}", user.id), user))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = path?;
    let user = state.users.get(id).await?;
    Ok(response::record(&headers, user, state.cache_ttl_secs))
}

/// PATCH /api/v1/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let if_match = response::if_match(&headers, id)?;

    let user = state.users.update(id, request, if_match, ctx.actor).await?;
    Ok(response::written(user))
}

/// DELETE /api/v1/users/{id}
pub async fn archive_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> Result<Response, AppError> {
    let Path(id) = path?;
    let expected = response::archive_version(&headers, id, &body)?;

    let user = state.users.archive(id, expected, ctx.actor).await?;
    Ok(response::written(user))
}
