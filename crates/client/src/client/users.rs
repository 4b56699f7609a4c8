//! User API operations.

use propdesk_core::domain::{CreateUserRequest, UpdateUserRequest, User, UserRole, UserStatus};
use propdesk_core::storage::Paginated;
use reqwest::Method;
use serde::Serialize;
use uuid::Uuid;

use super::{handle_response, PropdeskClient, Resource};
use crate::error::Result;

/// Query for listing users.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListUsersQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl PropdeskClient {
    /// List users.
    pub async fn list_users(&self, query: &ListUsersQuery) -> Result<Paginated<User>> {
        let response = self
            .request(Method::GET, User::PATH)
            .query(query)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Create a new user.
    pub async fn create_user(&self, req: &CreateUserRequest) -> Result<User> {
        let response = self
            .request(Method::POST, User::PATH)
            .json(req)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Get user by ID.
    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        self.get(id).await
    }

    /// Update a user the caller last read at `version`.
    pub async fn update_user(
        &self,
        id: Uuid,
        version: i64,
        req: &UpdateUserRequest,
    ) -> Result<User> {
        self.patch(id, version, req).await
    }

    /// Archive a user.
    pub async fn archive_user(&self, id: Uuid, version: Option<i64>) -> Result<User> {
        self.archive(id, version).await
    }
}
