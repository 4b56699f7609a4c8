//! HTTP client for the propdesk API.

pub mod floor_plans;
pub mod health;
pub mod leases;
pub mod occupancy;
pub mod properties;
pub mod users;

use propdesk_core::domain::{FloorPlan, Lease, Property, Record, User};
use propdesk_core::http::{entity_tag, ApiErrorResponse, ApiResponse};
use reqwest::{header, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{ClientError, Result};

/// Header naming the acting user for audit fields.
pub const USER_ID_HEADER: &str = "x-user-id";

/// A versioned entity served under its own collection path.
pub trait Resource: Record + DeserializeOwned {
    /// Collection path, e.g. `/api/v1/properties`.
    const PATH: &'static str;
}

impl Resource for Property {
    const PATH: &'static str = "/api/v1/properties";
}

impl Resource for FloorPlan {
    const PATH: &'static str = "/api/v1/floor-plans";
}

impl Resource for Lease {
    const PATH: &'static str = "/api/v1/leases";
}

impl Resource for User {
    const PATH: &'static str = "/api/v1/users";
}

/// HTTP client for the propdesk API.
#[derive(Debug, Clone)]
pub struct PropdeskClient {
    client: reqwest::Client,
    base_url: String,
    actor: Option<Uuid>,
}

impl PropdeskClient {
    /// Create a new client with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            actor: None,
        }
    }

    /// Create from environment (PROPDESK_URL or default).
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("PROPDESK_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        Self::new(base_url)
    }

    /// Send `x-user-id: actor` with every request.
    pub fn with_actor(mut self, actor: Option<Uuid>) -> Self {
        self.actor = actor;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a URL for an endpoint.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request builder carrying the actor header.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.actor {
            Some(actor) => builder.header(USER_ID_HEADER, actor.to_string()),
            None => builder,
        }
    }

    /// Fetch a record by id.
    pub async fn get<T: Resource>(&self, id: Uuid) -> Result<T> {
        let response = self
            .request(Method::GET, &format!("{}/{id}", T::PATH))
            .send()
            .await?;
        handle_response(response).await
    }

    /// Revalidate a record the caller already holds.
    ///
    /// Returns `None` when the server answers 304 because `current` is still
    /// the latest version.
    pub async fn refresh<T: Resource>(&self, current: &T) -> Result<Option<T>> {
        let response = self
            .request(Method::GET, &format!("{}/{}", T::PATH, current.id()))
            .header(
                header::IF_NONE_MATCH,
                entity_tag(current.id(), current.version()),
            )
            .send()
            .await?;
        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(None);
        }
        handle_response(response).await.map(Some)
    }

    /// Archive a record. With `version`, the server refuses stale writes.
    pub async fn archive<T: Resource>(&self, id: Uuid, version: Option<i64>) -> Result<T> {
        let mut builder = self.request(Method::DELETE, &format!("{}/{id}", T::PATH));
        if let Some(version) = version {
            builder = builder.header(header::IF_MATCH, entity_tag(id, version));
        }
        handle_response(builder.send().await?).await
    }

    /// PATCH a record, guarded by `If-Match` on `version`.
    async fn patch<T: Resource, B: serde::Serialize>(
        &self,
        id: Uuid,
        version: i64,
        body: &B,
    ) -> Result<T> {
        let response = self
            .request(Method::PATCH, &format!("{}/{id}", T::PATH))
            .header(header::IF_MATCH, entity_tag(id, version))
            .json(body)
            .send()
            .await?;
        handle_response(response).await
    }
}

/// Unwrap the success envelope or turn the error envelope into a
/// [`ClientError::Api`].
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;
    decode_body(status, &body)
}

fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    if status.is_success() {
        let envelope: ApiResponse<T> = serde_json::from_slice(body)
            .map_err(|err| ClientError::InvalidResponse(err.to_string()))?;
        return Ok(envelope.data);
    }

    match serde_json::from_slice::<ApiErrorResponse>(body) {
        Ok(envelope) => Err(ClientError::Api {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope.error.message,
            details: envelope.error.details,
        }),
        Err(_) => Err(ClientError::ServerError {
            status: status.as_u16(),
            message: String::from_utf8_lossy(body).into_owned(),
        }),
    }
}
