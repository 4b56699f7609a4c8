//! Axum extractor for RequestContext.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;

use super::types::{RequestContext, RequestId};
use crate::services::Actor;

fn header_uuid(headers: &HeaderMap, name: &str) -> Option<Uuid> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
}

fn extract_request_id(headers: &HeaderMap) -> RequestId {
    header_uuid(headers, "x-request-id")
        .map(RequestId::from_uuid)
        .unwrap_or_else(RequestId::new)
}

/// A missing or malformed `x-user-id` leaves the request anonymous.
fn extract_actor(headers: &HeaderMap) -> Actor {
    Actor::new(header_uuid(headers, "x-user-id"))
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = extract_request_id(&parts.headers);
        let actor = extract_actor(&parts.headers);
        tracing::trace!(%request_id, actor = ?actor.id(), "Extracted request context");

        Ok(RequestContext { actor, request_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_request_id_from_header() {
        let mut headers = HeaderMap::new();
        let id = "550e8400-e29b-41d4-a716-446655440000";
        headers.insert("x-request-id", id.parse().unwrap());

        let request_id = extract_request_id(&headers);
        assert_eq!(request_id.to_string(), id);
    }

    #[test]
    fn test_extract_request_id_generates_when_invalid() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", "not-a-uuid".parse().unwrap());

        let request_id = extract_request_id(&headers);

        Uuid::parse_str(&request_id.to_string()).expect("Should be valid UUID");
    }

    #[test]
    fn test_extract_actor() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_actor(&headers), Actor::anonymous());

        let user_id = Uuid::new_v4();
        headers.insert("x-user-id", user_id.to_string().parse().unwrap());
        assert_eq!(extract_actor(&headers).id(), Some(user_id));

        headers.insert("x-user-id", "someone".parse().unwrap());
        assert_eq!(extract_actor(&headers), Actor::anonymous());
    }
}
