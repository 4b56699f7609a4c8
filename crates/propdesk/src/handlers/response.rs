//! Envelope and header helpers shared by the resource handlers.

use axum::{
    body::Bytes,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use propdesk_core::domain::{Record, ValidationErrors};
use propdesk_core::http::{
    entity_tag, if_none_match_hits, parse_entity_tag_version, private_max_age, ApiResponse,
    NO_STORE,
};

use super::AppError;

/// Single-record GET: ETag plus private caching, or 304 when the client
/// already holds the current version.
pub fn record<T: Record + Serialize>(headers: &HeaderMap, record: T, max_age: u64) -> Response {
    let tag = entity_tag(record.id(), record.version());

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| if_none_match_hits(v, &tag));
    if not_modified {
        return (
            StatusCode::NOT_MODIFIED,
            [
                (header::ETAG, tag),
                (header::CACHE_CONTROL, private_max_age(max_age)),
            ],
        )
            .into_response();
    }

    (
        [
            (header::ETAG, tag),
            (header::CACHE_CONTROL, private_max_age(max_age)),
        ],
        Json(ApiResponse::ok(record)),
    )
        .into_response()
}

/// Cacheable read without an entity tag: listings, rollups, latest reading.
pub fn cached<T: Serialize>(data: T, max_age: u64) -> Response {
    (
        [(header::CACHE_CONTROL, private_max_age(max_age))],
        Json(ApiResponse::ok(data)),
    )
        .into_response()
}

/// 201 for a freshly created record.
pub fn created<T: Record + Serialize>(location: String, record: T) -> Response {
    let tag = entity_tag(record.id(), record.version());
    (
        StatusCode::CREATED,
        [
            (header::LOCATION, location),
            (header::ETAG, tag),
            (header::CACHE_CONTROL, NO_STORE.to_string()),
        ],
        Json(ApiResponse::ok(record)),
    )
        .into_response()
}

/// 200 for an updated or archived record, carrying its new entity tag.
pub fn written<T: Record + Serialize>(record: T) -> Response {
    let tag = entity_tag(record.id(), record.version());
    (
        [
            (header::ETAG, tag),
            (header::CACHE_CONTROL, NO_STORE.to_string()),
        ],
        Json(ApiResponse::ok(record)),
    )
        .into_response()
}

/// Write response for payloads that are not a single versioned record.
pub fn uncached<T: Serialize>(status: StatusCode, data: T) -> Response {
    (
        status,
        [(header::CACHE_CONTROL, NO_STORE)],
        Json(ApiResponse::ok(data)),
    )
        .into_response()
}

/// Version named by `If-Match`, if the header is present.
pub fn if_match(headers: &HeaderMap, id: Uuid) -> Result<Option<i64>, AppError> {
    let Some(value) = headers.get(header::IF_MATCH) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| parse_entity_tag_version(v, id))
        .map(Some)
        .ok_or_else(|| {
            ValidationErrors::single("If-Match", "must be an entity tag of this resource").into()
        })
}

#[derive(Debug, Default, Deserialize)]
struct VersionBody {
    version: Option<i64>,
}

/// `version` field of an optional JSON body, used by DELETE.
pub fn body_version(body: &Bytes) -> Result<Option<i64>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let parsed: VersionBody = serde_json::from_slice(body)
        .map_err(|err| ValidationErrors::single("body", format!("invalid JSON: {err}")))?;
    Ok(parsed.version)
}

/// Expected version for a DELETE. `If-Match` wins over the body.
pub fn archive_version(
    headers: &HeaderMap,
    id: Uuid,
    body: &Bytes,
) -> Result<Option<i64>, AppError> {
    Ok(if_match(headers, id)?.or(body_version(body)?))
}
