//! Wire-level pieces shared by the server and the client.
//!
//! The JSON envelope wrapping every API body, entity tags derived from record
//! versions, and the cache-control values handlers attach.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::FieldError;

/// Cache-control value for responses that must never be stored.
pub const NO_STORE: &str = "no-store";

/// Cache-control value for per-user responses cached up to `max_age_secs`.
pub fn private_max_age(max_age_secs: u64) -> String {
    format!("private, max-age={max_age_secs}")
}

/// Successful response body: `{ success, data, timestamp }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Error details inside a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

/// Failed response body: `{ success: false, error, timestamp }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiError,
    pub timestamp: DateTime<Utc>,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ApiError {
                code: code.into(),
                message: message.into(),
                details: Vec::new(),
            },
            timestamp: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: Vec<FieldError>) -> Self {
        self.error.details = details;
        self
    }
}

/// Strong entity tag for a record version, quotes included.
///
/// # Examples
///
/// ```
/// use propdesk_core::http::entity_tag;
/// use uuid::Uuid;
///
/// assert_eq!(
///     entity_tag(Uuid::nil(), 3),
///     "\"00000000-0000-0000-0000-000000000000-3\""
/// );
/// ```
pub fn entity_tag(id: Uuid, version: i64) -> String {
    format!("\"{id}-{version}\"")
}

/// Extracts the version from an `If-Match` value produced by [`entity_tag`].
///
/// Accepts the weak `W/` prefix and a bare version number. The id inside the
/// tag must match `id`.
pub fn parse_entity_tag_version(value: &str, id: Uuid) -> Option<i64> {
    let value = value.trim();
    let value = value.strip_prefix("W/").unwrap_or(value);
    let unquoted = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);

    if let Ok(version) = unquoted.parse::<i64>() {
        return Some(version);
    }

    let (tag_id, version) = unquoted.rsplit_once('-')?;
    if Uuid::parse_str(tag_id).ok()? != id {
        return None;
    }
    version.parse().ok()
}

/// True when an `If-None-Match` header value names `current_tag`.
///
/// Handles `*` and comma separated lists; weak comparison per RFC 9110.
pub fn if_none_match_hits(header: &str, current_tag: &str) -> bool {
    let current = current_tag.strip_prefix("W/").unwrap_or(current_tag);
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == current
    })
}
