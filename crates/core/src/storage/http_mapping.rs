//! Pure functions for mapping repository errors to HTTP status codes.
//!
//! This module provides HTTP status code mappings for [`RepositoryError`] variants,
//! following the Functional Core pattern - pure functions with no side effects.

use super::RepositoryError;

/// Maps a [`RepositoryError`] to an HTTP status code.
///
/// - `NotFound` -> 404 (Not Found)
/// - `AlreadyExists` -> 409 (Conflict)
/// - `VersionConflict` -> 409 (Conflict)
/// - `Archived` -> 409 (Conflict)
/// - `ConnectionFailed` -> 503 (Service Unavailable)
/// - `QueryFailed` -> 500 (Internal Server Error)
/// - `Serialization` -> 500 (Internal Server Error)
/// - `InvalidData` -> 400 (Bad Request)
///
/// # Examples
///
/// ```
/// use propdesk_core::storage::{RepositoryError, repository_error_to_status_code};
///
/// let error = RepositoryError::not_found("FloorPlan", "abc-123");
/// assert_eq!(repository_error_to_status_code(&error), 404);
/// ```
pub fn repository_error_to_status_code(error: &RepositoryError) -> u16 {
    match error {
        RepositoryError::NotFound { .. } => 404,
        RepositoryError::AlreadyExists { .. } => 409,
        RepositoryError::VersionConflict { .. } => 409,
        RepositoryError::Archived { .. } => 409,
        RepositoryError::ConnectionFailed(_) => 503,
        RepositoryError::QueryFailed(_) => 500,
        RepositoryError::Serialization(_) => 500,
        RepositoryError::InvalidData(_) => 400,
    }
}

/// Maps a [`RepositoryError`] to the machine readable code in error bodies.
pub fn repository_error_code(error: &RepositoryError) -> &'static str {
    match error {
        RepositoryError::NotFound { .. } => "NOT_FOUND",
        RepositoryError::AlreadyExists { .. } => "ALREADY_EXISTS",
        RepositoryError::VersionConflict { .. } => "VERSION_CONFLICT",
        RepositoryError::Archived { .. } => "ARCHIVED",
        RepositoryError::ConnectionFailed(_) => "SERVICE_UNAVAILABLE",
        RepositoryError::QueryFailed(_) | RepositoryError::Serialization(_) => "INTERNAL_ERROR",
        RepositoryError::InvalidData(_) => "INVALID_DATA",
    }
}
