use thiserror::Error;

/// Errors that can occur when constructing a time range.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeRangeError {
    #[error("Invalid time range: start must be before end")]
    InvalidRange,
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("{entity_type} already exists: {id}")]
    AlreadyExists {
        entity_type: &'static str,
        id: String,
    },
    /// The stored version differs from the one the caller expected.
    #[error("{entity_type} {id} version conflict: expected {expected}, found {actual}")]
    VersionConflict {
        entity_type: &'static str,
        id: String,
        expected: i64,
        actual: i64,
    },
    /// The record is archived and can no longer change.
    #[error("{entity_type} is archived: {id}")]
    Archived {
        entity_type: &'static str,
        id: String,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl RepositoryError {
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        RepositoryError::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    pub fn version_conflict(
        entity_type: &'static str,
        id: impl ToString,
        expected: i64,
        actual: i64,
    ) -> Self {
        RepositoryError::VersionConflict {
            entity_type,
            id: id.to_string(),
            expected,
            actual,
        }
    }

    pub fn archived(entity_type: &'static str, id: impl ToString) -> Self {
        RepositoryError::Archived {
            entity_type,
            id: id.to_string(),
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_error_display() {
        assert_eq!(
            TimeRangeError::InvalidRange.to_string(),
            "Invalid time range: start must be before end"
        );
    }

    #[test]
    fn test_repository_error_not_found_display() {
        let error = RepositoryError::not_found("FloorPlan", "abc-123");
        assert_eq!(error.to_string(), "FloorPlan not found: abc-123");
    }

    #[test]
    fn test_repository_error_already_exists_display() {
        let error = RepositoryError::AlreadyExists {
            entity_type: "User",
            id: "ada@example.com".to_string(),
        };
        assert_eq!(error.to_string(), "User already exists: ada@example.com");
    }

    #[test]
    fn test_repository_error_version_conflict_display() {
        let error = RepositoryError::version_conflict("Lease", "l-1", 3, 5);
        assert_eq!(
            error.to_string(),
            "Lease l-1 version conflict: expected 3, found 5"
        );
    }

    #[test]
    fn test_repository_error_archived_display() {
        let error = RepositoryError::archived("Property", "p-9");
        assert_eq!(error.to_string(), "Property is archived: p-9");
    }

    #[test]
    fn test_repository_error_connection_failed_display() {
        let error = RepositoryError::ConnectionFailed("timeout after 30s".to_string());
        assert_eq!(error.to_string(), "Connection failed: timeout after 30s");
    }

    #[test]
    fn test_repository_error_invalid_data_display() {
        let error = RepositoryError::InvalidData("unknown status".to_string());
        assert_eq!(error.to_string(), "Invalid data: unknown status");
    }
}
