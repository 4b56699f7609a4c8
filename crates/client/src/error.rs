//! Client error types.

use propdesk_core::domain::FieldError;
use thiserror::Error;

/// Result type alias for client module.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with an error envelope.
    #[error("{code} ({status}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        details: Vec<FieldError>,
    },

    /// The server answered with a failure status and no envelope.
    #[error("Server returned {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("SSE parse error: {0}")]
    SseParse(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status of a server-side failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } | ClientError::ServerError { status, .. } => {
                Some(*status)
            }
            ClientError::Request(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Machine-readable error code from the envelope.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// True when a write lost an optimistic-locking race.
    pub fn is_conflict(&self) -> bool {
        self.code() == Some("VERSION_CONFLICT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_accessors() {
        let err = ClientError::Api {
            status: 409,
            code: "VERSION_CONFLICT".to_string(),
            message: "stale".to_string(),
            details: Vec::new(),
        };
        assert_eq!(err.status(), Some(409));
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "VERSION_CONFLICT (409): stale");
    }

    #[test]
    fn test_plain_server_error_has_no_code() {
        let err = ClientError::ServerError {
            status: 404,
            message: "gone".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.code(), None);
    }
}
