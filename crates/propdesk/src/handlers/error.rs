use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use propdesk_core::domain::{FieldError, ValidationErrors};
use propdesk_core::http::{ApiErrorResponse, NO_STORE};
use propdesk_core::storage::{
    repository_error_code, repository_error_to_status_code, RepositoryError,
};

use crate::services::ServiceError;

/// Handler error rendered as the JSON error envelope.
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status_and_body(&self) -> (StatusCode, ApiErrorResponse) {
        if let Some(err) = self.0.downcast_ref::<ServiceError>() {
            return match err {
                ServiceError::Validation(errors) => validation(errors),
                ServiceError::Repository(err) => repository(err),
                ServiceError::PreconditionRequired(_) => (
                    StatusCode::PRECONDITION_REQUIRED,
                    ApiErrorResponse::new("PRECONDITION_REQUIRED", err.to_string()),
                ),
            };
        }
        if let Some(errors) = self.0.downcast_ref::<ValidationErrors>() {
            return validation(errors);
        }
        if let Some(err) = self.0.downcast_ref::<RepositoryError>() {
            return repository(err);
        }
        if let Some(rejection) = self.0.downcast_ref::<JsonRejection>() {
            return invalid_request(rejection.status(), rejection.body_text());
        }
        if let Some(rejection) = self.0.downcast_ref::<QueryRejection>() {
            return invalid_request(rejection.status(), rejection.body_text());
        }
        if let Some(rejection) = self.0.downcast_ref::<PathRejection>() {
            return invalid_request(rejection.status(), rejection.body_text());
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorResponse::new("INTERNAL_ERROR", "Internal server error"),
        )
    }
}

fn validation(errors: &ValidationErrors) -> (StatusCode, ApiErrorResponse) {
    (
        StatusCode::BAD_REQUEST,
        ApiErrorResponse::new("VALIDATION_ERROR", "Request validation failed")
            .with_details(errors.errors.clone()),
    )
}

fn repository(err: &RepositoryError) -> (StatusCode, ApiErrorResponse) {
    let status = StatusCode::from_u16(repository_error_to_status_code(err))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = if status.is_server_error() {
        "Storage operation failed".to_string()
    } else {
        err.to_string()
    };
    let body = ApiErrorResponse::new(repository_error_code(err), message);

    let body = match err {
        RepositoryError::VersionConflict {
            expected, actual, ..
        } => body.with_details(vec![
            FieldError::new("expected_version", expected.to_string()),
            FieldError::new("actual_version", actual.to_string()),
        ]),
        _ => body,
    };
    (status, body)
}

fn invalid_request(status: StatusCode, message: String) -> (StatusCode, ApiErrorResponse) {
    (status, ApiErrorResponse::new("INVALID_REQUEST", message))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "API error");
        } else {
            tracing::warn!(status = %status, code = %body.error.code, message = %body.error.message, "API error");
        }

        (status, [(header::CACHE_CONTROL, NO_STORE)], Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
