//! Unified error handling for the admin panel.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::components::StaffEditorError;
use crate::services::ServiceError;

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// A backend call failed.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StaffEditorError> for AppError {
    fn from(e: StaffEditorError) -> Self {
        match e {
            StaffEditorError::UnknownStaff(id) => Self::NotFound(format!("staff assignment {id}")),
            StaffEditorError::MissingIdentity => Self::BadRequest(e.to_string()),
            StaffEditorError::Service(e) => Self::Service(e),
        }
    }
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Service(ServiceError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Service(ServiceError::Invalid(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Service(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Service(e) if status == StatusCode::BAD_GATEWAY => {
                tracing::debug!(error = %e, "Hiding upstream error from client");
                "External service error".to_string()
            }
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use unit_admin_core::UnitRoleId;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("unit 9".to_string());
        assert_eq!(err.to_string(), "Not found: unit 9");

        let err = AppError::BadRequest("invalid role".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid role");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_service_errors_map_by_kind() {
        assert_eq!(
            get_status(ServiceError::NotFound("unit 3".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(ServiceError::Request("timeout".to_string()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(
                ServiceError::Api {
                    status: 500,
                    message: "boom".to_string()
                }
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_unknown_staff_is_not_found() {
        let err = AppError::from(StaffEditorError::UnknownStaff(UnitRoleId::new(4)));
        assert_eq!(get_status(err), StatusCode::NOT_FOUND);
    }
}
