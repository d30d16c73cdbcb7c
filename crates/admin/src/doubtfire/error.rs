//! Doubtfire-related errors.

use thiserror::Error;

use crate::services::ServiceError;

/// Errors that can occur when talking to the Doubtfire API.
#[derive(Debug, Clone, Error)]
pub enum DoubtfireError {
    /// HTTP request failed.
    #[error("Doubtfire request failed: {0}")]
    Request(String),

    /// Failed to parse response.
    #[error("Doubtfire response error: {0}")]
    Response(String),

    /// Doubtfire returned a non-success status.
    #[error("Doubtfire API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Credentials rejected (401/403).
    #[error("Doubtfire rejected the credentials: {0}")]
    Unauthorized(String),

    /// Resource does not exist (404).
    #[error("Doubtfire resource not found: {0}")]
    NotFound(String),

    /// Client could not be configured.
    #[error("Doubtfire configuration error: {0}")]
    Config(String),
}

impl DoubtfireError {
    /// Classify a non-success response.
    ///
    /// Doubtfire reports failures as `{"error": "..."}`; the raw body is used
    /// when it is not JSON.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<super::types::ApiErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("HTTP {status}")
                } else {
                    trimmed.to_string()
                }
            });

        match status {
            401 | 403 => Self::Unauthorized(message),
            404 => Self::NotFound(message),
            _ => Self::Api { status, message },
        }
    }
}

impl From<reqwest::Error> for DoubtfireError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Response(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

impl From<DoubtfireError> for ServiceError {
    fn from(e: DoubtfireError) -> Self {
        match e {
            DoubtfireError::Request(msg) => Self::Request(msg),
            DoubtfireError::Response(msg) => Self::InvalidResponse(msg),
            DoubtfireError::Api { status, message } => Self::Api { status, message },
            DoubtfireError::Unauthorized(msg) => Self::Unauthorized(msg),
            DoubtfireError::NotFound(msg) => Self::NotFound(msg),
            DoubtfireError::Config(msg) => Self::Invalid(msg),
        }
    }
}
