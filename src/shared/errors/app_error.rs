use serde::Serialize;
use thiserror::Error;

use crate::modules::jobs::domain::value_objects::JobState;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition for job {client_id}: {from} -> {to}")]
    InvalidTransition {
        client_id: String,
        from: JobState,
        to: JobState,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    /// State errors are expected during races between the reconciler, the
    /// orchestrator and bulk resets; callers log and move on.
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_) | AppError::InvalidTransition { .. }
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::NetworkError("Request timeout".to_string())
        } else if err.is_connect() {
            AppError::NetworkError("Failed to connect to remote service".to_string())
        } else if let Some(status) = err.status() {
            AppError::NetworkError(format!("HTTP {}: {}", status, err))
        } else if err.is_decode() {
            AppError::SerializationError(err.to_string())
        } else {
            AppError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StorageError(err.to_string())
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::ValidationError(format!("Invalid UUID: {}", err))
    }
}

impl From<chrono::ParseError> for AppError {
    fn from(err: chrono::ParseError) -> Self {
        AppError::ValidationError(format!("Invalid date/time: {}", err))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(err: std::num::ParseIntError) -> Self {
        AppError::ConfigError(format!("Invalid number: {}", err))
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
