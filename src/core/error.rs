use crate::storage::{StorageError, UserStoreError};
use crate::handler::DeliveryError;
use thiserror::Error;

/// Top-level application error
///
/// Component errors convert into this enum with `?` wherever a task has to
/// bubble several kinds of failure up to one place (housekeeping ticks, CLI commands).
#[derive(Error, Debug)]
pub enum AppError {
    /// State document could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// User registry rejected an operation
    #[error("User store error: {0}")]
    Users(#[from] UserStoreError),

    /// Outbound message or file could not be delivered
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
