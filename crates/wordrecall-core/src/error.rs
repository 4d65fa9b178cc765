//! Core error types for wordrecall-core.
//!
//! Store backends normalize their own failures into [`StoreError`] at the
//! adapter boundary, so nothing storage-specific reaches the scheduling or
//! analytics code.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for wordrecall-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Store-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the progress, session and review-list stores.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Malformed identifier or out-of-range field. Raised before any write;
    /// retrying without correcting the input fails the same way.
    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    /// No record exists for the requested key.
    #[error("No {kind} found for '{key}'")]
    NotFound { kind: String, key: String },

    /// The backing store could not complete the read or write.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: impl Into<String>, key: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind: kind.into(),
            key: key.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation { .. })
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

// Every backend failure is an availability problem from the engine's point
// of view; constraint violations are caught by validation before the write.
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg)
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                StoreError::Unavailable("database is locked".to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
