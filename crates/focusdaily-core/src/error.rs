//! Core error types for focusdaily-core.
//!
//! This module defines the error hierarchy using thiserror. Validation
//! errors mark illegal caller requests; storage and settings errors wrap
//! collaborator failures.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::SessionStatus;

/// Core error type for focusdaily-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Settings-related errors
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Referenced session does not exist
    #[error("Session not found: {id}")]
    NotFound { id: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Settings-specific errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to load settings
    #[error("Failed to load settings from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save settings
    #[error("Failed to save settings to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown settings key
    #[error("Unknown settings key: {0}")]
    UnknownKey(String),

    /// Failed to parse settings
    #[error("Failed to parse settings: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A session is already current; it must be stopped or completed first
    #[error("A session is already active: {id}")]
    SessionAlreadyActive { id: String },

    /// Planned duration outside the accepted range
    #[error("Invalid planned duration: {seconds} seconds (must be at least 1)")]
    InvalidDuration { seconds: u32 },

    /// Requested transition is not legal from the current state
    #[error("Cannot {action} while {status:?}")]
    IllegalTransition {
        action: &'static str,
        status: SessionStatus,
    },

    /// The active session cannot be deleted
    #[error("Cannot delete the active session: {id}")]
    ActiveSessionDelete { id: String },
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(StorageError::from(err))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
