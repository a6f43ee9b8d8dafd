//! Error types for the snapvault library
//!
//! All fallible operations return [`Result<T>`]. Confinement and existence
//! failures are distinct variants so that callers can decide whether to
//! retry, report, or prompt before an irreversible operation.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the snapvault library
pub type Result<T> = std::result::Result<T, VaultError>;

/// Main error type for all snapshot engine operations
#[derive(Debug, Error)]
pub enum VaultError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization of metadata
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot does not exist or carries no valid metadata record
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// Workspace root directory does not exist
    #[error("Workspace not found: {0:?}")]
    WorkspaceNotFound(PathBuf),

    /// A caller-supplied snapshot id would resolve outside the store root
    #[error("Invalid snapshot id: {0}")]
    InvalidId(String),

    /// A workspace id contains characters unsafe for id derivation
    #[error("Invalid workspace id: {0}")]
    InvalidWorkspaceId(String),

    /// Ignore pattern could not be compiled
    #[error("Invalid ignore pattern: {0}")]
    InvalidPattern(String),

    /// Walk directory error from walkdir crate
    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VaultError {
    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        VaultError::Internal(msg.into())
    }

    /// Check if this error means the referenced entity is missing
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VaultError::SnapshotNotFound(_) | VaultError::WorkspaceNotFound(_)
        )
    }

    /// Check if this error is a confinement rejection
    pub fn is_invalid_id(&self) -> bool {
        matches!(
            self,
            VaultError::InvalidId(_) | VaultError::InvalidWorkspaceId(_)
        )
    }
}
