//! Error types for file operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::ProcessId;

/// Result alias used across the engine.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors that can occur while performing file operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Destination already exists.
    #[error("Already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory cannot be pasted into itself.
    #[error("Cannot copy or move {path} into itself")]
    SourceIsAncestor { path: PathBuf },

    /// A file name failed validation.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Archive could not be read or written.
    #[error("Archive error at {path}: {message}")]
    Archive { path: PathBuf, message: String },

    /// Archive format is not recognised.
    #[error("Unsupported archive format: {path}")]
    UnsupportedArchive { path: PathBuf },

    /// The platform trash facility rejected the path.
    #[error("Trash error at {path}: {message}")]
    Trash { path: PathBuf, message: String },

    /// System clipboard is unavailable or rejected the content.
    #[error("Clipboard error: {message}")]
    Clipboard { message: String },

    /// A process was asked to leave a terminal state.
    #[error("Process {id} already finished")]
    AlreadyFinished { id: ProcessId },

    /// The batch was cancelled between items.
    #[error("Operation cancelled")]
    Cancelled,

    /// A background task panicked or was aborted.
    #[error("Task failed: {message}")]
    TaskFailed { message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl EngineError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an archive error from any displayable cause.
    pub fn archive(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        Self::Archive {
            path: path.into(),
            message: cause.to_string(),
        }
    }

    /// Create an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the underlying cause is a rename across filesystems.
    pub fn is_cross_device(&self) -> bool {
        matches!(
            self,
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::CrossesDevices
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_io() {
        let err = EngineError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, EngineError::PermissionDenied { .. }));

        let err = EngineError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn test_cross_device_detection() {
        let err = EngineError::io(
            "/a",
            std::io::Error::new(std::io::ErrorKind::CrossesDevices, "exdev"),
        );
        assert!(err.is_cross_device());
        assert!(!EngineError::Cancelled.is_cross_device());
    }
}
