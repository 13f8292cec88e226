//! Error and warning types for dedup runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors that abort a run before any filesystem mutation.
#[derive(Debug, Error)]
pub enum DedupError {
    /// Root path not found.
    #[error("Path does not exist: {path}")]
    NotFound { path: PathBuf },

    /// Root path is not a directory.
    #[error("Path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Reference and target resolve to the same directory.
    #[error("Reference and target are the same directory: {path}")]
    SameDirectory { path: PathBuf },

    /// One root lies inside the other.
    #[error("Reference {reference} and target {target} overlap")]
    OverlappingRoots { reference: PathBuf, target: PathBuf },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Generic I/O error while resolving a root.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DedupError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Per-entry error kind recorded in a run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The file vanished.
    NotFound,
    /// Permission was denied.
    PermissionDenied,
    /// Any other I/O failure.
    Io,
    /// The file changed between scan and deletion.
    Changed,
    /// The path does not lie inside the target root.
    OutsideTarget,
    /// The file name is not valid UTF-8 and cannot be matched.
    InvalidName,
}

impl ErrorKind {
    /// Classify an I/O error.
    pub fn from_io(error: &std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::Io => write!(f, "I/O error"),
            Self::Changed => write!(f, "changed since scan"),
            Self::OutsideTarget => write!(f, "outside target tree"),
            Self::InvalidName => write!(f, "name is not valid UTF-8"),
        }
    }
}

/// A non-fatal, per-file error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    /// Path where the error occurred.
    pub path: PathBuf,
    /// Kind of error.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl FileError {
    /// Create a new file error.
    pub fn new(path: impl Into<PathBuf>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a file error from an I/O error.
    pub fn io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::new(path, ErrorKind::from_io(error), error.to_string())
    }
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Kind of warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Two entries normalized to the same relative path.
    PathCollision,
    /// A directory could not be pruned.
    PruneConflict,
}

/// Warning-level event recorded during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupWarning {
    /// Path the warning refers to.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl DedupWarning {
    /// Create a new warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a path collision warning.
    pub fn path_collision(path: impl Into<PathBuf>, relative: &str) -> Self {
        let path = path.into();
        Self {
            message: format!("{} replaces an earlier entry for {relative}", path.display()),
            path,
            kind: WarningKind::PathCollision,
        }
    }

    /// Create a prune conflict warning.
    pub fn prune_conflict(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self {
            path: path.into(),
            message: format!("Could not remove directory: {error}"),
            kind: WarningKind::PruneConflict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_error_io() {
        let err = DedupError::io(
            "/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, DedupError::NotFound { .. }));

        let err = DedupError::io(
            "/busy",
            std::io::Error::new(std::io::ErrorKind::Other, "busy"),
        );
        assert!(matches!(err, DedupError::Io { .. }));
    }

    #[test]
    fn test_error_kind_from_io() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(ErrorKind::from_io(&denied), ErrorKind::PermissionDenied);

        let gone = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(FileError::io("/a", &gone).kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_prune_conflict_warning() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "directory not empty");
        let warning = DedupWarning::prune_conflict("/target/a", &err);
        assert_eq!(warning.kind, WarningKind::PruneConflict);
        assert!(warning.message.contains("not empty"));
    }
}
