//! Streaming BLAKE3 content fingerprints.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use blake3::Hasher;
use thiserror::Error;

use refdedup_core::{ErrorKind, FileError, Fingerprint};

/// Read buffer size. Memory use per hash is bounded by this, not by file size.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Errors that can occur while fingerprinting a file.
#[derive(Debug, Error)]
pub enum HashError {
    /// The file vanished before or while it was read.
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    /// Permission denied reading the file.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Any other read failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HashError {
    /// Create a hash error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }

    /// Path of the file that failed.
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path } | Self::PermissionDenied { path } | Self::Io { path, .. } => {
                path
            }
        }
    }

    /// Per-entry error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Convert into a record for the scan's error list.
    pub fn to_file_error(&self) -> FileError {
        FileError::new(self.path(), self.kind(), self.to_string())
    }
}

/// Compute the fingerprint of a file's full content.
pub fn fingerprint(path: &Path) -> Result<Fingerprint, HashError> {
    let mut file = File::open(path).map_err(|e| HashError::io(path, e))?;
    fingerprint_reader(&mut file).map_err(|e| HashError::io(path, e))
}

/// Compute the fingerprint of everything `reader` yields.
pub fn fingerprint_reader<R: Read>(reader: &mut R) -> io::Result<Fingerprint> {
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Fingerprint::new(*hasher.finalize().as_bytes()))
}

/// Fingerprint in-memory content.
pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
    Fingerprint::new(*blake3::hash(bytes).as_bytes())
}
