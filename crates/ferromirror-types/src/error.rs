//! Error types and handling for FerroMirror
//!
//! Errors fall into three families that the rest of the workspace treats very
//! differently:
//!
//! - configuration problems ([`Error::Config`]) abort startup,
//! - per-file access failures ([`Error::FileAccess`]) skip one file for the
//!   current cycle and are retried by the next scheduled scan,
//! - files that disappeared between two steps of a cycle ([`Error::Vanished`])
//!   are benign races and are skipped without being reported as failures.

use std::path::{Path, PathBuf};

/// Main error type for FerroMirror operations
#[derive(thiserror::Error, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// A single file could not be opened, read, written or removed
    #[error("Cannot access '{path}': {message}")]
    FileAccess {
        /// Path of the file that failed
        path: PathBuf,
        /// Error message from the underlying I/O operation
        message: String,
    },

    /// A file disappeared between being listed and being used
    #[error("File vanished: {path}")]
    Vanished {
        /// Path of the file that is gone
        path: PathBuf,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Synchronization error
    #[error("Synchronization error: {message}")]
    Sync {
        /// Error message describing the synchronization issue
        message: String,
    },

}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O related errors not tied to a single file
    Io,
    /// Per-file access errors
    FileAccess,
    /// A file vanished mid-cycle
    Race,
    /// Configuration errors
    Config,
    /// Synchronization errors
    Sync,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::FileAccess { .. } => ErrorKind::FileAccess,
            Self::Vanished { .. } => ErrorKind::Race,
            Self::Config { .. } => ErrorKind::Config,
            Self::Sync { .. } => ErrorKind::Sync,
        }
    }

    /// Check if this error is a benign filesystem race
    pub fn is_race(&self) -> bool {
        matches!(self, Self::Vanished { .. })
    }

    /// Classify an I/O failure on a single file
    ///
    /// `NotFound` means the file went away under us and maps to
    /// [`Error::Vanished`]; everything else is a [`Error::FileAccess`].
    pub fn file_access(path: impl AsRef<Path>, error: &std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if error.kind() == std::io::ErrorKind::NotFound {
            Self::Vanished { path }
        } else {
            Self::FileAccess {
                path,
                message: error.to_string(),
            }
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new sync error
    pub fn sync<S: Into<String>>(message: S) -> Self {
        Self::Sync {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}
