//! Core data types for FerroMirror
//!
//! This module provides the identity and fingerprint types that snapshots are
//! keyed and valued by, plus the statistics collected while applying a cycle.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Separator used inside a [`FileIdentity`], independent of the platform
pub const IDENTITY_SEPARATOR: char = '/';

/// Relative path of a file with respect to its root directory
///
/// Two files living under different roots are the same file iff their
/// identities compare equal. Identities are case-sensitive and always use
/// `/` as separator, whatever the host platform uses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FileIdentity(String);

impl FileIdentity {
    /// Build an identity from a path relative to a root
    ///
    /// Returns `None` for empty paths, paths that are not valid UTF-8, and
    /// paths containing anything other than plain name components (`..`,
    /// `.`, roots and prefixes are rejected).
    pub fn from_relative_path(path: &Path) -> Option<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(name) => segments.push(name.to_str()?),
                _ => return None,
            }
        }

        if segments.is_empty() {
            return None;
        }

        Some(Self(segments.join("/")))
    }

    /// Resolve this identity underneath `root`
    pub fn to_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in self.0.split(IDENTITY_SEPARATOR) {
            path.push(segment);
        }
        path
    }

    /// The normalized relative path as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 128-bit content fingerprint of a file's full byte stream
///
/// Equal fingerprints are treated as identical content; collisions are an
/// accepted risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u128);

impl Fingerprint {
    /// Wrap a raw 128-bit digest
    pub const fn from_u128(digest: u128) -> Self {
        Self(digest)
    }

    /// The raw 128-bit digest
    pub const fn as_u128(self) -> u128 {
        self.0
    }

    /// Lowercase hex rendering, always 32 characters
    pub fn to_hex(self) -> String {
        format!("{:032x}", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Statistics for one applied change set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SyncStats {
    /// Files copied into the replica because they were new in the source
    pub files_created: u64,
    /// Replica files overwritten with changed source content
    pub files_modified: u64,
    /// Replica files removed because the source no longer has them
    pub files_deleted: u64,
    /// Total bytes copied into the replica
    pub bytes_copied: u64,
    /// Directories created in the replica to hold new files
    pub directories_created: u64,
    /// Replica directories removed after their last file was deleted
    pub directories_pruned: u64,
    /// Files skipped because they vanished mid-cycle
    pub files_skipped: u64,
    /// Per-file failures; these files are retried next cycle
    pub errors: u64,
    /// Wall-clock duration
    pub duration: Duration,
}

impl SyncStats {
    /// Create a new empty statistics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of changes that were successfully applied
    pub fn changes_applied(&self) -> u64 {
        self.files_created + self.files_modified + self.files_deleted
    }

    /// Calculate the overall copy rate in bytes per second
    pub fn transfer_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.bytes_copied as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}
