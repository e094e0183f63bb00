//! Point-in-time fingerprints of a directory tree

use crate::hash::hash_file;
use ferromirror_types::{Error, FileIdentity, Fingerprint, Result, IDENTITY_SEPARATOR};
use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Mapping from file identity to content fingerprint for one root
///
/// Iteration is ordered by identity, so everything derived from a snapshot is
/// deterministic.
///
/// Files and directories that exist but could not be read are remembered as
/// skipped. Their state is unknown for this cycle, so nothing under a skipped
/// identity may be treated as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<FileIdentity, Fingerprint>,
    skipped: BTreeSet<FileIdentity>,
    unreadable: usize,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file; returns the previous fingerprint if the identity was present
    pub fn insert(&mut self, identity: FileIdentity, fingerprint: Fingerprint) -> Option<Fingerprint> {
        self.entries.insert(identity, fingerprint)
    }

    /// Fingerprint recorded for `identity`
    pub fn get(&self, identity: &FileIdentity) -> Option<&Fingerprint> {
        self.entries.get(identity)
    }

    /// Whether `identity` is present
    pub fn contains(&self, identity: &FileIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot holds no files
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in identity order
    pub fn iter(&self) -> btree_map::Iter<'_, FileIdentity, Fingerprint> {
        self.entries.iter()
    }

    /// Files that were listed but could not be read or hashed
    pub fn unreadable(&self) -> usize {
        self.unreadable
    }

    /// Record a file or directory whose contents could not be read
    pub fn mark_skipped(&mut self, identity: FileIdentity) {
        self.entries.remove(&identity);
        self.skipped.insert(identity);
    }

    /// Whether `identity` is a skipped file or lies below a skipped directory
    pub fn is_skipped(&self, identity: &FileIdentity) -> bool {
        let path = identity.as_str();
        self.skipped.iter().any(|skipped| {
            path.strip_prefix(skipped.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(IDENTITY_SEPARATOR))
        })
    }
}

impl FromIterator<(FileIdentity, Fingerprint)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (FileIdentity, Fingerprint)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a FileIdentity, &'a Fingerprint);
    type IntoIter = btree_map::Iter<'a, FileIdentity, Fingerprint>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Walks a root directory and fingerprints every regular file below it
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    root: PathBuf,
}

impl SnapshotBuilder {
    /// Create a builder for `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Build the snapshot
    ///
    /// Fails only when the root itself is not a readable directory. Below the
    /// root, unreadable directories and files are skipped with a warning and
    /// files that vanish before they are hashed are dropped silently.
    pub async fn build(&self) -> Result<Snapshot> {
        let metadata = tokio::fs::metadata(&self.root).await.map_err(|e| {
            Error::sync(format!("Cannot read root '{}': {}", self.root.display(), e))
        })?;
        if !metadata.is_dir() {
            return Err(Error::sync(format!(
                "Root '{}' is not a directory",
                self.root.display()
            )));
        }

        let root = self.root.clone();
        let listing = tokio::task::spawn_blocking(move || list_files(&root))
            .await
            .map_err(|e| Error::sync(format!("Directory walk panicked: {}", e)))??;

        let mut snapshot = Snapshot::new();
        snapshot.unreadable = listing.unreadable;
        for identity in listing.skipped {
            snapshot.mark_skipped(identity);
        }

        for (identity, path) in listing.files {
            match hash_file(&path).await {
                Ok(fingerprint) => {
                    snapshot.insert(identity, fingerprint);
                }
                Err(e) if e.is_race() => {
                    debug!("File vanished before hashing: {}", path.display());
                }
                Err(e) => {
                    warn!("Skipping unreadable file: {}", e);
                    snapshot.mark_skipped(identity);
                    snapshot.unreadable += 1;
                }
            }
        }

        info!(
            "Scanned {} files in '{}'",
            snapshot.len(),
            self.root.display()
        );
        Ok(snapshot)
    }
}

struct Listing {
    files: Vec<(FileIdentity, PathBuf)>,
    skipped: Vec<FileIdentity>,
    unreadable: usize,
}

fn list_files(root: &Path) -> Result<Listing> {
    let mut listing = Listing {
        files: Vec::new(),
        skipped: Vec::new(),
        unreadable: 0,
    };

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let vanished = e
                    .io_error()
                    .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound);
                if vanished {
                    debug!("Entry vanished during walk: {}", e);
                    continue;
                }

                // an unlistable root leaves nothing known about the tree
                if e.depth() == 0 {
                    return Err(Error::sync(format!(
                        "Cannot list root '{}': {}",
                        root.display(),
                        e
                    )));
                }

                warn!("Skipping unreadable entry: {}", e);
                listing.unreadable += 1;
                if let Some(identity) = e
                    .path()
                    .and_then(|path| path.strip_prefix(root).ok())
                    .and_then(FileIdentity::from_relative_path)
                {
                    listing.skipped.push(identity);
                }
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        match FileIdentity::from_relative_path(relative) {
            Some(identity) => listing.files.push((identity, entry.into_path())),
            None => {
                warn!("Skipping file with unsupported name: {}", entry.path().display());
                listing.unreadable += 1;
            }
        }
    }

    Ok(listing)
}
