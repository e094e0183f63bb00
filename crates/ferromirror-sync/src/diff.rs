//! Classification of differences between two snapshots

use crate::snapshot::Snapshot;
use ferromirror_types::FileIdentity;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Type of change detected for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    /// Present in both roots with different content
    Modified,
    /// Present only in the source
    Added,
    /// Present only in the replica
    Deleted,
}

impl ChangeType {
    /// Past-tense verb used in change log lines
    pub fn verb(self) -> &'static str {
        match self {
            Self::Modified => "modified",
            Self::Added => "created",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Changes needed to converge a replica onto its source
///
/// The three lists are disjoint. Each is in identity order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Files whose content differs between source and replica
    pub modified: Vec<FileIdentity>,
    /// Files present in the source but not in the replica
    pub added: Vec<FileIdentity>,
    /// Files present in the replica but not in the source
    pub deleted: Vec<FileIdentity>,
}

impl ChangeSet {
    /// Whether nothing needs to change
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.deleted.is_empty()
    }

    /// Total number of changes
    pub fn len(&self) -> usize {
        self.modified.len() + self.added.len() + self.deleted.len()
    }

    /// All changes in application order: modified, then added, then deleted
    pub fn iter(&self) -> impl Iterator<Item = (ChangeType, &FileIdentity)> {
        let modified = self.modified.iter().map(|id| (ChangeType::Modified, id));
        let added = self.added.iter().map(|id| (ChangeType::Added, id));
        let deleted = self.deleted.iter().map(|id| (ChangeType::Deleted, id));
        modified.chain(added).chain(deleted)
    }
}

/// Compare a source snapshot against a replica snapshot
///
/// Every identity is looked up by key in the opposite snapshot. Fingerprints
/// are only ever compared for the same identity, so two different files that
/// happen to share content can never hide an addition or a deletion.
///
/// An identity that is skipped on the other side is held back: a file the
/// source could not read is never deleted from the replica, and a replica
/// file that could not be read is never overwritten as new.
pub fn detect_changes(source: &Snapshot, replica: &Snapshot) -> ChangeSet {
    let mut changes = ChangeSet::default();
    let mut held_back = 0usize;

    for (identity, fingerprint) in source {
        match replica.get(identity) {
            Some(existing) if existing == fingerprint => {}
            Some(_) => changes.modified.push(identity.clone()),
            None if replica.is_skipped(identity) => held_back += 1,
            None => changes.added.push(identity.clone()),
        }
    }

    for (identity, _) in replica {
        if source.contains(identity) {
            continue;
        }
        if source.is_skipped(identity) {
            held_back += 1;
        } else {
            changes.deleted.push(identity.clone());
        }
    }

    debug!(
        "Detected {} modified, {} added, {} deleted, {} held back",
        changes.modified.len(),
        changes.added.len(),
        changes.deleted.len(),
        held_back
    );
    changes
}
