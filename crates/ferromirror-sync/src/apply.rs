//! Application of a change set to the replica

use crate::diff::{ChangeSet, ChangeType};
use crate::log_sink::{LogRecord, LogSink};
use ferromirror_types::{Error, ErrorKind, FileIdentity, Result, SyncStats};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tracing::{debug, warn};

/// Suffix of the temporary file a copy is staged in before being renamed
const STAGING_SUFFIX: &str = ".ferromirror-partial";

/// Applies change sets to a replica directory
///
/// Changes are applied in [`ChangeSet::iter`] order. A failure on one file
/// is reported and counted, then the rest of the batch continues; the next
/// cycle retries whatever failed.
#[derive(Debug)]
pub struct Applier<'a> {
    source_root: &'a Path,
    replica_root: &'a Path,
    sink: &'a LogSink,
}

impl<'a> Applier<'a> {
    /// Create an applier copying from `source_root` into `replica_root`
    pub fn new(source_root: &'a Path, replica_root: &'a Path, sink: &'a LogSink) -> Self {
        Self {
            source_root,
            replica_root,
            sink,
        }
    }

    /// Apply every change, logging one record per successful change
    pub async fn apply(&self, changes: &ChangeSet) -> SyncStats {
        let start = Instant::now();
        let mut stats = SyncStats::new();

        for (change, identity) in changes.iter() {
            let outcome = match change {
                ChangeType::Modified => self.overwrite(identity, &mut stats).await,
                ChangeType::Added => self.create(identity, &mut stats).await,
                ChangeType::Deleted => self.delete(identity, &mut stats).await,
            };

            match outcome {
                Ok(()) => {
                    if let Err(e) = self.sink.append(&LogRecord::new(identity.clone(), change)).await {
                        warn!("Couldn't write to the log file: {}", e);
                    }
                }
                Err(e) => match e.kind() {
                    ErrorKind::Race => {
                        debug!("Skipping {}: {}", identity, e);
                        stats.files_skipped += 1;
                    }
                    kind => {
                        warn!(?kind, "Failed to apply {} change to {}: {}", change, identity, e);
                        stats.errors += 1;
                    }
                },
            }
        }

        stats.duration = start.elapsed();
        stats
    }

    async fn overwrite(&self, identity: &FileIdentity, stats: &mut SyncStats) -> Result<()> {
        let source = identity.to_path(self.source_root);
        let replica = identity.to_path(self.replica_root);

        stats.bytes_copied += copy_into_place(&source, &replica).await?;
        stats.files_modified += 1;
        Ok(())
    }

    async fn create(&self, identity: &FileIdentity, stats: &mut SyncStats) -> Result<()> {
        let source = identity.to_path(self.source_root);
        let replica = identity.to_path(self.replica_root);

        fs::metadata(&source)
            .await
            .map_err(|e| Error::file_access(&source, &e))?;

        if let Some(parent) = replica.parent() {
            stats.directories_created += self.create_parents(parent).await?;
        }
        remove_directory_in_the_way(&replica).await?;

        stats.bytes_copied += copy_into_place(&source, &replica).await?;
        stats.files_created += 1;
        Ok(())
    }

    async fn delete(&self, identity: &FileIdentity, stats: &mut SyncStats) -> Result<()> {
        let replica = identity.to_path(self.replica_root);

        match fs::remove_file(&replica).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Already gone: {}", replica.display());
            }
            Err(e) => {
                if !self.replaced_by_other_type(&replica).await {
                    return Err(Error::file_access(&replica, &e));
                }
                debug!("Already replaced: {}", replica.display());
            }
        }
        stats.files_deleted += 1;

        if let Some(parent) = replica.parent() {
            stats.directories_pruned += self.prune_empty_parents(parent).await;
        }
        Ok(())
    }

    /// Create missing directories between the replica root and `dir`
    ///
    /// A replica file standing where the source now has a directory is
    /// removed first. The source no longer has that file, so its own
    /// deletion is logged later in the batch.
    async fn create_parents(&self, dir: &Path) -> Result<u64> {
        let mut missing = 0;
        let mut current = dir;
        while current != self.replica_root && current.starts_with(self.replica_root) {
            match fs::symlink_metadata(current).await {
                Ok(metadata) if metadata.is_dir() => break,
                Ok(_) => {
                    debug!("Removing file in place of directory: {}", current.display());
                    fs::remove_file(current)
                        .await
                        .map_err(|e| Error::file_access(current, &e))?;
                }
                Err(_) => {}
            }
            missing += 1;
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        if missing == 0 {
            return Ok(0);
        }

        fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::file_access(dir, &e))?;
        Ok(missing)
    }

    /// Whether the file at `path` was displaced earlier in the batch
    ///
    /// That is the case when `path` is now a directory or when one of its
    /// ancestors inside the replica is no longer a directory.
    async fn replaced_by_other_type(&self, path: &Path) -> bool {
        if fs::symlink_metadata(path)
            .await
            .is_ok_and(|metadata| metadata.is_dir())
        {
            return true;
        }
        for ancestor in path.ancestors().skip(1) {
            if ancestor == self.replica_root || !ancestor.starts_with(self.replica_root) {
                break;
            }
            if let Ok(metadata) = fs::symlink_metadata(ancestor).await {
                if !metadata.is_dir() {
                    return true;
                }
            }
        }
        false
    }

    /// Remove directories left empty by a deletion, stopping at the replica root
    async fn prune_empty_parents(&self, dir: &Path) -> u64 {
        let mut pruned = 0;
        let mut current = dir;
        while current != self.replica_root && current.starts_with(self.replica_root) {
            // fails on non-empty directories, which ends the climb
            if fs::remove_dir(current).await.is_err() {
                break;
            }
            debug!("Pruned empty directory: {}", current.display());
            pruned += 1;
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        pruned
    }
}

/// Remove a replica directory standing where the source now has a file
///
/// Everything below it is gone from the source too; those deletions are
/// logged later in the batch.
async fn remove_directory_in_the_way(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path).await {
        Ok(metadata) if metadata.is_dir() => {
            debug!("Removing directory in place of file: {}", path.display());
            fs::remove_dir_all(path)
                .await
                .map_err(|e| Error::file_access(path, &e))
        }
        _ => Ok(()),
    }
}

/// Copy `source` over `destination` through a staging file in the same directory
///
/// The destination is only replaced once the full content has been written,
/// so a failed copy never leaves a truncated replica file behind.
async fn copy_into_place(source: &Path, destination: &Path) -> Result<u64> {
    let staging = staging_path(destination);

    let bytes = match fs::copy(source, &staging).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = fs::remove_file(&staging).await;
            return Err(Error::file_access(source, &e));
        }
    };

    if let Err(e) = fs::rename(&staging, destination).await {
        let _ = fs::remove_file(&staging).await;
        return Err(Error::file_access(destination, &e));
    }

    Ok(bytes)
}

fn staging_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(STAGING_SUFFIX);
    destination.with_file_name(name)
}
