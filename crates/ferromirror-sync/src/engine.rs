//! One full snapshot, diff and apply pass

use crate::apply::Applier;
use crate::diff::{detect_changes, ChangeSet};
use crate::log_sink::LogSink;
use crate::snapshot::SnapshotBuilder;
use chrono::{DateTime, Local};
use ferromirror_config::SyncConfig;
use ferromirror_types::{Result, SyncStats};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of one sync cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    /// Sequence number of the cycle, starting at 1
    pub cycle: u64,
    /// Files detected as modified
    pub modified: usize,
    /// Files detected as new
    pub added: usize,
    /// Files detected as deleted
    pub deleted: usize,
    /// Files skipped while scanning either root
    pub unreadable: usize,
    /// What the applier actually did
    pub stats: SyncStats,
    /// When the cycle finished
    pub finished_at: DateTime<Local>,
}

impl CycleReport {
    /// Whether the cycle found anything to do
    pub fn had_changes(&self) -> bool {
        self.modified + self.added + self.deleted > 0
    }
}

/// Runs sync cycles for one source/replica pair
///
/// Snapshots are rebuilt from scratch every cycle; only the configuration and
/// the log sink live across cycles.
#[derive(Debug)]
pub struct SyncEngine {
    config: Arc<SyncConfig>,
    sink: LogSink,
    cycle: u64,
}

impl SyncEngine {
    /// Create an engine that opens the configured log file and echoes records to stdout
    pub async fn new(config: Arc<SyncConfig>) -> Result<Self> {
        let sink = LogSink::open(config.log_file(), true).await?;
        Ok(Self::with_sink(config, sink))
    }

    /// Create an engine around an already opened sink
    pub fn with_sink(config: Arc<SyncConfig>, sink: LogSink) -> Self {
        Self {
            config,
            sink,
            cycle: 0,
        }
    }

    /// Configuration the engine runs with
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Number of cycles run so far
    pub fn cycles_run(&self) -> u64 {
        self.cycle
    }

    /// Compute the changes the next cycle would apply, without applying them
    pub async fn plan(&self) -> Result<ChangeSet> {
        let source = SnapshotBuilder::new(self.config.source()).build().await?;
        let replica = SnapshotBuilder::new(self.config.replica()).build().await?;
        Ok(detect_changes(&source, &replica))
    }

    /// Run one complete cycle
    ///
    /// The source is snapshotted before the replica. Per-file failures end up
    /// in the report; only a root that can no longer be read fails the cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycle += 1;
        debug!("Starting sync cycle {}", self.cycle);

        let source = SnapshotBuilder::new(self.config.source()).build().await?;
        let replica = SnapshotBuilder::new(self.config.replica()).build().await?;
        let changes = detect_changes(&source, &replica);

        let stats = if changes.is_empty() {
            SyncStats::new()
        } else {
            Applier::new(self.config.source(), self.config.replica(), &self.sink)
                .apply(&changes)
                .await
        };

        let report = CycleReport {
            cycle: self.cycle,
            modified: changes.modified.len(),
            added: changes.added.len(),
            deleted: changes.deleted.len(),
            unreadable: source.unreadable() + replica.unreadable(),
            stats,
            finished_at: Local::now(),
        };

        info!(
            "Cycle {} done: {} modified, {} created, {} deleted, {} bytes copied, {} errors in {:?}",
            report.cycle,
            report.stats.files_modified,
            report.stats.files_created,
            report.stats.files_deleted,
            report.stats.bytes_copied,
            report.stats.errors,
            report.stats.duration
        );
        Ok(report)
    }
}
