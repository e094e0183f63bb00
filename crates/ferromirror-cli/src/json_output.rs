//! JSON output structures for the FerroMirror CLI

use chrono::Local;
use ferromirror_config::SyncConfig;
use ferromirror_sync::{ChangeSet, CycleReport};
use serde::Serialize;

/// Metadata shared by every JSON document the CLI prints
#[derive(Debug, Serialize)]
pub struct OperationMetadata {
    /// FerroMirror version
    pub version: String,
    /// Operation type
    pub operation: String,
    /// Timestamp when the document was produced
    pub timestamp: String,
    /// Source path
    pub source_path: String,
    /// Replica path
    pub replica_path: String,
}

impl OperationMetadata {
    fn new(operation: &str, config: &SyncConfig) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            operation: operation.to_string(),
            timestamp: Local::now().to_rfc3339(),
            source_path: config.source().display().to_string(),
            replica_path: config.replica().display().to_string(),
        }
    }
}

/// Pending changes, as printed by `ferromirror plan --json`
#[derive(Debug, Serialize)]
pub struct PlanJson {
    /// Operation metadata
    pub metadata: OperationMetadata,
    /// Files whose content differs
    pub modified: Vec<String>,
    /// Files only in the source
    pub added: Vec<String>,
    /// Files only in the replica
    pub deleted: Vec<String>,
    /// Total number of pending changes
    pub total: usize,
}

impl PlanJson {
    /// Build the document for `changes`
    pub fn new(config: &SyncConfig, changes: &ChangeSet) -> Self {
        let names = |ids: &[ferromirror_types::FileIdentity]| {
            ids.iter().map(ToString::to_string).collect::<Vec<_>>()
        };
        Self {
            metadata: OperationMetadata::new("plan", config),
            modified: names(&changes.modified),
            added: names(&changes.added),
            deleted: names(&changes.deleted),
            total: changes.len(),
        }
    }
}

/// One completed cycle, as printed by `ferromirror run --once --json`
#[derive(Debug, Serialize)]
pub struct CycleJson<'a> {
    /// Operation metadata
    pub metadata: OperationMetadata,
    /// The cycle itself
    pub report: &'a CycleReport,
}

impl<'a> CycleJson<'a> {
    /// Build the document for `report`
    pub fn new(config: &SyncConfig, report: &'a CycleReport) -> Self {
        Self {
            metadata: OperationMetadata::new("sync", config),
            report,
        }
    }
}

/// Serialize `value` as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
