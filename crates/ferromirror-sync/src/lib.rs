//! One-way directory mirroring for FerroMirror
//!
//! This crate keeps a replica directory identical to a source directory:
//!
//! - **Hashing**: streamed XXH3-128 fingerprints of file contents
//! - **Snapshots**: identity-to-fingerprint maps rebuilt from scratch every cycle
//! - **Diffing**: identity-keyed classification into modified, added and deleted
//! - **Applying**: whole-file copies staged beside their destination, deletions
//!   with empty-directory pruning, one change log line per success
//! - **Scheduling**: a periodic worker driven by a cancellation token and
//!   reconfigured through messages
//!
//! # Examples
//!
//! ```rust,no_run
//! use ferromirror_config::ConfigBuilder;
//! use ferromirror_sync::SyncEngine;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigBuilder::new()
//!     .source("source")
//!     .replica("replica")
//!     .log_file("changes.log")
//!     .build()?;
//!
//! let mut engine = SyncEngine::new(Arc::new(config)).await?;
//! let report = engine.run_cycle().await?;
//! println!("{} files created", report.stats.files_created);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod apply;
pub mod diff;
pub mod engine;
pub mod hash;
pub mod log_sink;
pub mod scheduler;
pub mod snapshot;

pub use apply::Applier;
pub use diff::{detect_changes, ChangeSet, ChangeType};
pub use engine::{CycleReport, SyncEngine};
pub use hash::hash_file;
pub use log_sink::{LogRecord, LogSink};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerMessage, SchedulerState};
pub use snapshot::{Snapshot, SnapshotBuilder};
