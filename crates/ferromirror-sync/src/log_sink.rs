//! Append-only change log

use crate::diff::ChangeType;
use chrono::{DateTime, Local};
use ferromirror_types::{Error, FileIdentity, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Timestamp format used at the start of every log line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One applied change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// When the change was applied
    pub timestamp: DateTime<Local>,
    /// File the change applied to
    pub identity: FileIdentity,
    /// What happened to it
    pub change: ChangeType,
}

impl LogRecord {
    /// Create a record stamped with the current local time
    pub fn new(identity: FileIdentity, change: ChangeType) -> Self {
        Self {
            timestamp: Local::now(),
            identity,
            change,
        }
    }

    /// Full log file line, newline-terminated
    pub fn to_line(&self) -> String {
        format!("{} {}\n", self.timestamp.format(TIMESTAMP_FORMAT), self)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File: {} was {}", self.identity, self.change)
    }
}

/// Serialized appender for [`LogRecord`]s
///
/// Each record is written to the log file and, when echo is on, printed to
/// stdout. Appends are serialized behind a mutex so any number of tasks can
/// share one sink.
#[derive(Debug)]
pub struct LogSink {
    path: PathBuf,
    file: Mutex<File>,
    echo: bool,
}

impl LogSink {
    /// Open (creating if needed) the log file in append mode
    pub async fn open<P: AsRef<Path>>(path: P, echo: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| {
                Error::sync(format!(
                    "Cannot open log file '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            echo,
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record
    pub async fn append(&self, record: &LogRecord) -> Result<()> {
        if self.echo {
            println!("{}", record);
        }
        debug!("{}", record);

        let line = record.to_line();
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| Error::file_access(&self.path, &e))?;
        file.flush()
            .await
            .map_err(|e| Error::file_access(&self.path, &e))
    }
}
