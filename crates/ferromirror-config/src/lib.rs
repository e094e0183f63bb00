//! Configuration management for FerroMirror
//!
//! The synchronizer is driven by four values: the source directory, the
//! replica directory, the change log file and the scan interval. This crate
//! turns layered inputs (defaults, an optional config file, environment
//! variables and command-line overrides) into one validated, immutable
//! [`SyncConfig`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use ferromirror_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_source_file("ferromirror.toml")
//!     .add_env_prefix("FERROMIRROR")
//!     .interval("10")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Mirroring {} every {}s", config.source().display(), config.interval_secs());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ENV_PREFIX};

/// Configuration keys shared by every layer
pub mod keys {
    /// Source directory
    pub const SOURCE: &str = "source";
    /// Replica directory
    pub const REPLICA: &str = "replica";
    /// Change log file
    pub const LOG_FILE: &str = "log_file";
    /// Seconds between the end of one cycle and the start of the next
    pub const INTERVAL_SECS: &str = "interval_secs";
}

/// Default source directory, relative to the working directory
pub const DEFAULT_SOURCE: &str = "source";
/// Default replica directory, relative to the working directory
pub const DEFAULT_REPLICA: &str = "replica";
/// Default change log file, relative to the working directory
pub const DEFAULT_LOG_FILE: &str = "log";
/// Default scan interval in seconds
pub const DEFAULT_INTERVAL_SECS: u64 = 30;

/// Validated synchronization settings
///
/// Built once at startup and shared read-only afterwards. Changing the
/// interval at runtime is done by messaging the scheduler, not by mutating
/// this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    source: PathBuf,
    replica: PathBuf,
    log_file: PathBuf,
    interval_secs: u64,
}

impl SyncConfig {
    /// Assemble a configuration without validating it
    ///
    /// Prefer [`ConfigBuilder`], which checks that the paths exist.
    pub fn new(
        source: impl Into<PathBuf>,
        replica: impl Into<PathBuf>,
        log_file: impl Into<PathBuf>,
        interval_secs: u64,
    ) -> Self {
        Self {
            source: source.into(),
            replica: replica.into(),
            log_file: log_file.into(),
            interval_secs,
        }
    }

    /// Directory whose contents are the truth
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Directory mutated to match the source
    pub fn replica(&self) -> &Path {
        &self.replica
    }

    /// Append-only change log
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Interval between cycles in whole seconds
    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Interval between cycles
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Render the configuration in the given format
    pub fn render(&self, format: ConfigFormat) -> ConfigResult<String> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| {
                ConfigError::serialization(format!("Failed to serialize to TOML: {}", e))
            }),
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(|e| {
                ConfigError::serialization(format!("Failed to serialize to YAML: {}", e))
            }),
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| {
                ConfigError::serialization(format!("Failed to serialize to JSON: {}", e))
            }),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_SOURCE,
            DEFAULT_REPLICA,
            DEFAULT_LOG_FILE,
            DEFAULT_INTERVAL_SECS,
        )
    }
}

/// Serialization formats understood for config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// TOML
    #[default]
    Toml,
    /// YAML
    Yaml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension, defaulting to TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::Yaml,
            Some("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

impl From<ConfigFormat> for config::FileFormat {
    fn from(format: ConfigFormat) -> Self {
        match format {
            ConfigFormat::Toml => config::FileFormat::Toml,
            ConfigFormat::Yaml => config::FileFormat::Yaml,
            ConfigFormat::Json => config::FileFormat::Json,
        }
    }
}
