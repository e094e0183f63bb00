//! Configuration builder for layered configuration loading

use crate::{
    keys, ConfigError, ConfigFormat, ConfigResult, SyncConfig, DEFAULT_INTERVAL_SECS,
    DEFAULT_LOG_FILE, DEFAULT_REPLICA, DEFAULT_SOURCE,
};
use config::{Environment, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration builder for loading configuration from multiple sources
///
/// Layers are applied in a fixed order, later layers winning: built-in
/// defaults, the config file, environment variables, explicit overrides.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    file: Option<PathBuf>,
    env_prefix: Option<String>,
    overrides: Vec<(&'static str, String)>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration file source; it must exist when [`build`](Self::build) runs
    pub fn add_source_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Add environment variable source with prefix, e.g. `FERROMIRROR_INTERVAL_SECS`
    pub fn add_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Override the source directory
    pub fn source<P: AsRef<Path>>(self, path: P) -> Self {
        self.with_override(keys::SOURCE, path_value(path.as_ref()))
    }

    /// Override the replica directory
    pub fn replica<P: AsRef<Path>>(self, path: P) -> Self {
        self.with_override(keys::REPLICA, path_value(path.as_ref()))
    }

    /// Override the change log file
    pub fn log_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.with_override(keys::LOG_FILE, path_value(path.as_ref()))
    }

    /// Override the interval with raw user input; parsed during [`build`](Self::build)
    pub fn interval<S: Into<String>>(self, seconds: S) -> Self {
        self.with_override(keys::INTERVAL_SECS, seconds.into())
    }

    fn with_override(mut self, key: &'static str, value: String) -> Self {
        self.overrides.push((key, value));
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> ConfigResult<SyncConfig> {
        let config = self.build_unchecked()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Build the configuration without checking the filesystem
    ///
    /// The interval is still parsed; only path existence checks are skipped.
    pub fn build_unchecked(self) -> ConfigResult<SyncConfig> {
        let mut inner = config::Config::builder()
            .set_default(keys::SOURCE, DEFAULT_SOURCE)?
            .set_default(keys::REPLICA, DEFAULT_REPLICA)?
            .set_default(keys::LOG_FILE, DEFAULT_LOG_FILE)?
            .set_default(keys::INTERVAL_SECS, DEFAULT_INTERVAL_SECS as i64)?;

        if let Some(path) = &self.file {
            if !path.exists() {
                return Err(ConfigError::Io {
                    path: path.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "Configuration file not found",
                    ),
                });
            }
            debug!("Loading configuration file {}", path.display());
            inner = inner.add_source(
                File::from(path.clone()).format(ConfigFormat::from_path(path).into()),
            );
        }

        if let Some(prefix) = &self.env_prefix {
            inner = inner.add_source(Environment::with_prefix(prefix).try_parsing(true));
        }

        for (key, value) in &self.overrides {
            inner = inner.set_override(*key, value.clone())?;
        }

        let settings = inner.build().map_err(|e| match &self.file {
            Some(path) => ConfigError::Parse {
                path: path.clone(),
                message: e.to_string(),
            },
            None => e.into(),
        })?;

        let interval_secs = Self::parse_interval(&settings)?;

        Ok(SyncConfig::new(
            settings.get_string(keys::SOURCE)?,
            settings.get_string(keys::REPLICA)?,
            settings.get_string(keys::LOG_FILE)?,
            interval_secs,
        ))
    }

    /// Parse the interval from its textual form
    ///
    /// The `config` crate coerces words such as `yes` or `on` to integers, so
    /// the raw string is parsed here instead.
    fn parse_interval(settings: &config::Config) -> ConfigResult<u64> {
        let not_a_number =
            || ConfigError::invalid_value(keys::INTERVAL_SECS, "Input is not a number");

        let raw = settings
            .get_string(keys::INTERVAL_SECS)
            .map_err(|_| not_a_number())?;
        let raw = raw.trim();

        match raw.parse::<u64>() {
            Ok(secs) => Ok(secs),
            Err(_) if raw.parse::<i64>().is_ok() => Err(ConfigError::invalid_value(
                keys::INTERVAL_SECS,
                format!("must be a non-negative number of seconds, got {}", raw),
            )),
            Err(_) => Err(not_a_number()),
        }
    }

    /// Validate the configuration against the filesystem
    fn validate(config: &SyncConfig) -> ConfigResult<()> {
        Self::require_directory(keys::SOURCE, config.source())?;
        Self::require_directory(keys::REPLICA, config.replica())?;

        let log_file = config.log_file();
        if log_file.is_dir() {
            return Err(ConfigError::invalid_value(
                keys::LOG_FILE,
                format!("'{}' is a directory", log_file.display()),
            ));
        }
        if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(ConfigError::invalid_value(
                    keys::LOG_FILE,
                    format!("Folder path doesn't exist: {}", parent.display()),
                ));
            }
        }

        let source = canonical(config.source())?;
        let replica = canonical(config.replica())?;
        if source == replica {
            return Err(ConfigError::validation(
                "Source and replica must be different directories",
            ));
        }
        if source.starts_with(&replica) || replica.starts_with(&source) {
            return Err(ConfigError::validation(
                "Source and replica must not be nested inside one another",
            ));
        }

        Ok(())
    }

    fn require_directory(key: &str, path: &Path) -> ConfigResult<()> {
        if path.is_dir() {
            Ok(())
        } else {
            Err(ConfigError::invalid_value(
                key,
                format!("Folder path doesn't exist: {}", path.display()),
            ))
        }
    }
}

fn path_value(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn canonical(path: &Path) -> ConfigResult<PathBuf> {
    path.canonicalize().map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
