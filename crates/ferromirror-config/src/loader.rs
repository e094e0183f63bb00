//! Configuration loader utilities

use crate::{ConfigError, ConfigFormat, ConfigResult, SyncConfig};
use std::path::{Path, PathBuf};

/// File names probed in the working directory when no config file is given
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "ferromirror.toml",
    "ferromirror.yaml",
    "ferromirror.yml",
    "ferromirror.json",
];

/// Environment variable prefix used by the command-line tool
pub const ENV_PREFIX: &str = "FERROMIRROR";

/// Configuration loader with common loading patterns
pub struct ConfigLoader;

impl ConfigLoader {
    /// First existing default config file inside `dir`
    pub fn find_default_file(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Save configuration to a file, choosing the format from its extension
    pub fn save_to_file<P: AsRef<Path>>(config: &SyncConfig, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = config.render(ConfigFormat::from_path(path))?;

        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
