//! Shared fixtures for FerroMirror integration tests

use ferromirror_config::SyncConfig;
use ferromirror_sync::{LogSink, SyncEngine};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use walkdir::WalkDir;

/// A source root, a replica root and a log file inside one temporary directory
pub struct MirrorFixture {
    _temp_dir: TempDir,
    /// Source root
    pub source: PathBuf,
    /// Replica root
    pub replica: PathBuf,
    /// Change log file
    pub log_file: PathBuf,
}

impl MirrorFixture {
    /// Create empty source and replica roots
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("source");
        let replica = temp_dir.path().join("replica");
        fs::create_dir(&source)?;
        fs::create_dir(&replica)?;
        let log_file = temp_dir.path().join("changes.log");

        Ok(Self {
            _temp_dir: temp_dir,
            source,
            replica,
            log_file,
        })
    }

    /// Configuration pointing at this fixture
    pub fn config(&self, interval_secs: u64) -> SyncConfig {
        SyncConfig::new(&self.source, &self.replica, &self.log_file, interval_secs)
    }

    /// Engine over this fixture that does not echo to stdout
    pub async fn engine(&self, interval_secs: u64) -> ferromirror_types::Result<SyncEngine> {
        let config = Arc::new(self.config(interval_secs));
        let sink = LogSink::open(&self.log_file, false).await?;
        Ok(SyncEngine::with_sink(config, sink))
    }

    /// Change log lines with their timestamps removed
    pub fn log_messages(&self) -> Vec<String> {
        fs::read_to_string(&self.log_file)
            .unwrap_or_default()
            .lines()
            .filter_map(|line| line.find("File: ").map(|at| line[at..].to_string()))
            .collect()
    }
}

/// Write `files` (relative path, content) below `root`, creating directories
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) -> std::io::Result<()> {
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(())
}

/// Every regular file below `root`, keyed by `/`-separated relative path
pub fn read_tree(root: &Path) -> std::io::Result<BTreeMap<String, Vec<u8>>> {
    let mut tree = BTreeMap::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        tree.insert(key, fs::read(entry.path())?);
    }
    Ok(tree)
}

/// Directories below `root`, keyed by `/`-separated relative path
pub fn read_dirs(root: &Path) -> Vec<String> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect()
}

/// Deterministic pseudo-random content
pub fn generate_content(size: usize, seed: u8) -> Vec<u8> {
    (0..size)
        .map(|i| ((i * 7 + 13 + usize::from(seed) * 31) % 256) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_tree() {
        let fixture = MirrorFixture::new().unwrap();
        write_tree(&fixture.source, &[("a.txt", b"a"), ("d/e/f.txt", b"f")]).unwrap();

        let tree = read_tree(&fixture.source).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree["d/e/f.txt"], b"f");
        assert_eq!(read_dirs(&fixture.source).len(), 2);
    }

    #[test]
    fn test_generate_content_depends_on_seed() {
        assert_eq!(generate_content(64, 1), generate_content(64, 1));
        assert_ne!(generate_content(64, 1), generate_content(64, 2));
    }
}
