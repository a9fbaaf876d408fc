//! Tool cache storing unpacked SQLite bundles
//!
//! The cache keeps one directory per `(tool, version)` pair and uses the same
//! layout as the GitHub Actions hosted tool cache, so bundles stored by this
//! crate are found by other tooling on the runner and vice versa:
//!
//! ```text
//! $RUNNER_TOOL_CACHE/
//! └── sqlite/
//!     └── 3.47.2/
//!         ├── x64/            # unpacked bundle
//!         └── x64.complete    # written last; marks the entry usable
//! ```
//!
//! An entry without its `.complete` marker is treated as absent and is
//! replaced by the next store.
//!
//! # Examples
//!
//! ```rust,no_run
//! use setup_sqlite::cache::{DirToolCache, ToolCache};
//! use std::path::Path;
//!
//! # fn example() -> setup_sqlite::core::Result<()> {
//! let cache = DirToolCache::new("/opt/hostedtoolcache");
//! if cache.find("sqlite", "3.47.2").is_none() {
//!     let path = cache.store(Path::new("/tmp/unpacked"), "sqlite", "3.47.2")?;
//!     println!("cached at {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

use crate::core::{Result, SetupError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Suffix of the marker file written once an entry is complete.
const COMPLETE_SUFFIX: &str = "complete";

/// Cache store collaborator used by the installer.
pub trait ToolCache: Send + Sync {
    /// Path of the cached entry for `(tool, version)`, if one is complete.
    fn find(&self, tool: &str, version: &str) -> Option<PathBuf>;

    /// Copy `source_dir` into the cache under `(tool, version)` and return
    /// the canonical cache path.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::CacheStoreFailed`] on any filesystem failure.
    fn store(&self, source_dir: &Path, tool: &str, version: &str) -> Result<PathBuf>;
}

/// Directory-backed [`ToolCache`].
#[derive(Debug, Clone)]
pub struct DirToolCache {
    root: PathBuf,
    arch: String,
}

impl DirToolCache {
    /// A cache rooted at `root` for the host architecture.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_arch(root, host_arch())
    }

    /// A cache rooted at `root` for an explicit architecture directory name.
    pub fn with_arch(root: impl Into<PathBuf>, arch: &str) -> Self {
        Self {
            root: root.into(),
            arch: arch.to_string(),
        }
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory an entry for `(tool, version)` lives in.
    pub fn entry_path(&self, tool: &str, version: &str) -> PathBuf {
        self.root.join(tool).join(version).join(&self.arch)
    }

    fn marker_path(&self, tool: &str, version: &str) -> PathBuf {
        self.root.join(tool).join(version).join(format!("{}.{COMPLETE_SUFFIX}", self.arch))
    }
}

impl ToolCache for DirToolCache {
    fn find(&self, tool: &str, version: &str) -> Option<PathBuf> {
        let entry = self.entry_path(tool, version);
        if entry.is_dir() && self.marker_path(tool, version).is_file() {
            debug!(tool, version, path = %entry.display(), "Tool cache hit");
            Some(entry)
        } else {
            debug!(tool, version, "Tool cache miss");
            None
        }
    }

    fn store(&self, source_dir: &Path, tool: &str, version: &str) -> Result<PathBuf> {
        let failed = |reason: String| SetupError::CacheStoreFailed {
            tool: tool.to_string(),
            version: version.to_string(),
            reason,
        };

        let entry = self.entry_path(tool, version);
        let marker = self.marker_path(tool, version);
        let version_dir = entry.parent().ok_or_else(|| failed("invalid cache path".to_string()))?;
        std::fs::create_dir_all(version_dir).map_err(|e| failed(e.to_string()))?;

        remove_if_exists(&marker).map_err(|e| failed(e.to_string()))?;
        if entry.exists() {
            std::fs::remove_dir_all(&entry).map_err(|e| failed(e.to_string()))?;
        }

        // Copy into a sibling staging directory so a half-copied tree is never
        // visible under the entry name
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(version_dir)
            .map_err(|e| failed(e.to_string()))?;
        copy_tree(source_dir, staging.path()).map_err(|e| failed(e.to_string()))?;
        std::fs::rename(staging.path(), &entry).map_err(|e| failed(e.to_string()))?;
        drop(staging);

        std::fs::write(&marker, b"").map_err(|e| failed(e.to_string()))?;
        info!(tool, version, path = %entry.display(), "Stored in tool cache");
        Ok(entry)
    }
}

/// Architecture directory name for the host, as the hosted tool cache spells it.
fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "x86" => "x86",
        "aarch64" => "arm64",
        "arm" => "arm",
        other => other,
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn copy_tree(source: &Path, destination: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(std::io::Error::other)?;
        let relative = entry.path().strip_prefix(source).map_err(std::io::Error::other)?;
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(std::fs::read_link(link)?, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::copy(link, target).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn unpacked(temp: &TempDir) -> PathBuf {
        let source = temp.path().join("unpacked");
        std::fs::create_dir_all(source.join("bin")).unwrap();
        std::fs::write(source.join("bin").join("sqlite3"), b"binary").unwrap();
        std::fs::write(source.join("README"), b"readme").unwrap();
        source
    }

    #[test]
    fn test_store_then_find() {
        let temp = TempDir::new().unwrap();
        let cache = DirToolCache::with_arch(temp.path().join("cache"), "x64");
        assert!(cache.find("sqlite", "3.47.2").is_none());

        let stored = cache.store(&unpacked(&temp), "sqlite", "3.47.2").unwrap();
        assert_eq!(stored, temp.path().join("cache/sqlite/3.47.2/x64"));
        assert!(stored.join("bin/sqlite3").is_file());
        assert!(temp.path().join("cache/sqlite/3.47.2/x64.complete").is_file());
        assert_eq!(cache.find("sqlite", "3.47.2"), Some(stored));
        assert!(cache.find("sqlite", "3.47.1").is_none());
    }

    #[test]
    fn test_entry_without_marker_is_a_miss_and_gets_replaced() {
        let temp = TempDir::new().unwrap();
        let cache = DirToolCache::with_arch(temp.path().join("cache"), "x64");
        let stale = cache.entry_path("sqlite", "3.40.0");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("leftover"), b"partial").unwrap();
        assert!(cache.find("sqlite", "3.40.0").is_none());

        let stored = cache.store(&unpacked(&temp), "sqlite", "3.40.0").unwrap();
        assert!(!stored.join("leftover").exists());
        assert!(cache.find("sqlite", "3.40.0").is_some());
    }

    #[test]
    fn test_store_leaves_no_staging_directories() {
        let temp = TempDir::new().unwrap();
        let cache = DirToolCache::with_arch(temp.path().join("cache"), "x86");
        cache.store(&unpacked(&temp), "sqlite", "3.4.0").unwrap();

        let names: Vec<String> = std::fs::read_dir(temp.path().join("cache/sqlite/3.4.0"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "unexpected entries: {names:?}");
        assert!(names.iter().all(|n| !n.starts_with(".staging-")));
    }

    #[test]
    fn test_store_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let cache = DirToolCache::new(temp.path().join("cache"));
        let err = cache.store(&temp.path().join("nope"), "sqlite", "3.47.2").unwrap_err();
        assert!(matches!(err, SetupError::CacheStoreFailed { .. }));
        assert!(cache.find("sqlite", "3.47.2").is_none());
    }
}
