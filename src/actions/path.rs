//! Publishing directories on the executable search path.
//!
//! On a GitHub Actions runner, lines appended to the file named by
//! `GITHUB_PATH` are prepended to `PATH` for every later step. Outside a
//! runner the directories are only recorded, and [`RunnerPath::search_path`]
//! yields a `PATH` value callers can hand to child processes.

use crate::core::{Result, SetupError};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

/// Environment variable naming the runner's path file.
pub const GITHUB_PATH_ENV: &str = "GITHUB_PATH";

/// Search path collaborator used by the installer.
pub trait SearchPath: Send + Sync {
    /// Make executables in `dir` visible to later steps.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be published.
    fn add_path(&self, dir: &Path) -> Result<()>;
}

/// [`SearchPath`] writing to `GITHUB_PATH` when available.
#[derive(Debug, Default)]
pub struct RunnerPath {
    path_file: Option<PathBuf>,
    added: Mutex<Vec<PathBuf>>,
}

impl RunnerPath {
    /// Publish through `path_file`, or only record when `None`.
    pub fn new(path_file: Option<PathBuf>) -> Self {
        Self {
            path_file,
            added: Mutex::new(Vec::new()),
        }
    }

    /// Publish through the file named by `GITHUB_PATH`, if set and non-empty.
    pub fn from_env() -> Self {
        Self::new(std::env::var_os(GITHUB_PATH_ENV).filter(|v| !v.is_empty()).map(PathBuf::from))
    }

    /// Directories published so far, in order.
    pub fn added(&self) -> Vec<PathBuf> {
        self.added.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The current `PATH` with every published directory in front, most
    /// recent first.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ConfigError`] if a directory contains the
    /// platform's path separator.
    pub fn search_path(&self) -> Result<OsString> {
        let current = std::env::var_os("PATH").unwrap_or_default();
        let mut dirs: Vec<PathBuf> = self.added().into_iter().rev().collect();
        dirs.extend(std::env::split_paths(&current));
        std::env::join_paths(dirs).map_err(|e| SetupError::ConfigError {
            message: format!("cannot build PATH: {e}"),
        })
    }
}

impl SearchPath for RunnerPath {
    fn add_path(&self, dir: &Path) -> Result<()> {
        if let Some(path_file) = &self.path_file {
            let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path_file)?;
            writeln!(file, "{}", dir.display())?;
            debug!(path_file = %path_file.display(), dir = %dir.display(), "Appended to GITHUB_PATH");
        }

        info!(dir = %dir.display(), "Added to search path");
        self.added.lock().unwrap_or_else(PoisonError::into_inner).push(dir.to_path_buf());
        Ok(())
    }
}
