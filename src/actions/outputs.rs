//! Step outputs for GitHub Actions.
//!
//! Outputs are appended to the file named by `GITHUB_OUTPUT` using the
//! multi-line form with a random delimiter:
//!
//! ```text
//! cache-hit<<ghadelimiter_5b0c...
//! false
//! ghadelimiter_5b0c...
//! ```
//!
//! Without `GITHUB_OUTPUT` each output is printed to stdout as `name=value`.

use crate::core::{Result, SetupError};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// Environment variable naming the runner's output file.
pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Output: whether the tool cache already held the version.
pub const OUTPUT_CACHE_HIT: &str = "cache-hit";

/// Output: the resolved SQLite version.
pub const OUTPUT_VERSION: &str = "sqlite-version";

/// Output: the first directory published on the search path.
pub const OUTPUT_BIN: &str = "sqlite-bin";

/// Writer for step outputs.
#[derive(Debug, Clone, Default)]
pub struct ActionOutputs {
    output_file: Option<PathBuf>,
}

impl ActionOutputs {
    /// Write to `output_file`, or stdout when `None`.
    pub fn new(output_file: Option<PathBuf>) -> Self {
        Self {
            output_file,
        }
    }

    /// Write to the file named by `GITHUB_OUTPUT`, if set and non-empty.
    pub fn from_env() -> Self {
        Self::new(std::env::var_os(GITHUB_OUTPUT_ENV).filter(|v| !v.is_empty()).map(PathBuf::from))
    }

    /// Set output `name` to `value`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the output file cannot be written.
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        match &self.output_file {
            Some(path) => {
                let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
                let record = format_output(name, value, &delimiter)?;
                let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
                file.write_all(record.as_bytes())?;
                debug!(name, value, "Set step output");
            }
            None => println!("{name}={value}"),
        }
        Ok(())
    }
}

fn format_output(name: &str, value: &str, delimiter: &str) -> Result<String> {
    if name.contains(delimiter) || value.contains(delimiter) {
        return Err(SetupError::Other {
            message: format!("output '{name}' contains the delimiter '{delimiter}'"),
        });
    }
    Ok(format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"))
}
