//! Host platform detection
//!
//! SQLite publishes precompiled tool bundles for three operating systems.
//! [`Platform`] names them and maps runtime identifiers (`std::env::consts::OS`
//! values and the `process.platform` spellings runners use) onto them.
//!
//! # Examples
//!
//! ```rust,no_run
//! use setup_sqlite::utils::platform::Platform;
//!
//! # fn example() -> setup_sqlite::core::Result<()> {
//! let platform = Platform::current()?;
//! println!("installing for {platform}");
//!
//! assert_eq!(Platform::from_identifier("darwin")?, Platform::MacOs);
//! # Ok(())
//! # }
//! ```

use crate::core::{Result, SetupError};
use std::fmt;
use std::str::FromStr;

/// Operating systems with a published SQLite tool bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Microsoft Windows
    Windows,
    /// Linux
    Linux,
    /// Apple macOS
    MacOs,
}

impl Platform {
    /// Detect the platform this binary runs on.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::UnsupportedPlatform`] on any other operating system.
    pub fn current() -> Result<Self> {
        Self::from_identifier(std::env::consts::OS)
    }

    /// Map a platform identifier onto a [`Platform`].
    ///
    /// Accepts both Rust (`windows`, `macos`) and Node-style (`win32`,
    /// `darwin`) spellings, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::UnsupportedPlatform`] for anything else.
    pub fn from_identifier(id: &str) -> Result<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "win32" | "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "darwin" | "macos" | "osx" => Ok(Self::MacOs),
            _ => Err(SetupError::UnsupportedPlatform {
                platform: id.to_string(),
            }),
        }
    }

    /// Whether this is Windows.
    #[must_use]
    pub const fn is_windows(self) -> bool {
        matches!(self, Self::Windows)
    }
}

impl FromStr for Platform {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_identifier(s)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::MacOs => "macos",
        };
        f.write_str(name)
    }
}
