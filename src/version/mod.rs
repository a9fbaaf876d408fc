//! SQLite version codec
//!
//! SQLite names its download artifacts with a compact, fixed-width digit form
//! of the release version: `3.47.2` becomes `3470200`. This module converts
//! between the dotted form users type and that canonical form, and derives
//! the CPU architecture of the published bundle from it.
//!
//! # Canonical Form
//!
//! The first component is kept as written. The second, third and fourth
//! components are each zero-padded to two digits, and missing components
//! count as `00`:
//!
//! | Input | Canonical |
//! |-------|-----------|
//! | `3.47.2` | `3470200` |
//! | `3.8.11.1` | `3081101` |
//! | `3.4` | `3040000` |
//! | `10.0.0` | `10000000` |
//!
//! The canonical string is therefore always `len(first component) + 6`
//! characters long.
//!
//! # Examples
//!
//! ```rust,no_run
//! use setup_sqlite::version::{Architecture, format_version};
//!
//! # fn example() -> setup_sqlite::core::Result<()> {
//! let canonical = format_version("3.47.2")?;
//! assert_eq!(canonical.as_str(), "3470200");
//! assert_eq!(canonical.architecture(), Architecture::X64);
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod comparison;

pub use artifact::{DEFAULT_ARTIFACT_PREFIX, artifact_filename, build_artifact_filename};
pub use comparison::{TagVersion, select_latest};

use crate::constants::X64_FIRST_MINOR;
use crate::core::{Result, SetupError};
use regex::Regex;
use std::fmt;

/// Number of components encoded after the first one.
const PADDED_COMPONENTS: usize = 3;

/// Width of every padded component.
const COMPONENT_WIDTH: usize = 2;

/// CPU architecture of a published tool bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    /// 32-bit x86
    X86,
    /// 64-bit x86
    X64,
}

impl Architecture {
    /// Name used in artifact filenames and tool-cache paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A version in SQLite's canonical digit form.
///
/// Only constructed through [`format_version`], so the digit string is
/// always well formed: ASCII digits, at least seven characters, with the
/// trailing six holding minor, patch and sub-patch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalVersion {
    digits: String,
}

impl CanonicalVersion {
    /// The canonical digit string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.digits
    }

    /// The major field: everything except the trailing six digits.
    #[must_use]
    pub fn major_digits(&self) -> &str {
        &self.digits[..self.split_point()]
    }

    /// The major field as a number.
    ///
    /// Majors too large for `u64` saturate, which still orders them above
    /// every real release.
    #[must_use]
    pub fn major(&self) -> u64 {
        self.major_digits().parse().unwrap_or(u64::MAX)
    }

    /// The two-digit minor field.
    #[must_use]
    pub fn minor(&self) -> u32 {
        let start = self.split_point();
        self.digits[start..start + COMPONENT_WIDTH].parse().unwrap_or(0)
    }

    /// Architecture of the tool bundle published for this version.
    ///
    /// Majors below 2 are 32-bit, majors above 3 are 64-bit. Within 3.x the
    /// switch to 64-bit bundles happened at 3.44. Major 2 falls through to
    /// 64-bit.
    #[must_use]
    pub fn architecture(&self) -> Architecture {
        let major = self.major();
        if major < 2 {
            Architecture::X86
        } else if major > 3 {
            Architecture::X64
        } else if major == 3 && self.minor() < X64_FIRST_MINOR {
            Architecture::X86
        } else {
            Architecture::X64
        }
    }

    fn split_point(&self) -> usize {
        self.digits.len() - PADDED_COMPONENTS * COMPONENT_WIDTH
    }
}

impl fmt::Display for CanonicalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digits)
    }
}

/// Convert a dotted version into SQLite's canonical digit form.
///
/// # Errors
///
/// Returns [`SetupError::InvalidVersionFormat`] when the input is empty, has
/// more than four components, contains anything other than ASCII digits, or
/// has a component after the first that is not one or two digits long.
pub fn format_version(version: &str) -> Result<CanonicalVersion> {
    let invalid = || SetupError::InvalidVersionFormat {
        version: version.to_string(),
    };

    let components: Vec<&str> = version.split('.').collect();
    let (first, rest) = components.split_first().ok_or_else(invalid)?;
    if rest.len() > PADDED_COMPONENTS || !is_digits(first) {
        return Err(invalid());
    }
    if rest.iter().any(|c| !is_digits(c) || c.len() > COMPONENT_WIDTH) {
        return Err(invalid());
    }

    let mut digits = String::with_capacity(first.len() + PADDED_COMPONENTS * COMPONENT_WIDTH);
    digits.push_str(first);
    for index in 0..PADDED_COMPONENTS {
        let component = rest.get(index).copied().unwrap_or("0");
        digits.push_str(&format!("{component:0>COMPONENT_WIDTH$}"));
    }

    Ok(CanonicalVersion {
        digits,
    })
}

/// Check that a release year is exactly four ASCII digits.
///
/// # Errors
///
/// Returns [`SetupError::InvalidYearFormat`] for anything else.
pub fn validate_year(year: &str) -> Result<()> {
    let pattern = Regex::new(r"^[0-9]{4}$").map_err(|e| SetupError::Other {
        message: e.to_string(),
    })?;
    if pattern.is_match(year) {
        Ok(())
    } else {
        Err(SetupError::InvalidYearFormat {
            year: year.to_string(),
        })
    }
}

fn is_digits(component: &str) -> bool {
    !component.is_empty() && component.bytes().all(|b| b.is_ascii_digit())
}
