//! Ordering of SQLite release tags.
//!
//! Release tags look like `version-3.47.2` (occasionally with a fourth
//! component, `version-3.8.11.1`). Picking the latest release compares the
//! first three numeric components left to right; the fourth never takes part.
//!
//! # Examples
//!
//! ```rust,no_run
//! use setup_sqlite::version::comparison::select_latest;
//!
//! let tags = ["version-3.46.1", "version-3.47.2", "version-3.47.0"];
//! let (name, version) = select_latest(tags).expect("at least one tag");
//! assert_eq!(name, "version-3.47.2");
//! assert_eq!(version.to_string(), "3.47.2");
//! ```

use crate::constants::{TAG_PREFIX, TAG_REF_PREFIX};
use std::fmt;

/// Maximum number of components that take part in ordering.
const COMPARED_COMPONENTS: usize = 3;

/// A release version parsed from a tag name.
///
/// Ordering is the derived lexicographic order of the compared components,
/// so a missing component sorts before any present one (`3.47` < `3.47.0`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagVersion {
    key: Vec<u64>,
    version: String,
}

impl TagVersion {
    /// Parse a tag name or fully qualified ref into a version.
    ///
    /// Accepts `refs/tags/version-3.47.2`, `version-3.47.2` or a bare
    /// `3.47.2`. Returns `None` when any compared component is not a
    /// non-negative integer.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let version = tag
            .strip_prefix(TAG_REF_PREFIX)
            .or_else(|| tag.strip_prefix(TAG_PREFIX))
            .unwrap_or(tag);
        if version.is_empty() {
            return None;
        }

        let key = version
            .split('.')
            .take(COMPARED_COMPONENTS)
            .map(|component| component.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            key,
            version: version.to_string(),
        })
    }

    /// The dotted version exactly as written in the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for TagVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.version)
    }
}

/// Pick the latest release among tag names.
///
/// Names that do not parse are skipped. When two tags compare equal the one
/// seen first wins.
///
/// # Returns
///
/// The winning tag name together with its parsed version, or `None` when no
/// name parses.
pub fn select_latest<'a, I, S>(tags: I) -> Option<(&'a str, TagVersion)>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    let mut best: Option<(&'a str, TagVersion)> = None;
    for tag in tags {
        let name = tag.as_ref();
        let Some(candidate) = TagVersion::parse(name) else {
            tracing::debug!(tag = name, "Skipping tag without a numeric version");
            continue;
        };
        let newer = match &best {
            Some((_, current)) => candidate.key > current.key,
            None => true,
        };
        if newer {
            best = Some((name, candidate));
        }
    }
    best
}
