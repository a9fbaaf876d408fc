//! Download URL construction.
//!
//! `url = prefix + year + "/" + artifact`, where the prefix always ends in
//! exactly one `/` no matter how it was configured.

use crate::core::Result;
use crate::utils::platform::Platform;
use crate::version::{CanonicalVersion, DEFAULT_ARTIFACT_PREFIX, artifact_filename, format_version, validate_year};

/// Everything needed to fetch one tool bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Artifact filename, e.g. `sqlite-tools-linux-x64-3470200.zip`
    pub filename: String,
    /// Absolute download URL
    pub url: String,
    /// Canonical form of the version
    pub canonical: CanonicalVersion,
    /// Four-digit release year
    pub year: String,
}

/// Builds download targets for one host prefix and platform.
///
/// # Examples
///
/// ```rust,no_run
/// use setup_sqlite::installer::UrlBuilder;
/// use setup_sqlite::utils::platform::Platform;
///
/// # fn example() -> setup_sqlite::core::Result<()> {
/// let target = UrlBuilder::new("https://www.sqlite.org", Platform::Linux).build("3.47.2", "2024")?;
/// assert_eq!(target.url, "https://www.sqlite.org/2024/sqlite-tools-linux-x64-3470200.zip");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    prefix: String,
    artifact_prefix: String,
    platform: Platform,
}

impl UrlBuilder {
    /// A builder for `url_prefix` on `platform`.
    pub fn new(url_prefix: &str, platform: Platform) -> Self {
        Self {
            prefix: normalize_prefix(url_prefix),
            artifact_prefix: DEFAULT_ARTIFACT_PREFIX.to_string(),
            platform,
        }
    }

    /// Override the product prefix of artifact names (`sqlite-` by default).
    #[must_use]
    pub fn with_artifact_prefix(mut self, artifact_prefix: &str) -> Self {
        self.artifact_prefix = artifact_prefix.to_string();
        self
    }

    /// The normalized host prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Target platform.
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// Build the download target for `version` released in `year`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidVersionFormat`](crate::core::SetupError::InvalidVersionFormat)
    /// or [`SetupError::InvalidYearFormat`](crate::core::SetupError::InvalidYearFormat).
    pub fn build(&self, version: &str, year: &str) -> Result<DownloadTarget> {
        let canonical = format_version(version)?;
        validate_year(year)?;

        let filename = artifact_filename(&self.artifact_prefix, &canonical, self.platform);
        let url = format!("{}{year}/{filename}", self.prefix);
        Ok(DownloadTarget {
            filename,
            url,
            canonical,
            year: year.to_string(),
        })
    }
}

/// Ensure `prefix` ends with exactly one `/`.
pub fn normalize_prefix(prefix: &str) -> String {
    format!("{}/", prefix.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SetupError;

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(normalize_prefix("https://example.org"), "https://example.org/");
        assert_eq!(normalize_prefix("https://example.org/"), "https://example.org/");
        assert_eq!(normalize_prefix("https://example.org///"), "https://example.org/");
    }

    #[test]
    fn test_exact_url_with_and_without_trailing_slash() {
        for prefix in ["https://example.org/", "https://example.org"] {
            let target = UrlBuilder::new(prefix, Platform::Linux)
                .with_artifact_prefix("")
                .build("3.4.0", "2022")
                .unwrap();
            assert_eq!(target.url, "https://example.org/2022/tools-linux-x86-3040000.zip");
            assert_eq!(target.filename, "tools-linux-x86-3040000.zip");
            assert_eq!(target.canonical.as_str(), "3040000");
        }
    }

    #[test]
    fn test_default_artifact_prefix() {
        let target = UrlBuilder::new("https://www.sqlite.org/", Platform::Windows)
            .build("3.47.2", "2024")
            .unwrap();
        assert_eq!(target.url, "https://www.sqlite.org/2024/sqlite-tools-win-x64-3470200.zip");
    }

    #[test]
    fn test_year_checked_for_explicit_pairs() {
        let builder = UrlBuilder::new("https://example.org/", Platform::MacOs);
        assert!(matches!(builder.build("3.47.2", "24"), Err(SetupError::InvalidYearFormat { .. })));
        assert!(matches!(builder.build("3.x", "2024"), Err(SetupError::InvalidVersionFormat { .. })));
    }
}
