//! Artifact filenames for SQLite tool bundles.
//!
//! The download site names each bundle after the operating system, the
//! architecture derived from the version, and the canonical version:
//!
//! | Platform | x86 | x64 |
//! |----------|-----|-----|
//! | Windows | `tools-win32-x86-<v>.zip` | `tools-win-x64-<v>.zip` |
//! | Linux | `tools-linux-x86-<v>.zip` | `tools-linux-x64-<v>.zip` |
//! | macOS | `tools-osx-x86-<v>.zip` | `tools-osx-x64-<v>.zip` |
//!
//! Every name is preceded by a product prefix, `sqlite-` on the official
//! download site.

use super::{Architecture, CanonicalVersion};
use crate::core::Result;
use crate::utils::platform::Platform;

/// Product prefix used by the official SQLite download site.
pub const DEFAULT_ARTIFACT_PREFIX: &str = "sqlite-";

/// Build the artifact filename for a version on a known platform.
///
/// # Examples
///
/// ```rust,no_run
/// use setup_sqlite::utils::platform::Platform;
/// use setup_sqlite::version::{artifact_filename, format_version};
///
/// # fn example() -> setup_sqlite::core::Result<()> {
/// let version = format_version("3.47.2")?;
/// assert_eq!(
///     artifact_filename("sqlite-", &version, Platform::Linux),
///     "sqlite-tools-linux-x64-3470200.zip"
/// );
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn artifact_filename(prefix: &str, version: &CanonicalVersion, platform: Platform) -> String {
    let arch = version.architecture();
    let os = match (platform, arch) {
        (Platform::Windows, Architecture::X86) => "win32",
        (Platform::Windows, Architecture::X64) => "win",
        (Platform::Linux, _) => "linux",
        (Platform::MacOs, _) => "osx",
    };
    format!("{prefix}tools-{os}-{arch}-{version}.zip")
}

/// Build the artifact filename from a raw platform identifier.
///
/// # Errors
///
/// Returns [`SetupError::UnsupportedPlatform`](crate::core::SetupError::UnsupportedPlatform)
/// when `platform_id` is not one of the Windows, Linux or macOS identifiers.
pub fn build_artifact_filename(
    prefix: &str,
    version: &CanonicalVersion,
    platform_id: &str,
) -> Result<String> {
    let platform = Platform::from_identifier(platform_id)?;
    Ok(artifact_filename(prefix, version, platform))
}
