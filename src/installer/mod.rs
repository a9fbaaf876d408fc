//! Installation of a SQLite tools bundle into the tool cache.
//!
//! [`Installer::install`] walks a fixed sequence of states:
//!
//! 1. **Resolve** - turn the requested version (or "latest") into a concrete
//!    version and release year, then build the download target
//! 2. **Check cache** - a complete cache entry for the version skips straight
//!    to publishing
//! 3. **Download** - fetch the bundle into a fresh directory under the temp
//!    root; downloads are never retried
//! 4. **Extract** - unpack into another fresh directory
//! 5. **Register** - copy the unpacked tree into the tool cache
//! 6. **Publish** - put the cached bundle's directories on the search path
//!
//! Every temporary directory gets a release action in the run's
//! [`CleanupRegistry`] as soon as it is created. [`run_setup`] owns that
//! registry and drains it after the install returns, fails or panics.
//!
//! # Examples
//!
//! ```rust,no_run
//! use setup_sqlite::actions::RunnerPath;
//! use setup_sqlite::archive::ArchiveExtractor;
//! use setup_sqlite::cache::DirToolCache;
//! use setup_sqlite::http::{ReqwestTransport, RetryingHttpClient};
//! use setup_sqlite::installer::{Collaborators, InstallRequest, Installer, UrlBuilder, run_setup};
//! use setup_sqlite::utils::platform::Platform;
//!
//! # async fn example() -> setup_sqlite::core::Result<()> {
//! let cache = DirToolCache::new("/opt/hostedtoolcache");
//! let path = RunnerPath::from_env();
//! let installer = Installer::new(
//!     RetryingHttpClient::new(ReqwestTransport::new()?, 3),
//!     "https://api.github.com/repos/sqlite/sqlite/git",
//!     UrlBuilder::new("https://www.sqlite.org/", Platform::current()?),
//!     std::env::temp_dir(),
//!     Collaborators {
//!         cache: &cache,
//!         extractor: &ArchiveExtractor,
//!         search_path: &path,
//!     },
//! );
//!
//! let outcome = run_setup(&installer, &InstallRequest::latest()).await?;
//! println!("SQLite {} (cache hit: {})", outcome.version, outcome.cache_hit);
//! # Ok(())
//! # }
//! ```

pub mod cleanup;
pub mod url;

pub use cleanup::{CleanupHandle, CleanupRegistry};
pub use url::{DownloadTarget, UrlBuilder, normalize_prefix};

use crate::actions::SearchPath;
use crate::archive::{ArchiveKind, Extractor};
use crate::cache::ToolCache;
use crate::constants::TOOL_NAME;
use crate::core::{Result, SetupError};
use crate::http::{RetryingHttpClient, Transport};
use crate::resolver::VersionResolver;
use futures::FutureExt;
use reqwest::StatusCode;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What the caller asked for. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallRequest {
    /// Requested version; `None` installs the latest release
    pub version: Option<String>,
    /// Requested release year; replaced by the remote year
    pub year: Option<String>,
}

impl InstallRequest {
    /// Request the latest release.
    pub fn latest() -> Self {
        Self::default()
    }

    /// Request a specific version.
    pub fn version(version: &str) -> Self {
        Self {
            version: Some(version.to_string()),
            year: None,
        }
    }

    /// Attach a release year hint.
    #[must_use]
    pub fn with_year(mut self, year: &str) -> Self {
        self.year = Some(year.to_string());
        self
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Whether the tool cache already held the version
    pub cache_hit: bool,
    /// Concrete version installed
    pub version: String,
    /// Canonical tool-cache directory of the bundle
    pub cache_path: PathBuf,
    /// Directories added to the search path, in order
    pub published: Vec<PathBuf>,
}

/// Filesystem-facing collaborators of the installer.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Tool cache store
    pub cache: &'a dyn ToolCache,
    /// Archive extractor
    pub extractor: &'a dyn Extractor,
    /// Search path publisher
    pub search_path: &'a dyn SearchPath,
}

/// Orchestrates one installation; see the module docs.
pub struct Installer<'a, T> {
    client: RetryingHttpClient<T>,
    api_url: String,
    urls: UrlBuilder,
    temp_root: PathBuf,
    collaborators: Collaborators<'a>,
}

impl<'a, T: Transport> Installer<'a, T> {
    /// Create an installer.
    ///
    /// # Arguments
    ///
    /// * `client` - retrying client for the tag API; its transport also downloads bundles
    /// * `api_url` - root of the tag API
    /// * `urls` - download URL builder, which also fixes the target platform
    /// * `temp_root` - directory for per-run download and extraction directories
    /// * `collaborators` - cache, extractor and search path implementations
    pub fn new(
        client: RetryingHttpClient<T>,
        api_url: &str,
        urls: UrlBuilder,
        temp_root: impl Into<PathBuf>,
        collaborators: Collaborators<'a>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
            urls,
            temp_root: temp_root.into(),
            collaborators,
        }
    }

    /// Run the install state machine.
    ///
    /// Release actions for temporary artifacts are pushed onto `cleanup`; the
    /// caller must drain it. Prefer [`run_setup`], which does.
    ///
    /// # Errors
    ///
    /// Returns the first error hit by any step: resolution errors from
    /// [`VersionResolver::resolve`], [`SetupError::DownloadFailed`],
    /// [`SetupError::ExtractFailed`], [`SetupError::CacheStoreFailed`], or an
    /// IO error while publishing.
    pub async fn install(
        &self,
        request: &InstallRequest,
        cleanup: &mut CleanupRegistry,
    ) -> Result<InstallOutcome> {
        let resolver = VersionResolver::new(&self.client, &self.api_url);
        let resolved = resolver.resolve(request.version.as_deref(), request.year.as_deref()).await?;
        let target = self.urls.build(&resolved.version, &resolved.year)?;
        debug!(url = %target.url, canonical = %target.canonical, "Built download target");

        let cache = self.collaborators.cache;
        let (cache_hit, cache_path) = match cache.find(TOOL_NAME, &resolved.version) {
            Some(path) => {
                info!(version = %resolved.version, path = %path.display(), "Found SQLite in tool cache");
                (true, path)
            }
            None => {
                info!(url = %target.url, "Downloading SQLite tools");
                let archive = self.download(&target, cleanup).await?;
                let extracted = self.extract(&archive, cleanup).await?;
                let stored = cache.store(&extracted, TOOL_NAME, &resolved.version)?;
                (false, stored)
            }
        };

        let published = self.publish(&cache_path)?;
        Ok(InstallOutcome {
            cache_hit,
            version: resolved.version,
            cache_path,
            published,
        })
    }

    async fn download(&self, target: &DownloadTarget, cleanup: &mut CleanupRegistry) -> Result<PathBuf> {
        let failed = |reason: String| SetupError::DownloadFailed {
            url: target.url.clone(),
            reason,
        };

        let dir = self.fresh_dir(cleanup).await.map_err(|e| failed(e.to_string()))?;
        let path = dir.join(&target.filename);

        let response = self.client.transport().get(&target.url).await.map_err(|e| failed(e.to_string()))?;
        if response.status() != StatusCode::OK {
            let status = response.status();
            response.discard().await;
            return Err(failed(format!("HTTP {status}")));
        }

        let mut file = tokio::fs::File::create(&path).await.map_err(|e| failed(e.to_string()))?;
        let bytes = response.write_to(&mut file).await.map_err(|e| failed(e.to_string()))?;
        debug!(path = %path.display(), bytes, "Downloaded archive");
        Ok(path)
    }

    async fn extract(&self, archive: &Path, cleanup: &mut CleanupRegistry) -> Result<PathBuf> {
        let destination = self.fresh_dir(cleanup).await.map_err(|e| SetupError::ExtractFailed {
            path: archive.display().to_string(),
            reason: e.to_string(),
        })?;
        let kind = ArchiveKind::for_platform(self.urls.platform());
        self.collaborators.extractor.extract(archive, kind, &destination)
    }

    /// Create a uniquely named directory under the temp root and register its
    /// removal.
    async fn fresh_dir(&self, cleanup: &mut CleanupRegistry) -> std::io::Result<PathBuf> {
        let dir = self.temp_root.join(uuid::Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await?;
        cleanup.remove_dir_all(&dir);
        Ok(dir)
    }

    /// Add every child directory of `cache_path` to the search path, or
    /// `cache_path` itself for bundles without subdirectories.
    fn publish(&self, cache_path: &Path) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(cache_path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        dirs.sort();
        if dirs.is_empty() {
            dirs.push(cache_path.to_path_buf());
        }

        for dir in &dirs {
            self.collaborators.search_path.add_path(dir)?;
        }
        Ok(dirs)
    }
}

/// Run an install with a fresh cleanup registry and always drain it.
///
/// The install's own error (or panic) is passed on after cleanup has run;
/// cleanup failures are only logged.
///
/// # Errors
///
/// Whatever [`Installer::install`] returned.
pub async fn run_setup<T: Transport>(
    installer: &Installer<'_, T>,
    request: &InstallRequest,
) -> Result<InstallOutcome> {
    let mut cleanup = CleanupRegistry::new();
    let result = AssertUnwindSafe(installer.install(request, &mut cleanup)).catch_unwind().await;

    let failures = cleanup.run_all().await;
    if failures > 0 {
        warn!(failures, "Some temporary files could not be removed");
    }

    match result {
        Ok(outcome) => outcome,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::RunnerPath;
    use crate::archive::ArchiveExtractor;
    use crate::cache::DirToolCache;
    use crate::test_utils::{ArchiveFixture, GitHubFixture, RunnerDirs, ScriptedResponse, ScriptedTransport};
    use crate::utils::platform::Platform;

    const API: &str = "https://api.test/repos/sqlite/sqlite/git";
    const SITE: &str = "https://downloads.test/";

    struct Harness {
        dirs: RunnerDirs,
        cache: DirToolCache,
        path: RunnerPath,
    }

    impl Harness {
        fn new() -> Self {
            let dirs = RunnerDirs::new().unwrap();
            let cache = DirToolCache::with_arch(&dirs.tool_cache, "x64");
            Self {
                dirs,
                cache,
                path: RunnerPath::new(None),
            }
        }

        fn installer<'a>(&'a self, transport: &'a ScriptedTransport) -> Installer<'a, &'a ScriptedTransport> {
            Installer::new(
                RetryingHttpClient::new(transport, 3),
                API,
                UrlBuilder::new(SITE, Platform::Linux),
                &self.dirs.temp,
                Collaborators {
                    cache: &self.cache,
                    extractor: &ArchiveExtractor,
                    search_path: &self.path,
                },
            )
        }
    }

    #[tokio::test]
    async fn test_flat_bundle_publishes_cache_root() {
        let harness = Harness::new();
        let gh = GitHubFixture::new(API);
        let transport = ScriptedTransport::new();
        gh.script_release(&transport, "3.47.2", "2024-12-07T20:39:59Z");
        transport.push(
            "https://downloads.test/2024/sqlite-tools-linux-x64-3470200.zip",
            ScriptedResponse::ok(ArchiveFixture::flat_zip().unwrap()),
        );

        let outcome = run_setup(&harness.installer(&transport), &InstallRequest::version("3.47.2"))
            .await
            .unwrap();
        assert!(!outcome.cache_hit);
        assert_eq!(outcome.published, vec![outcome.cache_path.clone()]);
        assert!(outcome.cache_path.join("sqlite3").is_file());
        assert_eq!(harness.dirs.temp_entries().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_nested_bundle_publishes_child_directory() {
        let harness = Harness::new();
        let gh = GitHubFixture::new(API);
        let transport = ScriptedTransport::new();
        gh.script_release(&transport, "3.40.0", "2022-11-16T12:10:08Z");
        transport.push(
            "https://downloads.test/2022/sqlite-tools-linux-x86-3400000.zip",
            ScriptedResponse::ok(ArchiveFixture::nested_zip("sqlite-tools-linux-x86-3400000").unwrap()),
        );

        let outcome = run_setup(&harness.installer(&transport), &InstallRequest::version("3.40.0"))
            .await
            .unwrap();
        let child = outcome.cache_path.join("sqlite-tools-linux-x86-3400000");
        assert_eq!(outcome.published, vec![child.clone()]);
        assert_eq!(harness.path.added(), vec![child]);
    }

    #[tokio::test]
    async fn test_download_error_status() {
        let harness = Harness::new();
        let gh = GitHubFixture::new(API);
        let transport = ScriptedTransport::new();
        gh.script_release(&transport, "3.47.2", "2024-12-07T20:39:59Z");
        transport.push(
            "https://downloads.test/2024/sqlite-tools-linux-x64-3470200.zip",
            ScriptedResponse::status(404),
        );

        let err = run_setup(&harness.installer(&transport), &InstallRequest::version("3.47.2"))
            .await
            .unwrap_err();
        assert!(matches!(err, SetupError::DownloadFailed { ref reason, .. } if reason.contains("404")));
        assert_eq!(harness.dirs.temp_entries().unwrap(), 0);
        assert!(harness.path.added().is_empty());
    }

    #[tokio::test]
    async fn test_download_is_not_retried() {
        let harness = Harness::new();
        let gh = GitHubFixture::new(API);
        let transport = ScriptedTransport::new();
        gh.script_release(&transport, "3.47.2", "2024-12-07T20:39:59Z");
        let url = "https://downloads.test/2024/sqlite-tools-linux-x64-3470200.zip";
        transport.push(url, ScriptedResponse::retry_after(0));
        transport.push(url, ScriptedResponse::ok(ArchiveFixture::flat_zip().unwrap()));

        let err = run_setup(&harness.installer(&transport), &InstallRequest::version("3.47.2"))
            .await
            .unwrap_err();
        assert!(matches!(err, SetupError::DownloadFailed { .. }));
        assert_eq!(transport.request_count(url), 1);
    }
}
