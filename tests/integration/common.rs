//! Shared harness: one simulated runner with a scripted tag API.

use anyhow::Result;
use setup_sqlite::actions::RunnerPath;
use setup_sqlite::archive::{ArchiveExtractor, Extractor};
use setup_sqlite::cache::DirToolCache;
use setup_sqlite::http::RetryingHttpClient;
use setup_sqlite::installer::{Collaborators, InstallOutcome, InstallRequest, Installer, UrlBuilder, run_setup};
use setup_sqlite::test_utils::{GitHubFixture, RunnerDirs, ScriptedTransport};
use setup_sqlite::utils::platform::Platform;

pub const API: &str = "https://api.test/repos/sqlite/sqlite/git";
pub const SITE: &str = "https://downloads.test/";

pub struct Runner {
    pub dirs: RunnerDirs,
    pub cache: DirToolCache,
    pub path: RunnerPath,
    pub transport: ScriptedTransport,
    pub github: GitHubFixture,
    pub platform: Platform,
    pub max_retries: u32,
}

impl Runner {
    pub fn new(platform: Platform) -> Result<Self> {
        setup_sqlite::test_utils::init_test_logging(None);

        let dirs = RunnerDirs::new()?;
        Ok(Self {
            cache: DirToolCache::with_arch(&dirs.tool_cache, "x64"),
            path: RunnerPath::new(Some(dirs.path_file.clone())),
            transport: ScriptedTransport::new(),
            github: GitHubFixture::new(API),
            platform,
            max_retries: 3,
            dirs,
        })
    }

    /// Download URL the installer will request for `version` from `year`.
    pub fn download_url(&self, version: &str, year: &str) -> Result<String> {
        Ok(UrlBuilder::new(SITE, self.platform).build(version, year)?.url)
    }

    pub async fn run(&self, request: &InstallRequest) -> setup_sqlite::core::Result<InstallOutcome> {
        self.run_with(request, &ArchiveExtractor).await
    }

    pub async fn run_with(
        &self,
        request: &InstallRequest,
        extractor: &dyn Extractor,
    ) -> setup_sqlite::core::Result<InstallOutcome> {
        let installer = Installer::new(
            RetryingHttpClient::new(&self.transport, self.max_retries),
            API,
            UrlBuilder::new(SITE, self.platform),
            &self.dirs.temp,
            Collaborators {
                cache: &self.cache,
                extractor,
                search_path: &self.path,
            },
        );
        run_setup(&installer, request).await
    }

    /// Lines written to the `GITHUB_PATH` file so far.
    pub fn path_file_lines(&self) -> Result<Vec<String>> {
        if !self.dirs.path_file.exists() {
            return Ok(Vec::new());
        }
        Ok(std::fs::read_to_string(&self.dirs.path_file)?.lines().map(str::to_string).collect())
    }
}
