//! Command-line interface for setup-sqlite.
//!
//! The binary is a single command that installs one SQLite tools bundle and
//! reports where it went. It is meant to run as a GitHub Actions step, so
//! every option can also be supplied through the variable the runner exports
//! for the matching action input:
//!
//! | Flag | Environment | Meaning |
//! |------|-------------|---------|
//! | `--sqlite-version` | `INPUT_SQLITE-VERSION` | Version to install, latest when empty |
//! | `--sqlite-year` | `INPUT_SQLITE-YEAR` | Release year (taken from the release tag) |
//! | `--sqlite-url-path` | `INPUT_SQLITE-URL-PATH` | Download host prefix |
//! | `--sqlite-retry-count` | `INPUT_SQLITE-RETRY-COUNT` | Tag API retries |
//! | `--api-url` | `SETUP_SQLITE_API_URL` | Tag API base |
//! | `--config` | `SETUP_SQLITE_CONFIG` | TOML configuration file |
//!
//! # Logging
//!
//! Logs go to stderr. `RUST_LOG` takes precedence; otherwise `--verbose` or
//! `RUNNER_DEBUG=1` (set by "re-run with debug logging") selects `debug`,
//! `--quiet` selects `warn`, and the default is `info`.
//!
//! # Example
//!
//! ```bash
//! # Latest release into the default tool cache
//! setup-sqlite
//!
//! # A pinned release with a larger retry budget
//! GITHUB_TOKEN=... setup-sqlite --sqlite-version 3.40.0 --sqlite-retry-count 5 --verbose
//! ```

use crate::actions::{ActionOutputs, OUTPUT_BIN, OUTPUT_CACHE_HIT, OUTPUT_VERSION, RunnerPath};
use crate::archive::ArchiveExtractor;
use crate::cache::DirToolCache;
use crate::config::{ConfigInputs, SetupConfig};
use crate::core::Result as SetupResult;
use crate::http::{ReqwestTransport, RetryingHttpClient};
use crate::installer::{Collaborators, InstallOutcome, InstallRequest, Installer, UrlBuilder, run_setup};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Variable set to `1` by the runner when debug logging is requested.
pub const RUNNER_DEBUG_ENV: &str = "RUNNER_DEBUG";

/// Variable set to `true` on GitHub Actions runners.
pub const GITHUB_ACTIONS_ENV: &str = "GITHUB_ACTIONS";

/// Install a SQLite tools bundle into the tool cache and put it on the path.
#[derive(Parser, Debug)]
#[command(
    name = "setup-sqlite",
    about = "Install SQLite command-line tools into a CI runner's tool cache",
    version,
    long_about = "Resolves a SQLite release through the tag API, downloads the matching \
                  precompiled tools bundle, stores it in the tool cache and publishes it \
                  on the search path for later workflow steps."
)]
pub struct Cli {
    /// SQLite version to install, e.g. 3.47.2 (latest when omitted)
    #[arg(long = "sqlite-version", env = "INPUT_SQLITE-VERSION", value_name = "VERSION")]
    sqlite_version: Option<String>,

    /// Release year; the year recorded on the release tag is used instead
    #[arg(long = "sqlite-year", env = "INPUT_SQLITE-YEAR", value_name = "YEAR")]
    sqlite_year: Option<String>,

    /// Download host prefix
    #[arg(long = "sqlite-url-path", env = "INPUT_SQLITE-URL-PATH", value_name = "URL")]
    sqlite_url_path: Option<String>,

    /// Number of retries against the tag API when rate limited
    #[arg(long = "sqlite-retry-count", env = "INPUT_SQLITE-RETRY-COUNT", value_name = "COUNT")]
    sqlite_retry_count: Option<String>,

    /// Base URL of the git-data API holding the release tags
    #[arg(long, env = "SETUP_SQLITE_API_URL", value_name = "URL")]
    api_url: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "SETUP_SQLITE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Run the installer and write step outputs.
    ///
    /// # Errors
    ///
    /// Returns configuration, install and output errors; the binary turns
    /// them into a user-facing message and a failing exit status.
    pub async fn execute(self) -> Result<()> {
        self.init_logging();

        let config = SetupConfig::load(&self.config_inputs())
            .await
            .context("Failed to load configuration")?;
        let outcome = install(&config).await?;
        write_outputs(&ActionOutputs::from_env(), &outcome)?;

        info!(
            version = %outcome.version,
            path = %outcome.cache_path.display(),
            cache_hit = outcome.cache_hit,
            "SQLite is ready"
        );
        Ok(())
    }

    /// Inputs handed to [`SetupConfig::load`].
    #[must_use]
    pub fn config_inputs(&self) -> ConfigInputs {
        ConfigInputs {
            version: self.sqlite_version.clone(),
            year: self.sqlite_year.clone(),
            url_prefix: self.sqlite_url_path.clone(),
            retry_count: self.sqlite_retry_count.clone(),
            api_url: self.api_url.clone(),
            config_path: self.config.clone(),
        }
    }

    /// Default log level for the given flags, used when `RUST_LOG` is unset.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        let runner_debug = std::env::var(RUNNER_DEBUG_ENV).is_ok_and(|v| v == "1");
        log_level_for(self.verbose, self.quiet, runner_debug)
    }

    fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(format!("setup_sqlite={}", self.log_level()))
        };

        // A subscriber may already be installed when embedded in tests
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

fn log_level_for(verbose: bool, quiet: bool, runner_debug: bool) -> &'static str {
    if verbose || runner_debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Wire the production collaborators together and run one install.
///
/// # Errors
///
/// Any error of [`run_setup`], or a failure to build the HTTP client.
pub async fn install(config: &SetupConfig) -> SetupResult<InstallOutcome> {
    let transport = ReqwestTransport::new()?.with_token(config.github_token.clone(), &config.api_url);
    let client = RetryingHttpClient::new(transport, config.max_retries);

    let cache = DirToolCache::new(&config.tool_cache_dir);
    let search_path = RunnerPath::from_env();
    let installer = Installer::new(
        client,
        &config.api_url,
        UrlBuilder::new(&config.url_prefix, config.platform),
        &config.temp_dir,
        Collaborators {
            cache: &cache,
            extractor: &ArchiveExtractor,
            search_path: &search_path,
        },
    );

    let request = InstallRequest {
        version: config.version.clone(),
        year: config.year.clone(),
    };
    run_setup(&installer, &request).await
}

/// Report an outcome as step outputs.
///
/// # Errors
///
/// Returns an error if the output file cannot be written.
pub fn write_outputs(outputs: &ActionOutputs, outcome: &InstallOutcome) -> Result<()> {
    outputs.set(OUTPUT_CACHE_HIT, &outcome.cache_hit.to_string())?;
    outputs.set(OUTPUT_VERSION, &outcome.version)?;
    if let Some(bin) = outcome.published.first() {
        outputs.set(OUTPUT_BIN, &bin.display().to_string())?;
    }
    Ok(())
}

/// Whether the process runs on a GitHub Actions runner.
#[must_use]
pub fn running_in_actions() -> bool {
    std::env::var(GITHUB_ACTIONS_ENV).is_ok_and(|v| v == "true")
}
