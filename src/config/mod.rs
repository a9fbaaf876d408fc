//! Run configuration for setup-sqlite
//!
//! A [`SetupConfig`] is assembled once per run from four layers, lowest
//! precedence first:
//!
//! 1. Built-in defaults ([`crate::constants`])
//! 2. An optional TOML file (`--config` / `SETUP_SQLITE_CONFIG`)
//! 3. Runner environment variables (`RUNNER_TOOL_CACHE`, `RUNNER_TEMP`, `GITHUB_TOKEN`)
//! 4. Action inputs, supplied as flags or `INPUT_*` variables through clap
//!
//! Empty strings count as absent at every layer. The Actions runner exports
//! every declared input, set or not, so an empty `INPUT_SQLITE-VERSION` must
//! mean "latest" rather than "the version named ''".
//!
//! # Configuration File
//!
//! ```toml
//! url_prefix = "https://mirror.example.com/sqlite/"
//! api_url = "https://github.example.com/api/v3/repos/sqlite/sqlite/git"
//! retry_count = 5
//! tool_cache = "/opt/hostedtoolcache"
//! temp_dir = "/tmp/setup-sqlite"
//! ```
//!
//! Unknown keys are rejected.

use crate::constants::{DEFAULT_RETRY_COUNT, DEFAULT_TAG_API, DEFAULT_URL_PREFIX};
use crate::core::{Result, SetupError};
use crate::utils::platform::Platform;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the tool cache root.
pub const TOOL_CACHE_ENV: &str = "RUNNER_TOOL_CACHE";

/// Environment variable naming the runner's temp root.
pub const TEMP_ENV: &str = "RUNNER_TEMP";

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Resolve the tag API retry budget from its raw input.
///
/// Positive integers are taken as-is. A missing or empty value means the
/// default. Anything else (`0`, `-11`, `a`) is reported as a warning and
/// also falls back to the default of 3.
///
/// # Examples
///
/// ```rust
/// use setup_sqlite::config::resolve_retry_count;
///
/// assert_eq!(resolve_retry_count(Some("5")), 5);
/// assert_eq!(resolve_retry_count(Some("0")), 3);
/// assert_eq!(resolve_retry_count(None), 3);
/// ```
pub fn resolve_retry_count(value: Option<&str>) -> u32 {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        debug!(default = DEFAULT_RETRY_COUNT, "No retry count configured");
        return DEFAULT_RETRY_COUNT;
    };

    match raw.parse::<u32>() {
        Ok(count) if count > 0 => count,
        _ => {
            warn!(
                value = raw,
                default = DEFAULT_RETRY_COUNT,
                "sqlite-retry-count must be a positive integer, using the default"
            );
            DEFAULT_RETRY_COUNT
        }
    }
}

/// A retry count as written in the TOML file: `retry_count = 5` and
/// `retry_count = "5"` are both accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RetryCountValue {
    /// Integer form
    Number(i64),
    /// String form, validated like the action input
    Text(String),
}

impl RetryCountValue {
    fn as_input(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// Contents of the optional configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Download host prefix
    pub url_prefix: Option<String>,
    /// Tag API base URL
    pub api_url: Option<String>,
    /// Tag API retry budget
    pub retry_count: Option<RetryCountValue>,
    /// Tool cache root
    pub tool_cache: Option<PathBuf>,
    /// Temp root
    pub temp_dir: Option<PathBuf>,
}

impl ConfigFile {
    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ConfigError`] if the file cannot be read or is
    /// not valid for this schema.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| SetupError::ConfigError {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::parse(&content).map_err(|e| SetupError::ConfigError {
            message: format!("failed to parse {}: {e}", path.display()),
        })
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the TOML error for malformed input or unknown keys.
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Values supplied on the command line or as action inputs.
#[derive(Debug, Clone, Default)]
pub struct ConfigInputs {
    /// `sqlite-version`
    pub version: Option<String>,
    /// `sqlite-year`
    pub year: Option<String>,
    /// `sqlite-url-path`
    pub url_prefix: Option<String>,
    /// `sqlite-retry-count`, unvalidated
    pub retry_count: Option<String>,
    /// Tag API base URL
    pub api_url: Option<String>,
    /// Configuration file to layer underneath
    pub config_path: Option<PathBuf>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupConfig {
    /// Requested version; `None` installs the latest release
    pub version: Option<String>,
    /// Requested release year
    pub year: Option<String>,
    /// Download host prefix
    pub url_prefix: String,
    /// Tag API base URL, without trailing slash
    pub api_url: String,
    /// Tag API retry budget, at least 1
    pub max_retries: u32,
    /// Tool cache root
    pub tool_cache_dir: PathBuf,
    /// Root for per-run download and extraction directories
    pub temp_dir: PathBuf,
    /// Token for the tag API
    pub github_token: Option<String>,
    /// Platform whose bundle is installed
    pub platform: Platform,
}

impl SetupConfig {
    /// Build the configuration from inputs, the optional file and the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ConfigError`] for an unreadable file or invalid
    /// URLs, and [`SetupError::UnsupportedPlatform`] on unknown hosts.
    pub async fn load(inputs: &ConfigInputs) -> Result<Self> {
        let file = match &inputs.config_path {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration file");
                ConfigFile::load(path).await?
            }
            None => ConfigFile::default(),
        };
        Self::resolve(inputs, file, |key| std::env::var(key).ok())
    }

    /// Merge the layers with an explicit environment lookup.
    ///
    /// # Errors
    ///
    /// See [`SetupConfig::load`].
    pub fn resolve(
        inputs: &ConfigInputs,
        file: ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env = |key: &str| non_empty(env(key));

        let url_prefix = non_empty(inputs.url_prefix.clone())
            .or_else(|| non_empty(file.url_prefix))
            .unwrap_or_else(|| DEFAULT_URL_PREFIX.to_string());
        check_url("sqlite-url-path", &url_prefix)?;

        let api_url = non_empty(inputs.api_url.clone())
            .or_else(|| non_empty(file.api_url))
            .unwrap_or_else(|| DEFAULT_TAG_API.to_string());
        check_url("api-url", &api_url)?;

        let retry_input = non_empty(inputs.retry_count.clone())
            .or_else(|| file.retry_count.as_ref().map(RetryCountValue::as_input));
        let max_retries = resolve_retry_count(retry_input.as_deref());

        let tool_cache_dir = match env(TOOL_CACHE_ENV).map(PathBuf::from).or(file.tool_cache) {
            Some(dir) => dir,
            None => default_tool_cache()?,
        };
        let temp_dir = env(TEMP_ENV)
            .map(PathBuf::from)
            .or(file.temp_dir)
            .unwrap_or_else(|| std::env::temp_dir().join("setup-sqlite"));

        let config = Self {
            version: non_empty(inputs.version.clone()),
            year: non_empty(inputs.year.clone()),
            url_prefix,
            api_url: api_url.trim_end_matches('/').to_string(),
            max_retries,
            tool_cache_dir,
            temp_dir,
            github_token: env(TOKEN_ENV),
            platform: Platform::current()?,
        };
        debug!(
            version = ?config.version,
            url_prefix = %config.url_prefix,
            api_url = %config.api_url,
            max_retries = config.max_retries,
            tool_cache = %config.tool_cache_dir.display(),
            authenticated = config.github_token.is_some(),
            "Resolved configuration"
        );
        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn check_url(name: &str, value: &str) -> Result<()> {
    reqwest::Url::parse(value).map(|_| ()).map_err(|e| SetupError::ConfigError {
        message: format!("{name} '{value}' is not a valid URL: {e}"),
    })
}

fn default_tool_cache() -> Result<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("setup-sqlite").join("tool-cache")).ok_or_else(|| {
        SetupError::ConfigError {
            message: format!("cannot determine a cache directory, set {TOOL_CACHE_ENV}"),
        }
    })
}
