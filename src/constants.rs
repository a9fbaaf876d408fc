//! Global constants used throughout the setup-sqlite codebase.
//!
//! This module contains the tool identity, remote endpoints, retry
//! parameters and version thresholds shared by several modules.

use std::time::Duration;

/// Tool name used as the first component of every tool-cache key.
pub const TOOL_NAME: &str = "sqlite";

/// Number of retries allowed per tag API request when no valid retry count
/// is configured.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default download host prefix for SQLite tool bundles.
pub const DEFAULT_URL_PREFIX: &str = "https://www.sqlite.org/";

/// Default base of the git-data API serving SQLite release tags.
pub const DEFAULT_TAG_API: &str = "https://api.github.com/repos/sqlite/sqlite/git";

/// Prefix that every SQLite release tag carries (`version-3.47.2`).
pub const TAG_PREFIX: &str = "version-";

/// Fully qualified ref prefix as returned by the tag API.
pub const TAG_REF_PREFIX: &str = "refs/tags/version-";

/// First 3.x minor release whose Windows bundle is published for x64 only.
///
/// Releases from 3.44 onwards ship 64-bit tool bundles; everything older
/// ships 32-bit ones.
pub const X64_FIRST_MINOR: u32 = 44;

/// User agent sent with every outbound request.
pub const USER_AGENT: &str = concat!("setup-sqlite/", env!("CARGO_PKG_VERSION"));

/// Longest silence tolerated between reads on an HTTP connection (30 seconds).
///
/// There is no overall deadline: a bundle download may take as long as it
/// needs while bytes keep arriving.
pub const HTTP_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection timeout for the HTTP transport (15 seconds).
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Header carrying a server-requested wait in seconds.
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Header carrying the remaining request quota.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Header carrying the epoch second at which the quota resets.
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";
