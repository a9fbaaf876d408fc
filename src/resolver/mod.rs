//! Resolution of a concrete SQLite version and release year.
//!
//! The download site files every bundle under the year it was released, so
//! installing needs both a version and its year. The resolver asks the tag
//! API for the release tag, follows it to the tagged commit, and takes the
//! year from the committer timestamp.
//!
//! # Resolution Rules
//!
//! - With a version: look up `version-<version>` directly. A missing tag is
//!   [`SetupError::VersionNotFound`].
//! - Without a version: list every `version-*` tag and pick the highest
//!   (see [`select_latest`]). An empty listing is
//!   [`SetupError::NoVersionsAvailable`].
//! - A caller-supplied year is always replaced by the remote one, with a
//!   warning.
//! - The resulting year must be four digits.
//!
//! # Examples
//!
//! ```rust,no_run
//! use setup_sqlite::http::{ReqwestTransport, RetryingHttpClient};
//! use setup_sqlite::resolver::VersionResolver;
//!
//! # async fn example() -> setup_sqlite::core::Result<()> {
//! let client = RetryingHttpClient::new(ReqwestTransport::new()?, 3);
//! let resolver = VersionResolver::new(&client, "https://api.github.com/repos/sqlite/sqlite/git");
//! let resolved = resolver.resolve(Some("3.47.2"), None).await?;
//! assert_eq!(resolved.year, "2024");
//! # Ok(())
//! # }
//! ```

pub mod github;

use crate::constants::{TAG_PREFIX, TAG_REF_PREFIX};
use crate::core::{Result, SetupError};
use crate::http::{RetryingHttpClient, Transport};
use crate::version::{format_version, select_latest, validate_year};
use chrono::{DateTime, Datelike, Utc};
use github::{GitCommit, GitObject, GitRef, GitTag, OBJECT_COMMIT, OBJECT_TAG};
use tracing::{debug, info, warn};

/// Upper bound on annotated tags chained onto each other.
const MAX_TAG_DEPTH: usize = 4;

/// A version/year pair ready for URL construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// Dotted release version, e.g. `3.47.2`
    pub version: String,
    /// Four-digit release year
    pub year: String,
}

/// Resolves versions against a git-data tag API.
#[derive(Debug)]
pub struct VersionResolver<'a, T> {
    client: &'a RetryingHttpClient<T>,
    api_url: String,
}

impl<'a, T: Transport> VersionResolver<'a, T> {
    /// Create a resolver for the API rooted at `api_url`
    /// (e.g. `https://api.github.com/repos/sqlite/sqlite/git`).
    pub fn new(client: &'a RetryingHttpClient<T>, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// URL of the single tag reference for `version`.
    pub fn tag_url(&self, version: &str) -> String {
        format!("{}/ref/tags/{TAG_PREFIX}{version}", self.api_url)
    }

    /// URL listing every release tag.
    pub fn tag_listing_url(&self) -> String {
        format!("{}/matching-refs/tags/{TAG_PREFIX}", self.api_url)
    }

    /// Resolve the version and year to install.
    ///
    /// Empty strings count as absent.
    ///
    /// # Errors
    ///
    /// - [`SetupError::InvalidVersionFormat`] for a malformed explicit version
    /// - [`SetupError::VersionNotFound`] / [`SetupError::NoVersionsAvailable`]
    /// - [`SetupError::MalformedRemoteResponse`] for unusable API payloads
    /// - [`SetupError::InvalidYearFormat`] if the derived year is not four digits
    /// - any error of [`RetryingHttpClient::get`]
    pub async fn resolve(&self, version: Option<&str>, year: Option<&str>) -> Result<ResolvedVersion> {
        let version = version.map(str::trim).filter(|v| !v.is_empty());
        let year = year.map(str::trim).filter(|y| !y.is_empty());

        let (version, object, source_url) = match version {
            Some(version) => {
                // Reject malformed input before spending API quota on it
                format_version(version)?;
                let (object, url) = self.lookup_tag(version).await?;
                (version.to_string(), object, url)
            }
            None => self.latest_tag().await?,
        };

        if let Some(supplied) = year {
            warn!(
                year = supplied,
                version = %version,
                "Ignoring supplied sqlite-year, the release year is taken from the release tag"
            );
        }

        let year = self.commit_year(object, &source_url).await?;
        validate_year(&year)?;

        info!(version = %version, year = %year, "Resolved SQLite release");
        Ok(ResolvedVersion {
            version,
            year,
        })
    }

    async fn lookup_tag(&self, version: &str) -> Result<(GitObject, String)> {
        let url = self.tag_url(version);
        let git_ref: GitRef = self.client.get_json(&url).await.map_err(|e| match e {
            SetupError::UnknownStatus { status, .. } => {
                debug!(url = %url, status, "Tag lookup failed");
                SetupError::VersionNotFound {
                    version: version.to_string(),
                }
            }
            other => other,
        })?;

        if git_ref.name != format!("{TAG_REF_PREFIX}{version}") {
            debug!(expected = version, found = %git_ref.name, "Tag lookup returned a different ref");
            return Err(SetupError::VersionNotFound {
                version: version.to_string(),
            });
        }

        git_ref.object.validate(&url)?;
        Ok((git_ref.object, url))
    }

    async fn latest_tag(&self) -> Result<(String, GitObject, String)> {
        let url = self.tag_listing_url();
        let refs: Vec<GitRef> = self.client.get_json(&url).await?;
        debug!(count = refs.len(), "Listed release tags");

        let no_versions = || SetupError::NoVersionsAvailable {
            prefix: TAG_PREFIX.to_string(),
        };
        if refs.is_empty() {
            return Err(no_versions());
        }

        let (name, version) = select_latest(refs.iter().map(|r| &r.name)).ok_or_else(no_versions)?;
        let git_ref = refs.iter().find(|r| r.name == name).ok_or_else(no_versions)?;
        git_ref.object.validate(&url)?;

        info!(version = %version, "Selected latest SQLite release");
        Ok((version.as_str().to_string(), git_ref.object.clone(), url))
    }

    /// Follow `object` (through annotated tags) to a commit and return the
    /// UTC year of its committer timestamp.
    async fn commit_year(&self, mut object: GitObject, source_url: &str) -> Result<String> {
        let mut referrer = source_url.to_string();
        for _ in 0..MAX_TAG_DEPTH {
            match object.kind.as_str() {
                OBJECT_TAG => {
                    let tag: GitTag = self.client.get_json(&object.url).await?;
                    tag.object.validate(&object.url)?;
                    referrer = object.url;
                    object = tag.object;
                }
                OBJECT_COMMIT => {
                    let commit: GitCommit = self.client.get_json(&object.url).await?;
                    let date = commit.committer_date(&object.url)?;
                    return year_of(date, &object.url);
                }
                other => {
                    return Err(SetupError::MalformedRemoteResponse {
                        url: referrer,
                        reason: format!("unexpected object type '{other}'"),
                    });
                }
            }
        }

        Err(SetupError::MalformedRemoteResponse {
            url: referrer,
            reason: format!("more than {MAX_TAG_DEPTH} nested tag objects"),
        })
    }
}

fn year_of(date: &str, url: &str) -> Result<String> {
    let timestamp = DateTime::parse_from_rfc3339(date.trim()).map_err(|e| {
        SetupError::MalformedRemoteResponse {
            url: url.to_string(),
            reason: format!("invalid committer date '{date}': {e}"),
        }
    })?;
    Ok(format!("{:04}", timestamp.with_timezone(&Utc).year()))
}
