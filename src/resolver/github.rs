//! Typed records for the git-data API that serves SQLite release tags.
//!
//! Three shapes are consumed:
//!
//! - a tag reference (`GET .../git/ref/tags/version-3.47.2`, or an element of
//!   `GET .../git/matching-refs/tags/version-`)
//! - an annotated tag object, reached when a reference points at a tag
//!   rather than straight at a commit
//! - a commit object carrying the committer timestamp
//!
//! Required fields are non-optional so a payload missing them fails to
//! decode; [`GitObject::validate`] catches fields that are present but empty.

use crate::core::{Result, SetupError};
use serde::Deserialize;

/// Object type of a tag reference pointing straight at a commit.
pub const OBJECT_COMMIT: &str = "commit";

/// Object type of an annotated tag.
pub const OBJECT_TAG: &str = "tag";

/// A git reference such as `refs/tags/version-3.47.2`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    /// Fully qualified reference name
    #[serde(rename = "ref")]
    pub name: String,
    /// Object the reference points at
    pub object: GitObject,
}

/// Pointer to a git object.
#[derive(Debug, Clone, Deserialize)]
pub struct GitObject {
    /// Object id
    pub sha: String,
    /// Object type, `commit` or `tag`
    #[serde(rename = "type")]
    pub kind: String,
    /// API URL of the object
    pub url: String,
}

impl GitObject {
    /// Fail with [`SetupError::MalformedRemoteResponse`] if any field is blank.
    pub fn validate(&self, source_url: &str) -> Result<()> {
        for (field, value) in [("object.sha", &self.sha), ("object.type", &self.kind), ("object.url", &self.url)]
        {
            if value.trim().is_empty() {
                return Err(SetupError::MalformedRemoteResponse {
                    url: source_url.to_string(),
                    reason: format!("field '{field}' is empty"),
                });
            }
        }
        Ok(())
    }
}

/// An annotated tag object.
#[derive(Debug, Clone, Deserialize)]
pub struct GitTag {
    /// Object the tag points at
    pub object: GitObject,
}

/// Author or committer signature.
#[derive(Debug, Clone, Deserialize)]
pub struct GitSignature {
    /// ISO-8601 timestamp
    pub date: String,
}

/// A commit as returned by either the git-data API (`committer` at the top
/// level) or the repository commits API (`commit.committer`).
#[derive(Debug, Clone, Deserialize)]
pub struct GitCommit {
    /// Committer of a git-data commit
    #[serde(default)]
    pub committer: Option<GitSignature>,
    /// Nested commit of the repository commits API
    #[serde(default)]
    pub commit: Option<CommitDetail>,
}

/// The `commit` member of a repository commits API response.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    /// Committer signature
    pub committer: Option<GitSignature>,
}

impl GitCommit {
    /// The committer timestamp, from whichever shape carried it.
    pub fn committer_date(&self, source_url: &str) -> Result<&str> {
        self.committer
            .as_ref()
            .or_else(|| self.commit.as_ref().and_then(|c| c.committer.as_ref()))
            .map(|s| s.date.as_str())
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| SetupError::MalformedRemoteResponse {
                url: source_url.to_string(),
                reason: "missing committer.date".to_string(),
            })
    }
}
