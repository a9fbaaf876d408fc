//! Error handling for setup-sqlite
//!
//! Every fallible library operation returns a [`SetupError`]. The variants map
//! one-to-one onto the ways an installation can fail: bad input, an unusable
//! platform, remote API trouble, or a local filesystem step going wrong.
//!
//! The CLI layer works with [`anyhow::Error`] and converts back to a
//! [`ErrorContext`] through [`user_friendly_error`] just before exiting, so
//! the user sees the error together with details and a suggested fix.
//!
//! # Examples
//!
//! ```rust,no_run
//! use setup_sqlite::core::{SetupError, user_friendly_error};
//!
//! let error = SetupError::InvalidYearFormat {
//!     year: "25".to_string(),
//! };
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for setup-sqlite operations.
///
/// Remote rate limiting is not represented here: it is an internal state of
/// the retry loop and only ever surfaces as [`SetupError::RetryExhausted`].
#[derive(Error, Debug)]
pub enum SetupError {
    /// A version string could not be turned into the canonical digit form
    #[error("Invalid SQLite version format: '{version}'")]
    InvalidVersionFormat {
        /// The rejected version string
        version: String,
    },

    /// The host platform has no published SQLite tool bundle
    #[error("Unsupported platform: {platform}")]
    UnsupportedPlatform {
        /// Platform identifier that was not recognized
        platform: String,
    },

    /// A release year is not exactly four ASCII digits
    #[error("Invalid SQLite release year: '{year}' (expected four digits)")]
    InvalidYearFormat {
        /// The rejected year string
        year: String,
    },

    /// The transport failed before a response status was available
    #[error("Request to {url} failed: {reason}")]
    TransportError {
        /// Requested URL
        url: String,
        /// Underlying transport error message
        reason: String,
    },

    /// The tag API kept rate limiting until the retry budget ran out
    #[error("Gave up on {url} after {attempts} attempt(s) (last status {status})")]
    RetryExhausted {
        /// Requested URL
        url: String,
        /// Number of requests made, the first one included
        attempts: u32,
        /// Status code of the last response
        status: u16,
    },

    /// A non-success status that is not a retryable rate limit
    #[error("Unexpected HTTP status {status} from {url}")]
    UnknownStatus {
        /// Requested URL
        url: String,
        /// Status code received
        status: u16,
    },

    /// No release tag exists for the requested version
    #[error("SQLite version '{version}' was not found")]
    VersionNotFound {
        /// Requested version
        version: String,
    },

    /// The release tag listing contained no usable version tags
    #[error("No SQLite release tags found under '{prefix}'")]
    NoVersionsAvailable {
        /// Tag prefix that was listed
        prefix: String,
    },

    /// A tag API response was missing required fields or was not valid JSON
    #[error("Malformed response from {url}: {reason}")]
    MalformedRemoteResponse {
        /// Requested URL
        url: String,
        /// What was wrong with the payload
        reason: String,
    },

    /// The tool bundle could not be downloaded
    #[error("Failed to download {url}: {reason}")]
    DownloadFailed {
        /// Download URL
        url: String,
        /// Failure description
        reason: String,
    },

    /// The downloaded archive could not be unpacked
    #[error("Failed to extract {path}: {reason}")]
    ExtractFailed {
        /// Archive path
        path: String,
        /// Failure description
        reason: String,
    },

    /// The extracted tree could not be stored in the tool cache
    #[error("Failed to cache {tool} {version}: {reason}")]
    CacheStoreFailed {
        /// Tool name
        tool: String,
        /// Tool version
        version: String,
        /// Failure description
        reason: String,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for SetupError {
    fn clone(&self) -> Self {
        match self {
            Self::InvalidVersionFormat {
                version,
            } => Self::InvalidVersionFormat {
                version: version.clone(),
            },
            Self::UnsupportedPlatform {
                platform,
            } => Self::UnsupportedPlatform {
                platform: platform.clone(),
            },
            Self::InvalidYearFormat {
                year,
            } => Self::InvalidYearFormat {
                year: year.clone(),
            },
            Self::TransportError {
                url,
                reason,
            } => Self::TransportError {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::RetryExhausted {
                url,
                attempts,
                status,
            } => Self::RetryExhausted {
                url: url.clone(),
                attempts: *attempts,
                status: *status,
            },
            Self::UnknownStatus {
                url,
                status,
            } => Self::UnknownStatus {
                url: url.clone(),
                status: *status,
            },
            Self::VersionNotFound {
                version,
            } => Self::VersionNotFound {
                version: version.clone(),
            },
            Self::NoVersionsAvailable {
                prefix,
            } => Self::NoVersionsAvailable {
                prefix: prefix.clone(),
            },
            Self::MalformedRemoteResponse {
                url,
                reason,
            } => Self::MalformedRemoteResponse {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::DownloadFailed {
                url,
                reason,
            } => Self::DownloadFailed {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::ExtractFailed {
                path,
                reason,
            } => Self::ExtractFailed {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::CacheStoreFailed {
                tool,
                version,
                reason,
            } => Self::CacheStoreFailed {
                tool: tool.clone(),
                version: version.clone(),
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // io::Error is not Clone; keep the kind and message
            Self::IoError(e) => Self::IoError(std::io::Error::new(e.kind(), e.to_string())),
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error wrapper carrying user-facing details and a suggested fix.
///
/// Produced by [`user_friendly_error`] and printed by the binary right before
/// it exits with a failure status.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: SetupError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: SetupError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error context to stderr with terminal colors.
    ///
    /// The error is red and bold, details are yellow and the suggestion is
    /// green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] suitable for display.
///
/// Known [`SetupError`] variants get tailored details and suggestions; TOML
/// and IO errors are wrapped with generic advice; anything else is reported
/// with its full context chain.
///
/// # Examples
///
/// ```rust,no_run
/// use setup_sqlite::core::user_friendly_error;
///
/// let context = user_friendly_error(anyhow::anyhow!("Something went wrong"));
/// context.display();
/// ```
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(setup_error) = error.downcast_ref::<SetupError>() {
        return create_error_context(setup_error.clone());
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(SetupError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the configuration file for syntax errors and unknown keys")
        .with_details("Accepted keys are url_prefix, api_url, retry_count, tool_cache and temp_dir");
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(SetupError::IoError(std::io::Error::new(
                io_error.kind(),
                io_error.to_string(),
            )))
            .with_suggestion("Check ownership of RUNNER_TOOL_CACHE and RUNNER_TEMP")
            .with_details("The installer needs write access to the tool cache and temp directories");
        }
    }

    ErrorContext::new(SetupError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: SetupError) -> ErrorContext {
    match &error {
        SetupError::InvalidVersionFormat { .. } => ErrorContext::new(error)
            .with_suggestion("Use a dotted numeric version such as '3.47.2' or leave sqlite-version empty for the latest release")
            .with_details("Every dot-separated component must be a non-negative integer"),

        SetupError::UnsupportedPlatform { .. } => ErrorContext::new(error)
            .with_suggestion("Run on a Linux, macOS or Windows runner")
            .with_details("SQLite publishes precompiled tool bundles for those platforms only"),

        SetupError::InvalidYearFormat { .. } => ErrorContext::new(error)
            .with_suggestion("Pass the release year as four digits, e.g. '2024'")
            .with_details("The year selects the download directory on the SQLite site"),

        SetupError::TransportError { .. } => ErrorContext::new(error)
            .with_suggestion("Check network connectivity and any proxy settings on the runner")
            .with_details("The request failed before the server answered, so it was not retried"),

        SetupError::RetryExhausted { .. } => ErrorContext::new(error)
            .with_suggestion("Set GITHUB_TOKEN to raise the API rate limit, or increase sqlite-retry-count")
            .with_details("The GitHub API kept answering with rate-limit responses"),

        SetupError::UnknownStatus { .. } => ErrorContext::new(error)
            .with_suggestion("Check the API URL and retry later")
            .with_details("Only rate-limit responses are retried"),

        SetupError::VersionNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Check the list of releases at https://www.sqlite.org/chronology.html")
            .with_details("No 'version-<x.y.z>' tag exists for that version in the SQLite repository"),

        SetupError::NoVersionsAvailable { .. } => ErrorContext::new(error)
            .with_suggestion("Pin sqlite-version and sqlite-year explicitly")
            .with_details("The tag listing came back empty"),

        SetupError::MalformedRemoteResponse { .. } => ErrorContext::new(error)
            .with_suggestion("Check that the API URL points at a git-data API")
            .with_details("A tag, tag object or commit record was missing required fields"),

        SetupError::DownloadFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Check that sqlite-year matches the release and that sqlite-url-path is reachable")
            .with_details("Downloads are not retried"),

        SetupError::ExtractFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Verify the download URL serves a SQLite tools archive")
            .with_details("The archive was corrupt or not in a supported format"),

        SetupError::CacheStoreFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Check free disk space and permissions of RUNNER_TOOL_CACHE"),

        SetupError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check the configuration file and environment variables"),

        SetupError::IoError(_) | SetupError::Other { .. } => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SetupError::InvalidVersionFormat {
            version: "3.x".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid SQLite version format: '3.x'");

        let error = SetupError::RetryExhausted {
            url: "https://api.example/tags".to_string(),
            attempts: 3,
            status: 403,
        };
        assert!(error.to_string().contains("3 attempt(s)"));
        assert!(error.to_string().contains("403"));
    }

    #[test]
    fn test_error_clone_preserves_io_kind() {
        let error = SetupError::IoError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        match error.clone() {
            SetupError::IoError(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            other => panic!("unexpected clone: {other:?}"),
        }
    }

    #[test]
    fn test_user_friendly_error_known_variant() {
        let error = anyhow::Error::from(SetupError::VersionNotFound {
            version: "9.9.9".to_string(),
        });
        let context = user_friendly_error(error);
        assert!(matches!(context.error, SetupError::VersionNotFound { .. }));
        assert!(context.suggestion.is_some());
        assert!(context.details.is_some());
    }

    #[test]
    fn test_user_friendly_error_keeps_context_chain() {
        let error = anyhow::anyhow!("root cause").context("while installing");
        let context = user_friendly_error(error);
        let text = context.to_string();
        assert!(text.contains("while installing"));
        assert!(text.contains("root cause"));
    }

    #[test]
    fn test_error_context_display_format() {
        let context = ErrorContext::new(SetupError::Other {
            message: "boom".to_string(),
        })
        .with_details("d")
        .with_suggestion("s");
        assert_eq!(context.to_string(), "boom\nDetails: d\nSuggestion: s");
    }
}
