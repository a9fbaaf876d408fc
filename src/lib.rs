//! setup-sqlite - install SQLite command-line tools on CI runners
//!
//! Resolves a SQLite release through the git-data tag API of the SQLite
//! repository, downloads the matching precompiled tools bundle from
//! sqlite.org, stores it in the runner's tool cache and publishes it on the
//! search path for later workflow steps.
//!
//! # Architecture Overview
//!
//! A run is a short state machine driven by [`installer::Installer`]:
//!
//! ```text
//! resolve version/year ─► build URL ─► tool cache hit? ──yes──┐
//!                                          │ no               │
//!                                          ▼                  ▼
//!                             download ─► extract ─► store ─► publish
//! ```
//!
//! - Only tag API calls are retried, and only on rate-limit responses
//!   ([`http::RetryingHttpClient`])
//! - Temporary download and extraction directories are registered with a
//!   per-run [`installer::CleanupRegistry`] and removed whatever the outcome
//! - The filesystem-facing steps sit behind traits ([`cache::ToolCache`],
//!   [`archive::Extractor`], [`actions::SearchPath`]) so tests can substitute
//!   them, and HTTP sits behind [`http::Transport`]
//!
//! # Core Modules
//!
//! - [`version`] - version canonicalization, architecture rule and artifact names
//! - [`resolver`] - version and release-year resolution through the tag API
//! - [`http`] - transport seam and the rate-limit aware retrying client
//! - [`installer`] - URL building, cleanup registry and the install state machine
//!
//! ## Collaborators
//! - [`cache`] - tool cache in the hosted runner layout
//! - [`archive`] - zip and tar+xz extraction
//! - [`actions`] - `GITHUB_PATH` publication and step outputs
//!
//! ## Supporting Modules
//! - [`cli`] - command-line interface and logging setup
//! - [`config`] - layered configuration (file, environment, inputs)
//! - [`core`] - error types and user-facing error formatting
//! - [`utils`] - platform detection and rate-limit backoff
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Latest release
//! setup-sqlite
//!
//! # Pinned release
//! setup-sqlite --sqlite-version 3.40.0
//! ```

// Core functionality modules
pub mod core;
pub mod http;
pub mod installer;
pub mod resolver;
pub mod version;

// Collaborators
pub mod actions;
pub mod archive;
pub mod cache;

// Supporting modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
