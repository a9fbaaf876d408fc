//! Integration test suite for setup-sqlite
//!
//! End-to-end runs of the installer against a scripted transport (no
//! network), real zip and tar+xz bundles, and throwaway runner directories.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **install**: fresh installs, cache hits, bundle layouts and tag variants
//! - **failures**: error paths and cleanup of temporary artifacts
//! - **cli**: the binary's argument handling and exit status

mod common;

mod cli;
mod failures;
mod install;
