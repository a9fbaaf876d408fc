//! Core types for setup-sqlite
//!
//! Currently this is the error layer: [`SetupError`] for library code and
//! [`ErrorContext`] / [`user_friendly_error`] for presenting failures on the
//! command line.

pub mod error;

pub use error::{ErrorContext, SetupError, user_friendly_error};

/// Result alias used across the library.
pub type Result<T, E = SetupError> = std::result::Result<T, E>;
