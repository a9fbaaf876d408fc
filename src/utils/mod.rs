//! Shared helpers: host platform detection and rate-limit backoff.

pub mod backoff;
pub mod platform;

pub use platform::Platform;
