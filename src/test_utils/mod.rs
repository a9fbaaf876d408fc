//! Test utilities for setup-sqlite
//!
//! Helpers for exercising the installer without a network or a real runner:
//!
//! - [`ScriptedTransport`] replays canned HTTP responses per URL
//! - [`fixtures::GitHubFixture`] builds tag API payloads
//! - [`fixtures::ArchiveFixture`] builds zip and tar+xz tool bundles in memory
//! - [`fixtures::RunnerDirs`] provides throwaway tool cache and temp roots
//!
//! # Example
//!
//! ```rust,no_run
//! use setup_sqlite::http::RetryingHttpClient;
//! use setup_sqlite::test_utils::{ScriptedResponse, ScriptedTransport};
//!
//! # async fn example() -> setup_sqlite::core::Result<()> {
//! let transport = ScriptedTransport::new()
//!     .on("https://api.test/x", ScriptedResponse::retry_after(1))
//!     .on("https://api.test/x", ScriptedResponse::ok(b"{}".to_vec()));
//! let client = RetryingHttpClient::new(&transport, 3);
//! client.get("https://api.test/x").await?;
//! assert_eq!(transport.request_count("https://api.test/x"), 2);
//! # Ok(())
//! # }
//! ```

pub mod fixtures;
pub mod transport;

pub use fixtures::{ArchiveFixture, GitHubFixture, RunnerDirs, TarMember};
pub use transport::{ScriptedResponse, ScriptedTransport};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Installs a test-writer subscriber once per process. Uses `level` when
/// given, otherwise `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=setup_sqlite=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
