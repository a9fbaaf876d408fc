//! Failed installs: errors surface unchanged and temporary artifacts are gone.

use crate::common::Runner;
use anyhow::Result;
use futures::FutureExt;
use setup_sqlite::archive::{ArchiveKind, Extractor};
use setup_sqlite::cache::ToolCache;
use setup_sqlite::core::SetupError;
use setup_sqlite::installer::InstallRequest;
use setup_sqlite::test_utils::ScriptedResponse;
use setup_sqlite::utils::platform::Platform;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

#[tokio::test]
async fn test_missing_bundle_fails_download() -> Result<()> {
    let runner = Runner::new(Platform::Linux)?;
    runner.github.script_release(&runner.transport, "3.47.2", "2024-12-07T20:39:59Z");
    let url = runner.download_url("3.47.2", "2024")?;
    runner.transport.push(&url, ScriptedResponse::status(404));

    let err = runner.run(&InstallRequest::version("3.47.2")).await.unwrap_err();

    match err {
        SetupError::DownloadFailed {
            url: failed_url,
            reason,
        } => {
            assert_eq!(failed_url, url);
            assert!(reason.contains("404"), "unexpected reason: {reason}");
        }
        other => panic!("expected DownloadFailed, got {other:?}"),
    }
    assert_eq!(runner.transport.discarded(), 1);
    assert_eq!(runner.dirs.temp_entries()?, 0);
    assert_eq!(runner.cache.find("sqlite", "3.47.2"), None);
    assert!(runner.path_file_lines()?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_corrupt_bundle_fails_extraction() -> Result<()> {
    let runner = Runner::new(Platform::Linux)?;
    runner.github.script_release(&runner.transport, "3.47.2", "2024-12-07T20:39:59Z");
    runner.transport.push(
        &runner.download_url("3.47.2", "2024")?,
        ScriptedResponse::ok(b"<html>Not Found</html>".to_vec()),
    );

    let err = runner.run(&InstallRequest::version("3.47.2")).await.unwrap_err();

    assert!(matches!(err, SetupError::ExtractFailed { .. }), "got {err:?}");
    assert_eq!(runner.dirs.temp_entries()?, 0);
    assert_eq!(runner.cache.find("sqlite", "3.47.2"), None);
    Ok(())
}

#[tokio::test]
async fn test_unknown_version_stops_before_download() -> Result<()> {
    let runner = Runner::new(Platform::Linux)?;
    let tag_url = runner.github.tag_ref_url("3.99.0");
    runner.transport.push(&tag_url, ScriptedResponse::status(404));

    let err = runner.run(&InstallRequest::version("3.99.0")).await.unwrap_err();

    assert!(matches!(err, SetupError::VersionNotFound { ref version } if version == "3.99.0"));
    assert_eq!(runner.transport.requests(), vec![tag_url]);
    Ok(())
}

#[tokio::test]
async fn test_unknown_version_with_single_retry() -> Result<()> {
    let mut runner = Runner::new(Platform::Linux)?;
    runner.max_retries = 1;
    let tag_url = runner.github.tag_ref_url("9.9.9");
    runner.transport.push(&tag_url, ScriptedResponse::status(404));

    let err = runner.run(&InstallRequest::version("9.9.9")).await.unwrap_err();

    assert!(matches!(err, SetupError::VersionNotFound { ref version } if version == "9.9.9"), "got {err:?}");
    assert_eq!(runner.transport.request_count(&tag_url), 1);
    Ok(())
}

#[tokio::test]
async fn test_malformed_version_makes_no_requests() -> Result<()> {
    let runner = Runner::new(Platform::Linux)?;

    let err = runner.run(&InstallRequest::version("3.x")).await.unwrap_err();

    assert!(matches!(err, SetupError::InvalidVersionFormat { .. }));
    assert!(runner.transport.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_exhausts_retry_budget() -> Result<()> {
    let mut runner = Runner::new(Platform::Linux)?;
    runner.max_retries = 2;
    let tag_url = runner.github.tag_ref_url("3.47.2");
    for _ in 0..3 {
        runner.transport.push(&tag_url, ScriptedResponse::retry_after(0));
    }

    let err = runner.run(&InstallRequest::version("3.47.2")).await.unwrap_err();

    assert!(
        matches!(err, SetupError::RetryExhausted { attempts: 3, status: 403, .. }),
        "got {err:?}"
    );
    assert_eq!(runner.transport.request_count(&tag_url), 3);
    assert_eq!(runner.transport.discarded(), 3);
    Ok(())
}

#[tokio::test]
async fn test_empty_tag_listing() -> Result<()> {
    let runner = Runner::new(Platform::Linux)?;
    runner.transport.push(
        &format!("{}/matching-refs/tags/version-", crate::common::API),
        ScriptedResponse::json(&serde_json::json!([])),
    );

    let err = runner.run(&InstallRequest::latest()).await.unwrap_err();

    assert!(matches!(err, SetupError::NoVersionsAvailable { .. }));
    Ok(())
}

/// Unpacks nothing and panics halfway through.
struct PanickingExtractor;

impl Extractor for PanickingExtractor {
    fn extract(&self, _archive: &Path, _kind: ArchiveKind, destination: &Path) -> setup_sqlite::core::Result<PathBuf> {
        std::fs::write(destination.join("half-written"), b"...").map_err(SetupError::from)?;
        panic!("extractor crashed");
    }
}

#[tokio::test]
async fn test_panic_still_runs_cleanup() -> Result<()> {
    let runner = Runner::new(Platform::Linux)?;
    runner.github.script_release(&runner.transport, "3.47.2", "2024-12-07T20:39:59Z");
    runner.transport.push(
        &runner.download_url("3.47.2", "2024")?,
        ScriptedResponse::ok(setup_sqlite::test_utils::ArchiveFixture::flat_zip()?),
    );

    let request = InstallRequest::version("3.47.2");
    let outcome = AssertUnwindSafe(runner.run_with(&request, &PanickingExtractor)).catch_unwind().await;

    assert!(outcome.is_err(), "the panic should propagate to the caller");
    assert_eq!(runner.dirs.temp_entries()?, 0);
    assert_eq!(runner.cache.find("sqlite", "3.47.2"), None);
    Ok(())
}
