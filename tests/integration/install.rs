//! Successful installs: fresh downloads, cache hits and bundle layouts.

use crate::common::{API, Runner};
use anyhow::Result;
use setup_sqlite::cache::ToolCache;
use setup_sqlite::installer::InstallRequest;
use setup_sqlite::test_utils::fixtures::FIXTURE_BINARIES;
use setup_sqlite::test_utils::{ArchiveFixture, ScriptedResponse};
use setup_sqlite::utils::platform::Platform;

#[tokio::test]
async fn test_second_run_is_a_cache_hit() -> Result<()> {
    let runner = Runner::new(Platform::Linux)?;
    let url = runner.download_url("3.47.2", "2024")?;

    // The tag API is consulted on every run, the bundle only once
    runner.github.script_release(&runner.transport, "3.47.2", "2024-12-07T20:39:59Z");
    runner.github.script_release(&runner.transport, "3.47.2", "2024-12-07T20:39:59Z");
    runner.transport.push(&url, ScriptedResponse::ok(ArchiveFixture::flat_zip()?));

    let request = InstallRequest::version("3.47.2");
    let first = runner.run(&request).await?;
    let second = runner.run(&request).await?;

    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(first.version, "3.47.2");
    assert_eq!(first.cache_path, second.cache_path);
    assert_eq!(first.published, second.published);
    assert_eq!(runner.transport.request_count(&url), 1);
    assert!(runner.transport.is_drained());

    assert_eq!(runner.cache.find("sqlite", "3.47.2"), Some(first.cache_path.clone()));
    for name in FIXTURE_BINARIES {
        assert!(first.cache_path.join(name).is_file(), "{name} missing from cache");
    }

    let cache_path = first.cache_path.display().to_string();
    assert_eq!(runner.path_file_lines()?, vec![cache_path.clone(), cache_path]);
    assert_eq!(runner.dirs.temp_entries()?, 0);
    Ok(())
}

#[tokio::test]
async fn test_latest_release_from_tag_listing() -> Result<()> {
    let runner = Runner::new(Platform::Linux)?;
    let listing = runner.github.tag_listing(&["3.46.1", "3.47.2", "3.9.0"]);
    runner.transport.push(
        &format!("{API}/matching-refs/tags/version-"),
        ScriptedResponse::json(&listing),
    );
    runner.github.script_commit(&runner.transport, "3.47.2", "2024-12-07T20:39:59Z");
    runner
        .transport
        .push(&runner.download_url("3.47.2", "2024")?, ScriptedResponse::ok(ArchiveFixture::flat_zip()?));

    let outcome = runner.run(&InstallRequest::latest()).await?;

    assert_eq!(outcome.version, "3.47.2");
    assert!(!outcome.cache_hit);
    assert!(runner.transport.is_drained());
    Ok(())
}

#[tokio::test]
async fn test_supplied_year_is_replaced_by_tag_year() -> Result<()> {
    let runner = Runner::new(Platform::Linux)?;
    runner.github.script_release(&runner.transport, "3.40.0", "2022-11-16T12:10:08Z");
    let url = runner.download_url("3.40.0", "2022")?;
    runner.transport.push(&url, ScriptedResponse::ok(ArchiveFixture::flat_zip()?));

    runner.run(&InstallRequest::version("3.40.0").with_year("2021")).await?;

    assert!(url.ends_with("/2022/sqlite-tools-linux-x86-3400000.zip"));
    assert_eq!(runner.transport.request_count(&url), 1);
    Ok(())
}

#[tokio::test]
async fn test_annotated_tag_with_nested_bundle() -> Result<()> {
    let runner = Runner::new(Platform::Windows)?;
    runner.github.script_annotated_release(&runner.transport, "3.44.0", "2023-11-01T11:23:50Z");
    let url = runner.download_url("3.44.0", "2023")?;
    assert!(url.ends_with("/2023/sqlite-tools-win-x64-3440000.zip"));
    runner.transport.push(
        &url,
        ScriptedResponse::ok(ArchiveFixture::nested_zip("sqlite-tools-win-x64-3440000")?),
    );

    let outcome = runner.run(&InstallRequest::version("3.44.0")).await?;

    let child = outcome.cache_path.join("sqlite-tools-win-x64-3440000");
    assert_eq!(outcome.published, vec![child.clone()]);
    assert!(child.join("sqlite3").is_file());
    assert_eq!(runner.path.added(), vec![child]);
    Ok(())
}

#[tokio::test]
async fn test_tar_xz_bundle_strips_leading_directory() -> Result<()> {
    let runner = Runner::new(Platform::MacOs)?;
    runner.github.script_release(&runner.transport, "3.45.1", "2024-01-30T16:01:20Z");
    runner.transport.push(
        &runner.download_url("3.45.1", "2024")?,
        ScriptedResponse::ok(ArchiveFixture::tar_xz("sqlite-tools-osx-x64-3450100")?),
    );

    let outcome = runner.run(&InstallRequest::version("3.45.1")).await?;

    let bin = outcome.cache_path.join("bin");
    assert_eq!(outcome.published, vec![bin.clone()]);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(bin.join("sqlite3"))?.permissions().mode();
        assert_ne!(mode & 0o111, 0, "sqlite3 should stay executable");
    }
    Ok(())
}

#[tokio::test]
async fn test_rate_limited_tag_lookup_is_retried() -> Result<()> {
    let runner = Runner::new(Platform::Linux)?;
    let tag_url = runner.github.tag_ref_url("3.47.2");
    runner.transport.push(&tag_url, ScriptedResponse::retry_after(0));
    runner.github.script_release(&runner.transport, "3.47.2", "2024-12-07T20:39:59Z");
    runner
        .transport
        .push(&runner.download_url("3.47.2", "2024")?, ScriptedResponse::ok(ArchiveFixture::flat_zip()?));

    let outcome = runner.run(&InstallRequest::version("3.47.2")).await?;

    assert_eq!(outcome.version, "3.47.2");
    assert_eq!(runner.transport.request_count(&tag_url), 2);
    assert_eq!(runner.transport.discarded(), 1);
    Ok(())
}

#[tokio::test]
async fn test_incomplete_cache_entry_is_replaced() -> Result<()> {
    let runner = Runner::new(Platform::Linux)?;
    let stale = runner.cache.entry_path("sqlite", "3.47.2");
    std::fs::create_dir_all(&stale)?;
    std::fs::write(stale.join("partial"), b"interrupted copy")?;

    runner.github.script_release(&runner.transport, "3.47.2", "2024-12-07T20:39:59Z");
    runner
        .transport
        .push(&runner.download_url("3.47.2", "2024")?, ScriptedResponse::ok(ArchiveFixture::flat_zip()?));

    let outcome = runner.run(&InstallRequest::version("3.47.2")).await?;

    assert!(!outcome.cache_hit);
    assert!(!outcome.cache_path.join("partial").exists());
    assert!(outcome.cache_path.join("sqlite3").is_file());
    Ok(())
}
