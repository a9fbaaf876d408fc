//! Binary-level tests. None of these reach the network: every run fails
//! during input validation, before the first request.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn setup_sqlite(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("setup-sqlite").unwrap();
    cmd.env_clear()
        .env("PATH", std::env::var_os("PATH").unwrap_or_default())
        .env("HOME", temp.path())
        .env("RUNNER_TOOL_CACHE", temp.path().join("tool-cache"))
        .env("RUNNER_TEMP", temp.path().join("temp"));
    cmd
}

#[test]
fn test_help_lists_action_inputs() {
    let temp = TempDir::new().unwrap();
    setup_sqlite(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--sqlite-version"))
        .stdout(predicate::str::contains("--sqlite-retry-count"));
}

#[test]
fn test_malformed_version_exits_with_failure() {
    let temp = TempDir::new().unwrap();
    setup_sqlite(&temp)
        .args(["--sqlite-version", "3.x"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid SQLite version format: '3.x'"))
        .stdout(predicate::str::contains("::error::").not());
}

#[test]
fn test_input_variables_are_read() {
    let temp = TempDir::new().unwrap();
    setup_sqlite(&temp)
        .env("INPUT_SQLITE-VERSION", "3.44.0.0.9")
        .env("GITHUB_ACTIONS", "true")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("::error::Invalid SQLite version format: '3.44.0.0.9'"));
}

#[test]
fn test_invalid_url_prefix_is_a_config_error() {
    let temp = TempDir::new().unwrap();
    setup_sqlite(&temp)
        .args(["--sqlite-url-path", "not a url", "--sqlite-version", "3.47.2"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("sqlite-url-path"));
}

#[test]
fn test_unknown_config_key_is_rejected() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("setup-sqlite.toml");
    std::fs::write(&config, "retries = 5\n").unwrap();

    setup_sqlite(&temp)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown field"));
}
