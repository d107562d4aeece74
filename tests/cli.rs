// tests/cli.rs

mod common;

use assert_cmd::prelude::*;
use common::treesync_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_help_lists_subcommands() -> Result<(), Box<dyn std::error::Error>> {
    treesync_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("clear-cache"));
    Ok(())
}

#[test]
fn test_sync_help_lists_network_options() -> Result<(), Box<dyn std::error::Error>> {
    treesync_cmd()
        .args(["sync", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--proxy"))
        .stdout(predicate::str::contains("--ca-bundle"))
        .stdout(predicate::str::contains("--no-ssl-verify"))
        .stdout(predicate::str::contains("GITHUB_TOKEN"));
    Ok(())
}

#[test]
fn test_error_missing_repo_url() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    treesync_cmd()
        .args(["sync", "--local"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing required value: --repo"));
    Ok(())
}

#[test]
fn test_error_invalid_proxy_scheme() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    treesync_cmd()
        .args(["sync", "--repo", "https://github.com/octo/hello", "--local"])
        .arg(temp.path())
        .args(["--proxy", "file:///etc/passwd"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid_proxy_scheme"));
    Ok(())
}

#[test]
fn test_error_proxy_without_host() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    treesync_cmd()
        .args(["sync", "--repo", "https://github.com/octo/hello", "--local"])
        .arg(temp.path())
        .args(["--proxy", "http://:8080"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing hostname"));
    Ok(())
}

#[test]
fn test_error_ssl_options_conflict() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let pem = temp.path().join("ca.pem");
    fs::write(&pem, "-----BEGIN CERTIFICATE-----\n")?;
    treesync_cmd()
        .args(["sync", "--repo", "https://github.com/octo/hello", "--local"])
        .arg(temp.path())
        .arg("--no-ssl-verify")
        .arg("--ca-bundle")
        .arg(&pem)
        .assert()
        .failure()
        .stderr(predicate::str::contains("simultaneously"));
    Ok(())
}

#[test]
fn test_error_not_a_github_url() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    treesync_cmd()
        .args(["sync", "--repo", "https://gitlab.com/octo/hello", "--local"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a GitHub URL"));
    Ok(())
}

#[test]
fn test_error_invalid_size_format() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    treesync_cmd()
        .args(["sync", "--repo", "https://github.com/octo/hello", "--local"])
        .arg(temp.path())
        .args(["--max-file-size", "huge"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid size format"));
    Ok(())
}

#[test]
fn test_repo_url_from_environment() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    // Reaches URL validation, so the env var was picked up.
    treesync_cmd()
        .env("GITHUB_REPO_URL", "https://example.org/octo/hello")
        .env("TREESYNC_LOCAL_PATH", temp.path())
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a GitHub URL"));
    Ok(())
}

#[test]
fn test_clear_cache_on_empty_dir() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    treesync_cmd()
        .args(["clear-cache", "--local"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 0 cached entries"));
    assert!(!temp.path().join(".synccache").exists());
    Ok(())
}

#[test]
fn test_clear_cache_removes_hash_file() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let state = temp.path().join(".synccache");
    fs::create_dir_all(&state)?;
    fs::write(
        state.join("file_hashes.json"),
        r#"{"a.txt": "a1", "b/c.txt": "c1"}"#,
    )?;

    treesync_cmd()
        .args(["clear-cache", "--local"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 2 cached entries"));
    assert!(!state.join("file_hashes.json").exists());
    Ok(())
}

#[test]
fn test_clear_cache_requires_local_path() -> Result<(), Box<dyn std::error::Error>> {
    treesync_cmd()
        .arg("clear-cache")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--local"));
    Ok(())
}
