//! Startup behaviour of the `trackerd` binary.
//!
//! Only failure paths that exit before binding are exercised, so no port is
//! ever opened.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn trackerd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("trackerd"));
    cmd.current_dir(dir);
    for key in [
        "TRACKER_BIND",
        "TRACKER_DATABASE_URI",
        "PORT",
        "TRACKER_LOG_FORMAT",
    ] {
        cmd.env_remove(key);
    }
    cmd.env("TRACKER_LOG", "error");
    cmd
}

#[test]
fn help_lists_flags() {
    let dir = TempDir::new().expect("temp dir");
    trackerd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--database-uri"))
        .stdout(predicate::str::contains("--bind"));
}

#[test]
fn unsupported_database_uri_fails_with_code() {
    let dir = TempDir::new().expect("temp dir");
    trackerd(dir.path())
        .args(["--database-uri", "mongodb://localhost/issues"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"));
}

#[test]
fn unsupported_database_uri_from_env() {
    let dir = TempDir::new().expect("temp dir");
    trackerd(dir.path())
        .env("TRACKER_DATABASE_URI", "postgres://db/issues")
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"));
}

#[test]
fn broken_config_file_fails_with_code() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("tracker.toml"), "bind = [\n").expect("write config");
    trackerd(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
}

#[test]
fn missing_explicit_config_fails() {
    let dir = TempDir::new().expect("temp dir");
    trackerd(dir.path())
        .args(["--config", "absent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}
