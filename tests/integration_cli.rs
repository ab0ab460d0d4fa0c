//! Integration tests for records CLI commands
//!
//! Tests the workflow from init through build and release.

mod common;

use assert_cmd::Command;
use common::site_fixture;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

/// Get the records binary
fn records() -> Command {
    let mut cmd = Command::cargo_bin("records").unwrap();
    cmd.env_remove("RECORDS_SITE").env_remove("RECORDS_LOG");
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

#[test]
fn test_help() {
    records()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("records"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("release"));
}

#[test]
fn test_version() {
    records()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_command_suggests_alternative() {
    records()
        .arg("publish")
        .assert()
        .failure()
        .stderr(predicate::str::contains("records build"));
}

#[test]
fn test_init_creates_files() {
    let temp = TempDir::new().unwrap();

    records()
        .arg("init")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized"));

    assert!(temp.path().join("records.toml").exists());
    let managed: Value = serde_json::from_str(
        &fs::read_to_string(temp.path().join("managed.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(managed["packages"], serde_json::json!([]));
}

#[test]
fn test_init_existing_site_fails() {
    let temp = TempDir::new().unwrap();

    records().arg("init").arg(temp.path()).assert().success();
    records()
        .arg("init")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    records()
        .arg("init")
        .arg(temp.path())
        .arg("--force")
        .assert()
        .success();
}

#[test]
fn test_commands_outside_site_fail() {
    let temp = TempDir::new().unwrap();

    records()
        .current_dir(temp.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("records init"));
}

#[test]
fn test_list_json() {
    let temp = site_fixture();

    let output = json_stdout(
        records()
            .arg("list")
            .arg("--format")
            .arg("json")
            .arg("--offline")
            .arg("--site")
            .arg(temp.path()),
    );
    assert_eq!(output["package_count"], 5);
    let slugs: Vec<&str> = output["packages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["slug"].as_str().unwrap())
        .collect();
    assert!(slugs.contains(&"zeta"));
    assert!(slugs.contains(&"twentyacme"));
    assert!(!slugs.contains(&"blocks"));

    let parts = json_stdout(
        records()
            .args(["list", "--parts", "--format", "json", "--offline", "--site"])
            .arg(temp.path()),
    );
    assert_eq!(parts["package_count"], 1);
    assert_eq!(parts["packages"][0]["composer_name"], "pressody-records/blocks");
}

#[test]
fn test_list_from_site_env() {
    let temp = site_fixture();

    records()
        .env("RECORDS_SITE", temp.path())
        .args(["list", "--type", "theme", "--offline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("twentyacme"))
        .stdout(predicate::str::contains("zeta").not());
}

#[test]
fn test_build_writes_packages_json() {
    let temp = site_fixture();

    let summary = json_stdout(
        records()
            .args(["build", "--format", "json", "--offline", "--site"])
            .arg(temp.path()),
    );
    assert_eq!(summary["packages"], 2);

    let root: Value =
        serde_json::from_str(&fs::read_to_string(temp.path().join("public/packages.json")).unwrap())
            .unwrap();
    assert_eq!(root["metadata-url"], "p2/%package%.json");
    assert!(temp
        .path()
        .join("public/p2/pressody-records/acme.json")
        .exists());
    assert!(!temp
        .path()
        .join("public/p2/pressody-records/secret.json")
        .exists());

    records()
        .args(["build", "--include-private", "--offline", "--site"])
        .arg(temp.path())
        .assert()
        .success();
    assert!(temp
        .path()
        .join("public/p2/pressody-records/secret.json")
        .exists());
}

#[test]
fn test_release_prints_stored_path() {
    let temp = site_fixture();

    let output = json_stdout(
        records()
            .args(["release", "zeta", "--format", "json", "--offline", "--site"])
            .arg(temp.path()),
    );
    let path = output["path"].as_str().unwrap();
    assert!(path.contains("storage"));
    assert!(fs::metadata(path).unwrap().len() > 0);
    assert_eq!(output["sha1"].as_str().unwrap().len(), 40);

    // Installed 1.4.2 and managed 1.5.0 share the slug
    let managed = json_stdout(
        records()
            .args(["release", "acme", "1.5.0", "--format", "json", "--offline", "--site"])
            .arg(temp.path()),
    );
    assert!(managed["filename"].as_str().unwrap().starts_with("acme-1.5.0-"));

    records()
        .args(["release", "zeta", "9.9.9", "--offline", "--site"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("9.9.9"));
}

#[test]
fn test_composition_unknown_package_fails() {
    let temp = site_fixture();

    records()
        .args(["composition", "pressody-records/acme:^1.5", "--offline", "--site"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pressody-records/acme\": \"^1.5\""));

    records()
        .args(["composition", "pressody-records/nope", "--offline", "--site"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("pressody-records/nope"));
}

#[test]
fn test_refresh_refuses_offline() {
    let temp = site_fixture();

    records()
        .args(["refresh", "--offline", "--site"])
        .arg(temp.path())
        .assert()
        .failure();
}
