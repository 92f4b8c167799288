//! End-to-end CLI tests for the mdownloader binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

mod support;

use support::mock_service::{ChapterFixture, mount_chapter, mount_pages, mount_title};
use support::socket_guard::start_mock_server_or_skip;

fn mdownloader() -> Command {
    Command::cargo_bin("mdownloader").unwrap()
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    mdownloader()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("zip/cbz archives"))
        .stdout(predicate::str::contains("--check-images"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    mdownloader()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mdownloader"));
}

/// Test that running without IDs is a usage error.
#[test]
fn test_binary_without_ids_fails() {
    mdownloader()
        .assert()
        .failure()
        .stderr(predicate::str::contains("<IDS>"));
}

/// Test that an unknown compare mode is rejected before any request.
#[test]
fn test_binary_invalid_check_mode_rejected() {
    mdownloader()
        .args(["-c", "bytes", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid compare mode"));
}

/// Test that an unknown ID type is rejected.
#[test]
fn test_binary_invalid_type_rejected() {
    mdownloader()
        .args(["--type", "group", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("group"));
}

/// Test that an unknown language code fails validation.
#[test]
fn test_binary_unknown_language_rejected() {
    let temp = TempDir::new().unwrap();
    mdownloader()
        .args(["-l", "zz", "-d"])
        .arg(temp.path())
        .arg("1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown language code"));
}

/// Test that a non-numeric ID that is not a file is rejected.
#[test]
fn test_binary_invalid_id_rejected() {
    let temp = TempDir::new().unwrap();
    mdownloader()
        .arg("-d")
        .arg(temp.path())
        .arg("not-an-id")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid ID"));
}

/// Test that a full title download exits with code 0 and writes archives.
#[tokio::test]
async fn test_binary_downloads_title_from_mock_service() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp = TempDir::new().unwrap();
    let fixture = ChapterFixture::new(1, "1", "1", &["x1.png"]);
    mount_title(&server, 47, "Test Title", &[fixture.clone()]).await;
    mount_chapter(&server, &fixture, "Test Title", 1).await;
    mount_pages(&server, &fixture).await;

    let api_url = format!("{}/api/v2/", server.uri());
    let out = temp.path().to_path_buf();
    tokio::task::spawn_blocking(move || {
        Command::cargo_bin("mdownloader")
            .unwrap()
            .args(["-q", "--chapter-delay", "0", "--api-url", &api_url, "-d"])
            .arg(&out)
            .arg("47")
            .assert()
            .success();
    })
    .await
    .unwrap();

    assert!(
        temp.path()
            .join("Test Title")
            .join("Test Title - c001 (v01) [Scan Team].cbz")
            .exists()
    );
}

/// Test that an unavailable title makes the run exit with code 1.
#[tokio::test]
async fn test_binary_unavailable_title_exits_with_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp = TempDir::new().unwrap();
    let api_url = format!("{}/api/v2/", server.uri());
    let out = temp.path().to_path_buf();

    tokio::task::spawn_blocking(move || {
        Command::cargo_bin("mdownloader")
            .unwrap()
            .args(["-q", "--api-url", &api_url, "-d"])
            .arg(&out)
            .arg("404")
            .assert()
            .code(1);
    })
    .await
    .unwrap();
}
