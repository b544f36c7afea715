//! End-to-end CLI tests for the nexus-harvest binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test that invoking the binary without the required flags prints usage
/// and exits with clap's argument-error code.
#[test]
fn test_binary_without_args_prints_usage_and_fails() {
    let mut cmd = Command::cargo_bin("nexus-harvest").unwrap();
    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Usage"))
        .stderr(predicate::str::contains("--server"));
}

/// Test that a missing extension alone is rejected the same way.
#[test]
fn test_binary_missing_extension_fails() {
    let mut cmd = Command::cargo_bin("nexus-harvest").unwrap();
    cmd.args(["-s", "http://nexus.internal"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--extension"));
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("nexus-harvest").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Crawl a Nexus repository manager"))
        .stdout(predicate::str::contains("--extension"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("nexus-harvest").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nexus-harvest"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("nexus-harvest").unwrap();
    cmd.args(["-s", "http://nexus.internal", "-e", "jar", "--invalid-flag"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that an unreachable repository manager aborts the run with a
/// discovery error and a non-zero exit.
#[test]
fn test_binary_unreachable_server_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("nexus-harvest").unwrap();
    cmd.current_dir(dir.path())
        .args(["-s", "http://127.0.0.1:1", "-e", "jar", "-q"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("repository discovery failed"));
}

/// Test a full crawl through the binary: report file, descriptor tree, crawl
/// log and the per-repository summary on stdout.
#[tokio::test(flavor = "multi_thread")]
async fn test_binary_crawls_mock_server_and_writes_report() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/service/rest/v1/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "releases", "format": "maven2", "type": "hosted", "url": "http://x/releases" },
        ])))
        .mount(&server)
        .await;

    let jar_url = format!("{}/repository/releases/com.x/lib-1.0.jar", server.uri());
    let pom_url = format!("{}/repository/releases/com.x/lib-1.0.pom", server.uri());
    Mock::given(method("GET"))
        .and(path("/service/rest/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "repository": "releases",
                "group": "com.x",
                "name": "lib",
                "version": "1.0",
                "assets": [
                    { "downloadUrl": jar_url },
                    { "downloadUrl": pom_url },
                ],
            }],
            "continuationToken": null,
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repository/releases/com.x/lib-1.0.pom"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<project><name>Lib</name><description>A library</description></project>",
        ))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let work_dir = dir.path().to_path_buf();
    let uri = server.uri();

    // assert_cmd blocks while the binary runs, so keep it off the runtime
    // threads serving the mock server.
    tokio::task::spawn_blocking(move || {
        Command::cargo_bin("nexus-harvest")
            .unwrap()
            .current_dir(&work_dir)
            .args(["-s", uri.as_str(), "-e", "jar", "-q"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Found 1 artifacts in releases"));
    })
    .await
    .unwrap();

    let report = std::fs::read_to_string(dir.path().join("artifacts.csv")).unwrap();
    assert_eq!(
        report,
        format!("{jar_url},releases,com.x,lib,1.0,Lib,A library\n")
    );

    assert!(dir.path().join("logs.log").exists(), "crawl log is created");
    assert!(
        dir.path()
            .join("poms")
            .join("releases")
            .join("com.x")
            .join("lib.pom.xml")
            .exists(),
        "descriptor is stored under the download root"
    );
}
