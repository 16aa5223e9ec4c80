//! Integration tests for the pr-bullet binary.
//!
//! Offline cases run the binary directly. Full runs point `GITHUB_API_URL`
//! at a wiremock server.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A pr-bullet command isolated from the user's config and environment.
fn pr_bullet(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pr-bullet").unwrap();
    cmd.env_clear()
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .current_dir(home.path());
    cmd
}

#[test]
fn help_flag_works() {
    let home = TempDir::new().unwrap();
    pr_bullet(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("copying pull request"))
        .stdout(predicate::str::contains("--yes"));
}

#[test]
fn version_flag_works() {
    let home = TempDir::new().unwrap();
    pr_bullet(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pr-bullet"));
}

#[test]
fn pull_request_argument_required() {
    let home = TempDir::new().unwrap();
    pr_bullet(&home).assert().failure();
}

#[test]
fn missing_token_fails() {
    let home = TempDir::new().unwrap();
    pr_bullet(&home)
        .args(["https://github.com/acme/widgets/pull/12", "acme/mirror"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: env GITHUB_TOKEN is not set"));
}

#[test]
fn repository_as_source_rejected() {
    let home = TempDir::new().unwrap();
    pr_bullet(&home)
        .env("GITHUB_TOKEN", "test-token")
        .env("GITHUB_API_URL", "http://127.0.0.1:9")
        .args(["acme/widgets", "acme/mirror"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a pull request: acme/widgets"));
}

#[test]
fn malformed_source_rejected() {
    let home = TempDir::new().unwrap();
    pr_bullet(&home)
        .env("GITHUB_TOKEN", "test-token")
        .env("GITHUB_API_URL", "http://127.0.0.1:9")
        .args(["acme", "acme/mirror"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not parse: acme"));
}

#[test]
fn blank_stdin_has_no_targets() {
    let home = TempDir::new().unwrap();
    pr_bullet(&home)
        .env("GITHUB_TOKEN", "test-token")
        .arg("acme/widgets/pull/12")
        .write_stdin("\n\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no target repositories given"));
}

#[test]
fn invalid_config_file_reported() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("config.toml");
    std::fs::write(&config, "blob_concurrency = 0\n").unwrap();

    pr_bullet(&home)
        .env("GITHUB_TOKEN", "test-token")
        .env("PR_BULLET_CONFIG", &config)
        .args(["acme/widgets/pull/12", "acme/mirror"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("blob_concurrency must be at least 1"));
}

// =============================================================================
// Full runs against a fake API
// =============================================================================

async fn mount_source(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/pulls/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 12,
            "title": "Add README",
            "body": "Adds a README",
            "head": {
                "ref": "feature-x",
                "sha": "head123",
                "repo": { "name": "widgets", "owner": { "login": "acme" } },
                "user": { "login": "octocat" }
            }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/pulls/12/files"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "filename": "README.md" }])),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/git/trees/head123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tree": [
                { "path": "README.md", "mode": "100644", "type": "blob", "sha": "blob1", "size": 5 }
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/git/blobs/blob1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "content": "aGVsbG8=", "encoding": "base64" })),
        )
        .mount(server)
        .await;
}

async fn mount_target(server: &MockServer) {
    let git_ref = |sha: &str| {
        json!({
            "ref": "refs/heads/feature-x",
            "url": "http://example.invalid/git/refs/heads/feature-x",
            "object": { "sha": sha, "type": "commit" }
        })
    };

    Mock::given(method("GET"))
        .and(path("/repos/acme/mirror"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "default_branch": "main",
            "visibility": "public"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/mirror/git/ref/heads/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ref": "refs/heads/main",
            "url": "http://example.invalid/git/refs/heads/main",
            "object": { "sha": "main1", "type": "commit" }
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/mirror/git/refs"))
        .and(body_partial_json(json!({ "ref": "refs/heads/feature-x", "sha": "main1" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(git_ref("main1")))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/mirror/git/commits/main1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": "main1",
            "tree": { "sha": "maintree" }
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/mirror/git/blobs"))
        .and(body_partial_json(json!({ "content": "aGVsbG8=", "encoding": "base64" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "newblob" })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/mirror/git/trees"))
        .and(body_partial_json(json!({ "base_tree": "maintree" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "newtree" })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/mirror/git/commits"))
        .and(body_partial_json(json!({ "message": "Add README", "parents": ["main1"] })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "newcommit" })))
        .mount(server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/repos/acme/mirror/git/refs/heads/feature-x"))
        .and(body_partial_json(json!({ "sha": "newcommit", "force": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(git_ref("newcommit")))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/mirror/pulls"))
        .and(body_partial_json(json!({ "head": "feature-x", "base": "main", "draft": true })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number": 1,
            "html_url": "https://github.com/acme/mirror/pull/1",
            "draft": true
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn stdin_targets_require_yes() {
    let server = MockServer::start().await;
    mount_source(&server).await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/mirror"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "default_branch": "main",
            "visibility": "public"
        })))
        .mount(&server)
        .await;
    let uri = server.uri();

    let assert = tokio::task::spawn_blocking(move || {
        let home = TempDir::new().unwrap();
        pr_bullet(&home)
            .env("GITHUB_TOKEN", "test-token")
            .env("GITHUB_API_URL", uri)
            .arg("https://github.com/acme/widgets/pull/12")
            .write_stdin("acme/mirror\n")
            .assert()
    })
    .await
    .unwrap();

    assert
        .failure()
        .stderr(predicate::str::contains("Original pull request:"))
        .stderr(predicate::str::contains("Files ... 1"))
        .stderr(predicate::str::contains("add the --yes option"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() == "GET"));
}

#[tokio::test(flavor = "multi_thread")]
async fn copies_pull_request_with_yes() {
    let server = MockServer::start().await;
    mount_source(&server).await;
    mount_target(&server).await;
    let uri = server.uri();

    let assert = tokio::task::spawn_blocking(move || {
        let home = TempDir::new().unwrap();
        pr_bullet(&home)
            .env("GITHUB_TOKEN", "test-token")
            .env("GITHUB_API_URL", uri)
            .args(["--yes", "https://github.com/acme/widgets/pull/12"])
            .write_stdin("acme/mirror\n")
            .assert()
    })
    .await
    .unwrap();

    assert.success().stderr(predicate::str::contains(
        "Copying octocat/widgets pull request #12 to acme/mirror ... https://github.com/acme/mirror/pull/1 as draft",
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn prompt_without_terminal_takes_default() {
    let server = MockServer::start().await;
    mount_source(&server).await;
    mount_target(&server).await;
    let uri = server.uri();

    let assert = tokio::task::spawn_blocking(move || {
        let home = TempDir::new().unwrap();
        pr_bullet(&home)
            .env("GITHUB_TOKEN", "test-token")
            .env("GITHUB_API_URL", uri)
            .args(["https://github.com/acme/widgets/pull/12", "acme/mirror"])
            .write_stdin("")
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stderr(predicate::str::contains("Do you want to create pull requests?").not())
        .stderr(predicate::str::contains(
            "to acme/mirror ... https://github.com/acme/mirror/pull/1 as draft",
        ));
}

#[tokio::test(flavor = "multi_thread")]
async fn pull_request_as_target_rejected() {
    let server = MockServer::start().await;
    mount_source(&server).await;
    let uri = server.uri();

    let assert = tokio::task::spawn_blocking(move || {
        let home = TempDir::new().unwrap();
        pr_bullet(&home)
            .env("GITHUB_TOKEN", "test-token")
            .env("GITHUB_API_URL", uri)
            .args([
                "--yes",
                "https://github.com/acme/widgets/pull/12",
                "https://github.com/acme/mirror/pull/3",
            ])
            .assert()
    })
    .await
    .unwrap();

    assert.failure().stderr(predicate::str::contains(
        "invalid arg: https://github.com/acme/mirror/pull/3",
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_target_exits_non_zero() {
    let server = MockServer::start().await;
    mount_source(&server).await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/mirror"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "default_branch": "main",
            "visibility": "private"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/mirror/git/ref/heads/main"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })),
        )
        .mount(&server)
        .await;
    let uri = server.uri();

    let assert = tokio::task::spawn_blocking(move || {
        let home = TempDir::new().unwrap();
        pr_bullet(&home)
            .env("GITHUB_TOKEN", "test-token")
            .env("GITHUB_API_URL", uri)
            .args(["-y", "acme/widgets/pull/12", "acme/mirror"])
            .assert()
    })
    .await
    .unwrap();

    assert.failure().stderr(predicate::str::contains(
        "error: acme/mirror: failed to resolve refs/heads/main: not found: Not Found",
    ));
}
