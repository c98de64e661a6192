//! Wire-level tests for the GitHub client against a mock server.

use httpmock::prelude::*;

use fh_githost::{GitHost, GitHubClient, PrRequest};

#[tokio::test]
async fn get_issue_maps_fields() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/repos/org/repo/issues/12");
        then.status(200).json_body(serde_json::json!({
            "number": 12,
            "state": "open",
            "title": "t",
            "body": "b",
            "user": {"login": "alice"},
            "labels": [{"name": "ai-ready"}, {"name": "bug"}]
        }));
    });

    let client = GitHubClient::new(&server.base_url(), "tok").unwrap();
    let issue = client.get_issue("org", "repo", 12).await.unwrap();
    mock.assert();
    assert_eq!(issue.number, 12);
    assert_eq!(issue.author, "alice");
    assert_eq!(issue.labels, vec!["ai-ready", "bug"]);
}

#[tokio::test]
async fn get_issue_tolerates_null_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/org/repo/issues/3");
        then.status(200).json_body(serde_json::json!({
            "number": 3, "state": "open", "title": "t", "body": null
        }));
    });

    let client = GitHubClient::new(&server.base_url(), "tok").unwrap();
    let issue = client.get_issue("org", "repo", 3).await.unwrap();
    assert_eq!(issue.body, "");
}

#[tokio::test]
async fn set_issue_labels_is_a_put_replace() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/repos/org/repo/issues/12/labels")
            .json_body(serde_json::json!({"labels": ["ai-in-progress"]}));
        then.status(200).json_body(serde_json::json!([]));
    });

    let client = GitHubClient::new(&server.base_url(), "tok").unwrap();
    client
        .set_issue_labels("org", "repo", 12, &["ai-in-progress".to_string()])
        .await
        .unwrap();
    mock.assert();
}

#[tokio::test]
async fn create_pr_returns_url() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/repos/org/repo/pulls")
            .json_body_partial(r#"{"head": "llm/issue-12-x", "base": "main"}"#);
        then.status(201).json_body(serde_json::json!({
            "number": 99,
            "state": "open",
            "title": "Resolve issue #12",
            "html_url": "https://host/org/repo/pull/99",
            "head": {"ref": "llm/issue-12-x"},
            "base": {"ref": "main"}
        }));
    });

    let client = GitHubClient::new(&server.base_url(), "tok").unwrap();
    let pr = client
        .create_pr(
            "org",
            "repo",
            &PrRequest {
                title: "Resolve issue #12".into(),
                body: "Resolves #12".into(),
                head: "llm/issue-12-x".into(),
                base: "main".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(pr.number, 99);
    assert_eq!(pr.url, "https://host/org/repo/pull/99");
}

#[tokio::test]
async fn api_errors_carry_status_and_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/org/repo/issues/1");
        then.status(404).body(r#"{"message": "Not Found"}"#);
    });

    let client = GitHubClient::new(&server.base_url(), "tok").unwrap();
    let err = client.get_issue("org", "repo", 1).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("404"));
    assert!(msg.contains("Not Found"));
}

#[tokio::test]
async fn requests_carry_bearer_token_and_accept_header() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/org/repo")
            .header("authorization", "Bearer tok")
            .header("accept", "application/vnd.github+json");
        then.status(200)
            .json_body(serde_json::json!({"default_branch": "main", "clone_url": "https://host/org/repo.git"}));
    });

    let client = GitHubClient::new(&server.base_url(), "tok").unwrap();
    let repo = client.get_repo("org", "repo").await.unwrap();
    mock.assert();
    assert_eq!(repo.default_branch, "main");
}
