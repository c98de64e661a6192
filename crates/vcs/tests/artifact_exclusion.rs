//! End-to-end checks against a real git repository in a temp directory:
//! `has_changes` / `commit_all` must ignore automation artifacts.

use std::path::Path;
use std::process::Command;

use fh_vcs::{GitClient, Vcs};

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git binary available");
    assert!(status.success(), "git {args:?} failed");
}

fn init_repo(dir: &Path) {
    git(dir, &["init", "-q"]);
    git(dir, &["config", "user.name", "forgehand-test"]);
    git(dir, &["config", "user.email", "test@localhost"]);
    std::fs::write(dir.join("README.md"), "# fixture\n").unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-q", "-m", "init"]);
}

#[tokio::test]
async fn clean_tree_has_no_changes() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    let client = GitClient::new();
    assert!(!client.has_changes(tmp.path()).await.unwrap());
}

#[tokio::test]
async fn commit_all_skips_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    let client = GitClient::new();

    std::fs::write(tmp.path().join("README.md"), "# edited\n").unwrap();
    std::fs::create_dir_all(tmp.path().join("outputs")).unwrap();
    std::fs::write(tmp.path().join("outputs/llm_output.json"), "{}").unwrap();

    assert!(client.has_changes(tmp.path()).await.unwrap());
    client.commit_all(tmp.path(), "edit readme").await.unwrap();

    // The artifact stays uncommitted, and artifact-only changes read clean.
    assert!(!client.has_changes(tmp.path()).await.unwrap());
    let log = client.log(tmp.path(), 1, true).await.unwrap();
    assert!(log.contains("edit readme"));

    std::fs::write(tmp.path().join("outputs/llm_output.json"), "{\"a\":1}").unwrap();
    assert!(!client.has_changes(tmp.path()).await.unwrap());
    // commit_all with only artifact changes is a no-op, not an error.
    client.commit_all(tmp.path(), "should not commit").await.unwrap();
    let log = client.log(tmp.path(), 1, true).await.unwrap();
    assert!(log.contains("edit readme"));
}

#[tokio::test]
async fn apply_patch_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    let client = GitClient::new();

    let patch = "--- a/README.md\n+++ b/README.md\n@@ -1 +1 @@\n-# fixture\n+# patched\n";
    client.apply_patch(tmp.path(), patch).await.unwrap();
    let content = std::fs::read_to_string(tmp.path().join("README.md")).unwrap();
    assert_eq!(content, "# patched\n");

    // Empty patches are accepted without touching the tree.
    client.apply_patch(tmp.path(), "  \n").await.unwrap();
}

#[tokio::test]
async fn checkout_branch_creates_and_resets() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    let client = GitClient::new();

    client
        .checkout_branch(tmp.path(), "llm/issue-12-20260101-000000", "")
        .await
        .unwrap();
    let branches = client.branch_list(tmp.path()).await.unwrap();
    assert!(branches.contains("llm/issue-12-20260101-000000"));
}
