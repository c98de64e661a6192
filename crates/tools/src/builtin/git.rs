//! Git tools: typed wrappers over the same `GitClient` the workflow engine
//! uses, gated by the VCS permission.

use async_trait::async_trait;
use serde_json::{json, Value};

use fh_vcs::GitClient;

use crate::{input_str, require_str, Tool, ToolContext, ToolOutput};

fn client() -> GitClient {
    GitClient::new()
}

fn to_output(result: fh_domain::Result<String>, empty_message: &str) -> ToolOutput {
    match result {
        Ok(output) if output.trim().is_empty() => ToolOutput::text(empty_message),
        Ok(output) => ToolOutput::text(output),
        Err(e) => ToolOutput::error(e.to_string()),
    }
}

pub struct GitStatusTool;

#[async_trait]
impl Tool for GitStatusTool {
    fn name(&self) -> &str {
        "git_status"
    }

    fn description(&self) -> &str {
        "Show the working tree status. Displays paths that have differences between the index and the current HEAD commit."
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, cx: &ToolContext, _input: &Value) -> ToolOutput {
        if !cx.permissions.vcs {
            return ToolOutput::error("git operations not allowed");
        }
        to_output(
            client().status_porcelain(&cx.work_dir).await,
            "Working tree clean",
        )
    }
}

pub struct GitDiffTool;

#[async_trait]
impl Tool for GitDiffTool {
    fn name(&self) -> &str {
        "git_diff"
    }

    fn description(&self) -> &str {
        "Show changes between commits, commit and working tree, etc. By default shows unstaged changes."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "staged": {
                    "type": "boolean",
                    "description": "If true, show staged changes (--cached)"
                },
                "path": {
                    "type": "string",
                    "description": "Limit diff to a specific file or directory"
                }
            }
        })
    }

    async fn execute(&self, cx: &ToolContext, input: &Value) -> ToolOutput {
        if !cx.permissions.vcs {
            return ToolOutput::error("git operations not allowed");
        }
        let staged = input.get("staged").and_then(|v| v.as_bool()).unwrap_or(false);
        let path = input_str(input, "path").filter(|p| !p.is_empty());
        to_output(
            client().diff(&cx.work_dir, staged, path).await,
            "No changes",
        )
    }
}

pub struct GitLogTool;

#[async_trait]
impl Tool for GitLogTool {
    fn name(&self) -> &str {
        "git_log"
    }

    fn description(&self) -> &str {
        "Show commit history. Returns the last N commits with hash, author, date, and message."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "count": {
                    "type": "integer",
                    "description": "Number of commits to show (default: 10, max: 50)"
                },
                "oneline": {
                    "type": "boolean",
                    "description": "One line per commit"
                }
            }
        })
    }

    async fn execute(&self, cx: &ToolContext, input: &Value) -> ToolOutput {
        if !cx.permissions.vcs {
            return ToolOutput::error("git operations not allowed");
        }
        let count = input
            .get("count")
            .and_then(|v| v.as_u64())
            .filter(|c| *c > 0)
            .unwrap_or(10)
            .min(50) as u32;
        let oneline = input
            .get("oneline")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        to_output(
            client().log(&cx.work_dir, count, oneline).await,
            "No commits",
        )
    }
}

pub struct GitAddTool;

#[async_trait]
impl Tool for GitAddTool {
    fn name(&self) -> &str {
        "git_add"
    }

    fn description(&self) -> &str {
        "Stage files for commit."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "paths": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Paths to stage"
                }
            },
            "required": ["paths"]
        })
    }

    async fn execute(&self, cx: &ToolContext, input: &Value) -> ToolOutput {
        if !cx.permissions.vcs {
            return ToolOutput::error("git operations not allowed");
        }
        let paths: Vec<String> = input
            .get("paths")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if paths.is_empty() {
            return ToolOutput::error("paths is required");
        }
        match client().add(&cx.work_dir, &paths).await {
            Ok(()) => ToolOutput::text(format!("Staged {} path(s)", paths.len())),
            Err(e) => ToolOutput::error(e.to_string()),
        }
    }
}

pub struct GitCommitTool;

#[async_trait]
impl Tool for GitCommitTool {
    fn name(&self) -> &str {
        "git_commit"
    }

    fn description(&self) -> &str {
        "Create a commit from the staged changes."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "Commit message"
                }
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, cx: &ToolContext, input: &Value) -> ToolOutput {
        if !cx.permissions.vcs {
            return ToolOutput::error("git operations not allowed");
        }
        let message = match require_str(input, "message") {
            Ok(message) => message,
            Err(out) => return out,
        };
        match client().commit(&cx.work_dir, message).await {
            Ok(()) => ToolOutput::text("Committed"),
            Err(e) => ToolOutput::error(e.to_string()),
        }
    }
}

pub struct GitBranchTool;

#[async_trait]
impl Tool for GitBranchTool {
    fn name(&self) -> &str {
        "git_branch"
    }

    fn description(&self) -> &str {
        "List, create, or switch branches."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["list", "create", "switch"],
                    "description": "Branch operation to perform"
                },
                "name": {
                    "type": "string",
                    "description": "Branch name (required for create and switch)"
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, cx: &ToolContext, input: &Value) -> ToolOutput {
        if !cx.permissions.vcs {
            return ToolOutput::error("git operations not allowed");
        }
        let action = match require_str(input, "action") {
            Ok(action) => action,
            Err(out) => return out,
        };
        match action {
            "list" => to_output(client().branch_list(&cx.work_dir).await, "No branches"),
            "create" | "switch" => {
                let name = match require_str(input, "name") {
                    Ok(name) => name,
                    Err(out) => return out,
                };
                let result = if action == "create" {
                    client().branch_create(&cx.work_dir, name).await
                } else {
                    client().branch_switch(&cx.work_dir, name).await
                };
                match result {
                    Ok(()) => ToolOutput::text(format!("Branch {action}: {name}")),
                    Err(e) => ToolOutput::error(e.to_string()),
                }
            }
            other => ToolOutput::error(format!("unknown action: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    fn init_repo(dir: &std::path::Path) {
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.name", "t"],
            vec!["config", "user.email", "t@localhost"],
        ] {
            assert!(Command::new("git")
                .args(&args)
                .current_dir(dir)
                .status()
                .unwrap()
                .success());
        }
        std::fs::write(dir.join("a.txt"), "a").unwrap();
        assert!(Command::new("git")
            .args(["add", "."])
            .current_dir(dir)
            .status()
            .unwrap()
            .success());
        assert!(Command::new("git")
            .args(["commit", "-q", "-m", "init"])
            .current_dir(dir)
            .status()
            .unwrap()
            .success());
    }

    #[tokio::test]
    async fn status_reports_clean_tree() {
        let tmp = tempfile::tempdir().unwrap();
        init_repo(tmp.path());
        let out = GitStatusTool
            .execute(&ToolContext::new(tmp.path()), &json!({}))
            .await;
        assert!(!out.is_error);
        assert_eq!(out.content, "Working tree clean");
    }

    #[tokio::test]
    async fn add_and_commit_flow() {
        let tmp = tempfile::tempdir().unwrap();
        init_repo(tmp.path());
        let cx = ToolContext::new(tmp.path());

        std::fs::write(tmp.path().join("b.txt"), "b").unwrap();
        let out = GitAddTool
            .execute(&cx, &json!({"paths": ["b.txt"]}))
            .await;
        assert!(!out.is_error, "{}", out.content);

        let out = GitCommitTool
            .execute(&cx, &json!({"message": "add b"}))
            .await;
        assert!(!out.is_error, "{}", out.content);

        let out = GitLogTool.execute(&cx, &json!({"oneline": true})).await;
        assert!(out.content.contains("add b"));
    }

    #[tokio::test]
    async fn branch_requires_name_for_create() {
        let tmp = tempfile::tempdir().unwrap();
        init_repo(tmp.path());
        let out = GitBranchTool
            .execute(&ToolContext::new(tmp.path()), &json!({"action": "create"}))
            .await;
        assert!(out.is_error);
        assert!(out.content.contains("name is required"));
    }

    #[tokio::test]
    async fn vcs_permission_is_enforced() {
        let tmp = tempfile::tempdir().unwrap();
        let cx = ToolContext::new(tmp.path()).with_permissions(crate::Permissions::read_only());
        let out = GitStatusTool.execute(&cx, &json!({})).await;
        assert!(out.is_error);
        assert!(out.content.contains("not allowed"));
    }
}
