//! Hosting-platform tools: thin wrappers over the GitHub client using the
//! context's token and owner/repo defaults, gated by the platform permission.

use async_trait::async_trait;
use serde_json::{json, Value};

use fh_githost::{GitHost, GitHubClient};

use crate::{input_str, require_str, Tool, ToolContext, ToolOutput};

fn client(cx: &ToolContext) -> Result<GitHubClient, ToolOutput> {
    if cx.github_token.is_empty() {
        return Err(ToolOutput::error("github token not configured"));
    }
    GitHubClient::new("", &cx.github_token).map_err(|e| ToolOutput::error(e.to_string()))
}

/// Owner/repo from the input when given, else the context defaults.
fn target(cx: &ToolContext, input: &Value) -> Result<(String, String), ToolOutput> {
    let owner = input_str(input, "owner")
        .filter(|s| !s.is_empty())
        .unwrap_or(&cx.repo_owner)
        .to_string();
    let repo = input_str(input, "repo")
        .filter(|s| !s.is_empty())
        .unwrap_or(&cx.repo_name)
        .to_string();
    if owner.is_empty() || repo.is_empty() {
        return Err(ToolOutput::error("owner and repo are required"));
    }
    Ok((owner, repo))
}

pub struct GetIssueTool;

#[async_trait]
impl Tool for GetIssueTool {
    fn name(&self) -> &str {
        "github_get_issue"
    }

    fn description(&self) -> &str {
        "Get details of a GitHub issue: title, body, state, labels, and author."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "number": {"type": "integer", "description": "Issue number"},
                "owner": {"type": "string", "description": "Repository owner (defaults to the current repository)"},
                "repo": {"type": "string", "description": "Repository name (defaults to the current repository)"}
            },
            "required": ["number"]
        })
    }

    async fn execute(&self, cx: &ToolContext, input: &Value) -> ToolOutput {
        if !cx.permissions.githost {
            return ToolOutput::error("github operations not allowed");
        }
        let Some(number) = input.get("number").and_then(|v| v.as_u64()) else {
            return ToolOutput::error("number is required");
        };
        let (owner, repo) = match target(cx, input) {
            Ok(t) => t,
            Err(out) => return out,
        };
        let client = match client(cx) {
            Ok(client) => client,
            Err(out) => return out,
        };
        match client.get_issue(&owner, &repo, number).await {
            Ok(issue) => ToolOutput::text(format!(
                "#{} [{}] {}\nLabels: {}\nAuthor: {}\n\n{}",
                issue.number,
                issue.state,
                issue.title,
                issue.labels.join(", "),
                issue.author,
                issue.body
            )),
            Err(e) => ToolOutput::error(e.to_string()),
        }
    }
}

pub struct CreateCommentTool;

#[async_trait]
impl Tool for CreateCommentTool {
    fn name(&self) -> &str {
        "github_create_comment"
    }

    fn description(&self) -> &str {
        "Post a comment on a GitHub issue or pull request."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "number": {"type": "integer", "description": "Issue or PR number"},
                "body": {"type": "string", "description": "Comment body"},
                "owner": {"type": "string", "description": "Repository owner (defaults to the current repository)"},
                "repo": {"type": "string", "description": "Repository name (defaults to the current repository)"}
            },
            "required": ["number", "body"]
        })
    }

    async fn execute(&self, cx: &ToolContext, input: &Value) -> ToolOutput {
        if !cx.permissions.githost {
            return ToolOutput::error("github operations not allowed");
        }
        let Some(number) = input.get("number").and_then(|v| v.as_u64()) else {
            return ToolOutput::error("number is required");
        };
        let body = match require_str(input, "body") {
            Ok(body) => body,
            Err(out) => return out,
        };
        let (owner, repo) = match target(cx, input) {
            Ok(t) => t,
            Err(out) => return out,
        };
        let client = match client(cx) {
            Ok(client) => client,
            Err(out) => return out,
        };
        match client
            .create_issue_comment(&owner, &repo, number, body)
            .await
        {
            Ok(()) => ToolOutput::text(format!("Comment posted on #{number}")),
            Err(e) => ToolOutput::error(e.to_string()),
        }
    }
}

pub struct ListIssuesTool;

#[async_trait]
impl Tool for ListIssuesTool {
    fn name(&self) -> &str {
        "github_list_issues"
    }

    fn description(&self) -> &str {
        "List issues in the repository, optionally filtered by state and labels."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "state": {"type": "string", "enum": ["open", "closed", "all"], "description": "Issue state filter (default: open)"},
                "labels": {"type": "string", "description": "Comma-separated label filter"},
                "limit": {"type": "integer", "description": "Maximum number of issues (default: 20)"}
            }
        })
    }

    async fn execute(&self, cx: &ToolContext, input: &Value) -> ToolOutput {
        if !cx.permissions.githost {
            return ToolOutput::error("github operations not allowed");
        }
        let state = input_str(input, "state").unwrap_or("open");
        let labels = input_str(input, "labels").unwrap_or("");
        let limit = input
            .get("limit")
            .and_then(|v| v.as_u64())
            .filter(|l| *l > 0)
            .unwrap_or(20)
            .min(100) as u32;
        let (owner, repo) = match target(cx, input) {
            Ok(t) => t,
            Err(out) => return out,
        };
        let client = match client(cx) {
            Ok(client) => client,
            Err(out) => return out,
        };
        match client.list_issues(&owner, &repo, state, labels, limit).await {
            Ok(issues) if issues.is_empty() => ToolOutput::text("No issues found"),
            Ok(issues) => {
                let lines: Vec<String> = issues
                    .iter()
                    .map(|i| format!("#{} [{}] {}", i.number, i.state, i.title))
                    .collect();
                ToolOutput::text(lines.join("\n"))
            }
            Err(e) => ToolOutput::error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permission_gate_applies() {
        let cx = ToolContext::new("/tmp").with_permissions(crate::Permissions::read_only());
        let out = GetIssueTool.execute(&cx, &json!({"number": 1})).await;
        assert!(out.is_error);
        assert!(out.content.contains("not allowed"));
    }

    #[tokio::test]
    async fn missing_token_is_an_error_result() {
        let cx = ToolContext::new("/tmp").with_github("", "org", "repo");
        let out = GetIssueTool.execute(&cx, &json!({"number": 1})).await;
        assert!(out.is_error);
        assert!(out.content.contains("token"));
    }

    #[tokio::test]
    async fn missing_owner_repo_is_an_error_result() {
        let cx = ToolContext::new("/tmp").with_github("tok", "", "");
        let out = CreateCommentTool
            .execute(&cx, &json!({"number": 1, "body": "hi"}))
            .await;
        assert!(out.is_error);
        assert!(out.content.contains("owner and repo"));
    }
}
