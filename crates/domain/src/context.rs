//! The logical request handed to the agent runner.
//!
//! Serialized verbatim into `outputs/context.json` for traceability, so the
//! field names are part of the artifact contract.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Issue,
    IssueComment,
    PrOptimize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextComment {
    pub user: String,
    pub body: String,
}

/// Everything the engine knows about the triggering event, packaged for the
/// agent. Optional sections serialize only when populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmContext {
    pub mode: RunMode,
    pub repo_path: String,
    pub repo_full_name: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub issue_number: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issue_title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issue_body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issue_labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issue_comments: Vec<ContextComment>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub pr_number: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pr_title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pr_body: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pr_head_ref: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pr_base_ref: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment_body: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub slash_command: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo_instructions: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub requirements: String,
    /// Rendered task prompt; filled by prompt preparation, not serialized.
    #[serde(skip)]
    pub prompt: String,
    /// Where the agent may drop its JSON answer; not serialized.
    #[serde(skip)]
    pub output_path: String,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl LlmContext {
    pub fn new(mode: RunMode, repo_path: impl Into<String>, repo_full_name: impl Into<String>) -> Self {
        Self {
            mode,
            repo_path: repo_path.into(),
            repo_full_name: repo_full_name.into(),
            issue_number: 0,
            issue_title: String::new(),
            issue_body: String::new(),
            issue_labels: Vec::new(),
            issue_comments: Vec::new(),
            pr_number: 0,
            pr_title: String::new(),
            pr_body: String::new(),
            pr_head_ref: String::new(),
            pr_base_ref: String::new(),
            comment_body: String::new(),
            slash_command: String::new(),
            repo_instructions: String::new(),
            requirements: String::new(),
            prompt: String::new(),
            output_path: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sections_are_omitted_from_context_json() {
        let ctx = LlmContext::new(RunMode::Issue, "/w/repo", "org/repo");
        let v = serde_json::to_value(&ctx).unwrap();
        assert_eq!(v["mode"], "issue");
        assert!(v.get("pr_number").is_none());
        assert!(v.get("issue_number").is_none());
        assert!(v.get("prompt").is_none());
    }

    #[test]
    fn populated_issue_fields_serialize() {
        let mut ctx = LlmContext::new(RunMode::IssueComment, "/w/repo", "org/repo");
        ctx.issue_number = 12;
        ctx.issue_comments = vec![ContextComment {
            user: "alice".into(),
            body: "ping".into(),
        }];
        let v = serde_json::to_value(&ctx).unwrap();
        assert_eq!(v["issue_number"], 12);
        assert_eq!(v["issue_comments"][0]["user"], "alice");
    }
}
