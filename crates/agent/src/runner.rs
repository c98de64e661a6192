//! The engine-facing agent runner.
//!
//! Translates the workflow's [`LlmContext`] into one agent-loop run: builds
//! the user prompt from the structured context (the agent works inside the
//! repo checkout and cannot see the `outputs/` artifacts), runs the loop,
//! and parses the final text into an [`Outcome`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use fh_domain::context::LlmContext;
use fh_domain::outcome::{extract_outcome, Outcome};
use fh_domain::{config::AgentConfig, Error};
use fh_providers::LlmProvider;
use fh_tools::{ToolContext, ToolRegistry};

use crate::r#loop::{AgentLoop, LoopCallbacks, LoopRequest};

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an autonomous engineering agent running in a repository workspace.
Your current working directory is the repository root. All shell commands execute here.

IMPORTANT workspace rules:
- All file paths must be RELATIVE to the repository root (e.g., \"src/main.rs\", \"crates/util/src/lib.rs\").
- Do NOT use absolute paths or search the entire filesystem (e.g., never use \"find /\").
- Do NOT create directories like \"workdir/\", \"output/\", or \"tmp/\" in the repository - only modify the existing project structure.
- Use \"find . -name ...\" or \"grep -r ...\" to search within the repository.

You have access to tools for reading/writing files, running shell commands, and interacting with git and GitHub.
Analyze the task context and use the available tools to make the necessary code changes.
When complete, output a JSON object with the following fields:
- decision: 'proceed' (changes ready), 'needs_info' (need more info), or 'stop' (cannot automate)
- needs_info_comment: explanation if decision is needs_info
- commit_message: commit message for changes
- pr_title: title for the PR
- pr_body: body for the PR
- files: map of relative file paths to their complete new content
- summary: summary of what was done";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait + result shapes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Artifacts worth persisting from a run, success or not.
#[derive(Debug, Clone, Default)]
pub struct RunArtifacts {
    /// The final assistant text (normally the outcome JSON).
    pub raw_output: String,
    /// Error chain and diagnostics, empty on clean runs.
    pub run_log: String,
}

#[derive(Debug)]
pub struct AgentRunReport {
    pub outcome: Outcome,
    pub artifacts: RunArtifacts,
}

#[derive(Debug)]
pub struct AgentRunFailure {
    pub error: Error,
    pub artifacts: RunArtifacts,
}

/// What the workflow engine depends on; mocked in engine tests.
#[async_trait]
pub trait WorkflowAgent: Send + Sync {
    async fn run(
        &self,
        cancel: &CancellationToken,
        ctx: &LlmContext,
    ) -> Result<AgentRunReport, AgentRunFailure>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ApiAgentRunner
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ApiAgentRunner {
    agent_loop: AgentLoop,
    config: AgentConfig,
    github_token: String,
}

impl ApiAgentRunner {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        config: AgentConfig,
        github_token: impl Into<String>,
    ) -> Self {
        Self {
            agent_loop: AgentLoop::new(provider, registry),
            config,
            github_token: github_token.into(),
        }
    }

    fn tool_context(&self, ctx: &LlmContext) -> ToolContext {
        let (owner, repo) = ctx
            .repo_full_name
            .split_once('/')
            .unwrap_or((ctx.repo_full_name.as_str(), ""));
        ToolContext::new(Path::new(&ctx.repo_path))
            .with_github(&self.github_token, owner, repo)
            .with_bash_timeout(self.config.bash_timeout_secs)
    }

    /// Ad-hoc invocation for the `/chat` endpoint: no repository context,
    /// free-form system prompt, final text returned as-is.
    pub async fn chat(
        &self,
        cancel: &CancellationToken,
        work_dir: &Path,
        message: &str,
        system_prompt: Option<&str>,
    ) -> fh_domain::Result<String> {
        let request = LoopRequest {
            system_prompt: system_prompt
                .filter(|s| !s.trim().is_empty())
                .unwrap_or("You are a helpful assistant. Answer the user's question concisely.")
                .to_string(),
            repo_instructions: String::new(),
            task: message.to_string(),
            max_iterations: self.config.max_iterations,
            max_messages: self.config.max_messages,
            compaction: self.config.compaction.clone(),
            tool_context: ToolContext::new(work_dir)
                .with_bash_timeout(self.config.bash_timeout_secs),
            callbacks: LoopCallbacks::default(),
        };
        match self.agent_loop.run(cancel, request).await {
            Ok(report) => Ok(report.final_text()),
            Err(failure) => Err(failure.error),
        }
    }
}

#[async_trait]
impl WorkflowAgent for ApiAgentRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        ctx: &LlmContext,
    ) -> Result<AgentRunReport, AgentRunFailure> {
        let request = LoopRequest {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            repo_instructions: ctx.repo_instructions.clone(),
            task: build_user_prompt(ctx),
            max_iterations: self.config.max_iterations,
            max_messages: self.config.max_messages,
            compaction: self.config.compaction.clone(),
            tool_context: self.tool_context(ctx),
            callbacks: LoopCallbacks::default(),
        };

        let report = match self.agent_loop.run(cancel, request).await {
            Ok(report) => report,
            Err(failure) => {
                return Err(AgentRunFailure {
                    artifacts: RunArtifacts {
                        raw_output: failure.partial.final_text(),
                        run_log: failure.error.chain(),
                    },
                    error: failure.error,
                });
            }
        };

        let final_text = report.final_text();
        let mut outcome = match extract_outcome(&final_text) {
            Ok(outcome) => outcome,
            Err(e) => {
                return Err(AgentRunFailure {
                    artifacts: RunArtifacts {
                        raw_output: final_text,
                        run_log: e.chain(),
                    },
                    error: e,
                });
            }
        };

        // The agent usually writes files through the write_file tool and
        // omits them from the final JSON; fold those edits into the outcome
        // so downstream change detection sees the full picture.
        for call in &report.tool_calls {
            if call.name != "write_file" || call.output.is_error {
                continue;
            }
            let (Some(path), Some(content)) = (
                call.input.get("path").and_then(|v| v.as_str()),
                call.input.get("content").and_then(|v| v.as_str()),
            ) else {
                continue;
            };
            outcome
                .files
                .entry(path.to_string())
                .or_insert_with(|| content.to_string());
        }

        tracing::info!(
            decision = ?outcome.decision(),
            files = outcome.files.len(),
            iterations = report.iterations,
            input_tokens = report.usage.input_tokens,
            output_tokens = report.usage.output_tokens,
            "agent run complete"
        );

        Ok(AgentRunReport {
            outcome,
            artifacts: RunArtifacts {
                raw_output: final_text,
                run_log: String::new(),
            },
        })
    }
}

/// Render the structured context into the initial user turn.
fn build_user_prompt(ctx: &LlmContext) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !ctx.repo_full_name.is_empty() {
        parts.push(format!("Repository: {}", ctx.repo_full_name));
    }
    parts.push(
        "Working directory: current directory is the repository root. All file paths should be relative to this directory."
            .into(),
    );

    if ctx.issue_number > 0 {
        parts.push(format!("\n## Issue #{}", ctx.issue_number));
        if !ctx.issue_title.is_empty() {
            parts.push(format!("Title: {}", ctx.issue_title));
        }
        if !ctx.issue_body.is_empty() {
            parts.push(format!("Body:\n{}", ctx.issue_body));
        }
        if !ctx.issue_labels.is_empty() {
            parts.push(format!("Labels: {}", ctx.issue_labels.join(", ")));
        }
        if !ctx.issue_comments.is_empty() {
            parts.push("\n### Comments:".into());
            for comment in &ctx.issue_comments {
                parts.push(format!("@{}: {}", comment.user, comment.body));
            }
        }
    }

    if ctx.pr_number > 0 {
        parts.push(format!("\n## PR #{}", ctx.pr_number));
        if !ctx.pr_title.is_empty() {
            parts.push(format!("Title: {}", ctx.pr_title));
        }
        if !ctx.pr_body.is_empty() {
            parts.push(format!("Body:\n{}", ctx.pr_body));
        }
        if !ctx.pr_head_ref.is_empty() {
            parts.push(format!("Head: {}", ctx.pr_head_ref));
        }
        if !ctx.pr_base_ref.is_empty() {
            parts.push(format!("Base: {}", ctx.pr_base_ref));
        }
    }

    if !ctx.comment_body.is_empty() {
        parts.push(format!("\n## Comment\n{}", ctx.comment_body));
    }
    if !ctx.slash_command.is_empty() {
        parts.push(format!("\nSlash Command: {}", ctx.slash_command));
    }
    if !ctx.requirements.is_empty() {
        parts.push(format!("\n## Requirements\n{}", ctx.requirements));
    }

    parts.push("\n## Instructions".into());
    parts.push("Analyze the context and make the necessary code changes.".into());
    parts.push("Use the available tools to read files, make changes, and run commands.".into());
    parts.push(
        "When complete, output a JSON object with fields: decision, needs_info_comment, commit_message, pr_title, pr_body, files, summary."
            .into(),
    );

    parts.join("\n")
}
