//! The workflow engine: one linear, step-logged pipeline per event kind.
//!
//! Dependencies (hosting client, VCS client, agent runner) are injected so
//! the pipelines can be exercised against fakes. Partial progress is never
//! rolled back: if the push succeeds and PR creation fails, the branch
//! stays on the remote and the error surfaces.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use fh_agent::{AgentRunReport, WorkflowAgent};
use fh_domain::config::{WorkflowConfig, WorkspaceConfig};
use fh_domain::context::{ContextComment, LlmContext, RunMode};
use fh_domain::event::{Event, EventKind};
use fh_domain::outcome::{Decision, Outcome};
use fh_domain::{Error, Result};
use fh_githost::{Comment, GitHost, PrRequest};
use fh_vcs::Vcs;

use super::prompt;
use super::steps::WorkflowLog;
use super::workspace::{self, Workspace};

pub struct Engine {
    workflow: WorkflowConfig,
    workspace: WorkspaceConfig,
    github_token: String,
    host: Arc<dyn GitHost>,
    vcs: Arc<dyn Vcs>,
    agent: Arc<dyn WorkflowAgent>,
}

fn now_stamp() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}

fn split_full_name(full: &str) -> Result<(String, String)> {
    match full.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(Error::Other(format!("invalid repo full name: {full}"))),
    }
}

/// Replace-set label computation: drop every label in `remove`, keep the
/// rest in order, append `add` when missing.
fn update_progress_labels(current: &[String], add: &str, remove: &[String]) -> Vec<String> {
    let remove: HashSet<&str> = remove
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();
    let mut out: Vec<String> = Vec::new();
    for label in current {
        if remove.contains(label.as_str()) || out.contains(label) {
            continue;
        }
        out.push(label.clone());
    }
    if !add.is_empty() && !out.iter().any(|l| l == add) {
        out.push(add.to_string());
    }
    out
}

/// `@author @commenter …`, deduplicated in first-seen order.
fn mention_participants(author: &str, comments: &[Comment]) -> String {
    let mut seen = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    for user in std::iter::once(author).chain(comments.iter().map(|c| c.user.as_str())) {
        if user.is_empty() || !seen.insert(user.to_string()) {
            continue;
        }
        out.push(format!("@{user}"));
    }
    out.join(" ")
}

fn find_slash_command<'a>(body: &str, commands: &'a [String]) -> Option<&'a str> {
    commands
        .iter()
        .map(String::as_str)
        .find(|cmd| !cmd.is_empty() && body.contains(cmd))
}

fn append_slash_context(body: &str, slash: &str) -> String {
    if body.contains(slash) {
        return body.to_string();
    }
    format!(
        "{}\n\nAutomated optimization triggered by: {slash}",
        body.trim()
    )
}

fn fallback(value: &str, default: String) -> String {
    if value.trim().is_empty() {
        default
    } else {
        value.to_string()
    }
}

impl Engine {
    pub fn new(
        workflow: WorkflowConfig,
        workspace: WorkspaceConfig,
        github_token: impl Into<String>,
        host: Arc<dyn GitHost>,
        vcs: Arc<dyn Vcs>,
        agent: Arc<dyn WorkflowAgent>,
    ) -> Self {
        Self {
            workflow,
            workspace,
            github_token: github_token.into(),
            host,
            vcs,
            agent,
        }
    }

    /// Dispatch one delivery to its pipeline. Unsupported kind/action
    /// combinations return success without work.
    pub async fn handle_event(&self, cancel: &CancellationToken, event: &Event) -> Result<()> {
        match event.kind {
            EventKind::Issues => self.handle_issue_label(cancel, event).await,
            EventKind::IssueComment => self.handle_issue_comment(cancel, event).await,
            EventKind::PrReviewComment => self.handle_pr_comment(cancel, event).await,
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Issue pipelines
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    async fn handle_issue_label(&self, cancel: &CancellationToken, event: &Event) -> Result<()> {
        if event.action != "labeled" {
            tracing::debug!(action = %event.action, "skipping: action is not labeled");
            return Ok(());
        }
        let Some(issue) = &event.issue else {
            return Err(Error::Other("missing issue payload".into()));
        };
        if issue.state != "open" {
            tracing::debug!(issue = issue.number, state = %issue.state, "skipping: issue not open");
            return Ok(());
        }
        if !self.workflow.trigger_labels.iter().any(|l| *l == event.label) {
            tracing::debug!(label = %event.label, "skipping: label not in trigger list");
            return Ok(());
        }

        let log = WorkflowLog::start("issue-label", &event.summary());
        let result = self.run_issue_pipeline(cancel, event, true, &log).await;
        log.finish(&result);
        result
    }

    async fn handle_issue_comment(&self, cancel: &CancellationToken, event: &Event) -> Result<()> {
        if event.action != "created" {
            tracing::debug!(action = %event.action, "skipping: action is not created");
            return Ok(());
        }
        let Some(issue) = &event.issue else {
            return Err(Error::Other("missing issue payload".into()));
        };
        if issue.state != "open" {
            tracing::debug!(issue = issue.number, state = %issue.state, "skipping: issue not open");
            return Ok(());
        }

        let log = WorkflowLog::start("issue-comment", &event.summary());
        let result = self.run_issue_pipeline(cancel, event, false, &log).await;
        log.finish(&result);
        result
    }

    async fn run_issue_pipeline(
        &self,
        cancel: &CancellationToken,
        event: &Event,
        require_labeler: bool,
        log: &WorkflowLog,
    ) -> Result<()> {
        let event_issue = event.issue.as_ref().expect("issue precondition checked");

        let step = log.step(1, "parse-repo-info");
        let (owner, repo) = split_full_name(&event.repository.full_name)
            .map_err(|e| step.fail("split_full_name", e))?;

        let step = log.step(2, "get-issue-details");
        let issue = self
            .host
            .get_issue(&owner, &repo, event_issue.number)
            .await
            .map_err(|e| step.fail("get_issue", e))?;
        if issue.state != "open" {
            tracing::info!(state = %issue.state, "issue is not open, skipping");
            return Ok(());
        }

        let step = log.step(3, "get-issue-comments");
        let comments = self
            .host
            .list_issue_comments(&owner, &repo, issue.number)
            .await
            .map_err(|e| step.fail("list_issue_comments", e))?;

        let step = log.step(4, "prepare-workspace");
        let ws = workspace::prepare(
            &self.workspace.base,
            &event.repository,
            &format!("issue-{}", issue.number),
            &self.github_token,
            &now_stamp(),
            self.vcs.as_ref(),
        )
        .await
        .map_err(|e| step.fail("prepare_workspace", e))?;
        let repo_dir = ws.repo_dir();
        tracing::info!(workdir = %ws.root.display(), "workspace prepared");

        let step = log.step(5, "set-remote-auth");
        self.vcs
            .set_remote_auth(&repo_dir, &self.github_token)
            .await
            .map_err(|e| step.fail("set_remote_auth", e))?;

        let step = log.step(6, "get-default-branch");
        let default_branch = if event.repository.default_branch.is_empty() {
            self.host
                .get_repo(&owner, &repo)
                .await
                .map_err(|e| step.fail("get_repo", e))?
                .default_branch
        } else {
            event.repository.default_branch.clone()
        };
        tracing::info!(branch = %default_branch, "using default branch");

        // The timestamp makes retries idempotent against a prior failed push.
        let branch = format!("llm/issue-{}-{}", issue.number, now_stamp());
        let step = log.step(7, "checkout-branch");
        self.vcs
            .checkout_branch(&repo_dir, &branch, &format!("origin/{default_branch}"))
            .await
            .map_err(|e| step.fail("checkout_branch", e))?;

        let step = log.step(8, "update-labels-in-progress");
        let mut remove = vec![
            self.workflow.done_label.clone(),
            self.workflow.needs_info_label.clone(),
        ];
        remove.extend(self.workflow.trigger_labels.iter().cloned());
        let labels =
            update_progress_labels(&issue.labels, &self.workflow.in_progress_label, &remove);
        self.host
            .set_issue_labels(&owner, &repo, issue.number, &labels)
            .await
            .map_err(|e| step.fail("set_issue_labels", e))?;

        let step = log.step(9, "prepare-llm-prompt");
        let mode = if event.kind == EventKind::IssueComment {
            RunMode::IssueComment
        } else {
            RunMode::Issue
        };
        let mut ctx = LlmContext::new(mode, repo_dir.to_string_lossy(), &event.repository.full_name);
        ctx.issue_number = issue.number;
        ctx.issue_title = issue.title.clone();
        ctx.issue_body = issue.body.clone();
        ctx.issue_labels = issue.labels.clone();
        ctx.issue_comments = comments
            .iter()
            .map(|c| ContextComment {
                user: c.user.clone(),
                body: c.body.clone(),
            })
            .collect();
        ctx.comment_body = event.comment_body.clone();
        ctx.requirements = "Address the issue by implementing a fix and preparing a PR.".into();
        let ctx = prompt::prepare(&ws, ctx)
            .await
            .map_err(|e| step.fail("prepare_prompt", e))?;

        let step = log.step(10, "run-llm");
        let report = self
            .run_agent(cancel, &ws, &ctx, &owner, &repo, issue.number)
            .await
            .map_err(|e| step.fail("run", e))?;
        let outcome = report.outcome;
        tracing::info!(decision = ?outcome.decision(), files = outcome.files.len(), "LLM completed");

        match outcome.decision() {
            Decision::Proceed => {}
            Decision::NeedsInfo => {
                log.step(11, "check-decision");
                return self
                    .post_needs_info(&owner, &repo, &issue, &comments, &outcome)
                    .await;
            }
            Decision::Stop => {
                log.step(11, "check-decision");
                let body = fallback(&outcome.summary, "Automation stopped without changes.".into());
                return self
                    .host
                    .create_issue_comment(&owner, &repo, issue.number, &body)
                    .await;
            }
        }

        let step = log.step(12, "apply-changes");
        self.apply_changes(&ws, &outcome)
            .await
            .map_err(|e| step.fail("apply_changes", e))?;

        let step = log.step(13, "check-for-changes");
        let has_changes = self
            .vcs
            .has_changes(&repo_dir)
            .await
            .map_err(|e| step.fail("has_changes", e))?;
        if !has_changes {
            tracing::warn!("no file changes detected");
            return self
                .host
                .create_issue_comment(
                    &owner,
                    &repo,
                    issue.number,
                    "Automation completed but no file changes were made. The LLM indicated it would make changes but none were detected.",
                )
                .await;
        }

        let step = log.step(14, "commit-changes");
        let message = fallback(
            &outcome.commit_message,
            format!("Resolve issue #{}", issue.number),
        );
        self.vcs
            .commit_all(&repo_dir, &message)
            .await
            .map_err(|e| step.fail("commit_all", e))?;

        let step = log.step(15, "push-changes");
        self.vcs
            .push(&repo_dir, &branch)
            .await
            .map_err(|e| step.fail("push", e))?;

        let step = log.step(16, "create-pr");
        let pr = self
            .host
            .create_pr(
                &owner,
                &repo,
                &PrRequest {
                    title: fallback(&outcome.pr_title, format!("Resolve issue #{}", issue.number)),
                    body: fallback(&outcome.pr_body, format!("Resolves #{}", issue.number)),
                    head: branch.clone(),
                    base: default_branch.clone(),
                },
            )
            .await
            .map_err(|e| step.fail("create_pr", e))?;
        tracing::info!(pr = pr.number, url = %pr.url, "PR created");

        if require_labeler && !event.sender.is_empty() {
            log.step(17, "add-assignees");
            if let Err(e) = self
                .host
                .add_assignees(&owner, &repo, pr.number, &[event.sender.clone()])
                .await
            {
                tracing::warn!(error = %e, "failed to add assignees");
            }
        }

        let step = log.step(18, "update-labels-done");
        let mut remove = vec![
            self.workflow.in_progress_label.clone(),
            self.workflow.needs_info_label.clone(),
        ];
        remove.extend(self.workflow.trigger_labels.iter().cloned());
        let labels = update_progress_labels(&issue.labels, &self.workflow.done_label, &remove);
        self.host
            .set_issue_labels(&owner, &repo, issue.number, &labels)
            .await
            .map_err(|e| step.fail("set_issue_labels", e))?;

        let step = log.step(19, "post-completion-comment");
        self.host
            .create_issue_comment(
                &owner,
                &repo,
                issue.number,
                &format!("Automation completed. PR: {}", pr.url),
            )
            .await
            .map_err(|e| step.fail("create_issue_comment", e))?;

        Ok(())
    }

    async fn post_needs_info(
        &self,
        owner: &str,
        repo: &str,
        issue: &fh_githost::Issue,
        comments: &[Comment],
        outcome: &Outcome,
    ) -> Result<()> {
        let mut body = fallback(
            &outcome.needs_info_comment,
            fallback(
                &outcome.summary,
                "More information is required before automation can proceed.".into(),
            ),
        );
        let mentions = mention_participants(&issue.author, comments);
        if !mentions.is_empty() {
            body = format!("{body}\n\n{mentions}");
        }
        if !self.workflow.needs_info_label.is_empty() {
            let mut remove = vec![
                self.workflow.in_progress_label.clone(),
                self.workflow.done_label.clone(),
            ];
            remove.extend(self.workflow.trigger_labels.iter().cloned());
            let labels =
                update_progress_labels(&issue.labels, &self.workflow.needs_info_label, &remove);
            if let Err(e) = self
                .host
                .set_issue_labels(owner, repo, issue.number, &labels)
                .await
            {
                tracing::warn!(error = %e, "failed to set needs-info labels");
            }
        }
        self.host
            .create_issue_comment(owner, repo, issue.number, &body)
            .await
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // PR pipeline
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    async fn handle_pr_comment(&self, cancel: &CancellationToken, event: &Event) -> Result<()> {
        if event.action != "created" {
            tracing::debug!(action = %event.action, "skipping: action is not created");
            return Ok(());
        }
        let Some(event_pr) = &event.pull_request else {
            return Err(Error::Other("missing pull request payload".into()));
        };
        let Some(slash) =
            find_slash_command(&event.comment_body, &self.workflow.pr_slash_commands)
        else {
            tracing::debug!(pr = event_pr.number, "skipping: no slash command found");
            return Ok(());
        };
        let slash = slash.to_string();

        let log = WorkflowLog::start("pr-optimize", &event.summary());
        let result = self.run_pr_pipeline(cancel, event, &slash, &log).await;
        log.finish(&result);
        result
    }

    async fn run_pr_pipeline(
        &self,
        cancel: &CancellationToken,
        event: &Event,
        slash: &str,
        log: &WorkflowLog,
    ) -> Result<()> {
        let event_pr = event.pull_request.as_ref().expect("pr precondition checked");

        let step = log.step(1, "parse-repo-info");
        let (owner, repo) = split_full_name(&event.repository.full_name)
            .map_err(|e| step.fail("split_full_name", e))?;

        let step = log.step(2, "get-pr-details");
        let pr = self
            .host
            .get_pr(&owner, &repo, event_pr.number)
            .await
            .map_err(|e| step.fail("get_pr", e))?;
        if pr.state != "open" {
            tracing::info!(state = %pr.state, "PR is not open, skipping");
            return Ok(());
        }

        let step = log.step(3, "prepare-workspace");
        let ws = workspace::prepare(
            &self.workspace.base,
            &event.repository,
            &format!("pr-{}", pr.number),
            &self.github_token,
            &now_stamp(),
            self.vcs.as_ref(),
        )
        .await
        .map_err(|e| step.fail("prepare_workspace", e))?;
        let repo_dir = ws.repo_dir();
        tracing::info!(workdir = %ws.root.display(), "workspace prepared");

        let step = log.step(4, "set-remote-auth");
        self.vcs
            .set_remote_auth(&repo_dir, &self.github_token)
            .await
            .map_err(|e| step.fail("set_remote_auth", e))?;

        // The PR's existing head branch is reused, never a fresh branch.
        let step = log.step(5, "checkout-branch");
        self.vcs
            .checkout_branch(&repo_dir, &pr.head_ref, &format!("origin/{}", pr.head_ref))
            .await
            .map_err(|e| step.fail("checkout_branch", e))?;

        let step = log.step(6, "prepare-llm-prompt");
        let mut ctx = LlmContext::new(
            RunMode::PrOptimize,
            repo_dir.to_string_lossy(),
            &event.repository.full_name,
        );
        ctx.pr_number = pr.number;
        ctx.pr_title = pr.title.clone();
        ctx.pr_body = pr.body.clone();
        ctx.pr_head_ref = pr.head_ref.clone();
        ctx.pr_base_ref = pr.base_ref.clone();
        ctx.comment_body = event.comment_body.clone();
        ctx.slash_command = slash.to_string();
        ctx.requirements = "Optimize the existing PR based on the slash command.".into();
        let ctx = prompt::prepare(&ws, ctx)
            .await
            .map_err(|e| step.fail("prepare_prompt", e))?;

        let step = log.step(7, "run-llm");
        let report = self
            .run_agent(cancel, &ws, &ctx, &owner, &repo, pr.number)
            .await
            .map_err(|e| step.fail("run", e))?;
        let outcome = report.outcome;
        tracing::info!(decision = ?outcome.decision(), "LLM completed");

        if outcome.decision() != Decision::Proceed {
            log.step(8, "check-decision");
            let body = fallback(
                &outcome.needs_info_comment,
                fallback(&outcome.summary, "Automation stopped without changes.".into()),
            );
            return self
                .host
                .create_issue_comment(&owner, &repo, pr.number, &body)
                .await;
        }

        let step = log.step(9, "apply-changes");
        self.apply_changes(&ws, &outcome)
            .await
            .map_err(|e| step.fail("apply_changes", e))?;

        let step = log.step(10, "check-for-changes");
        let has_changes = self
            .vcs
            .has_changes(&repo_dir)
            .await
            .map_err(|e| step.fail("has_changes", e))?;
        if !has_changes {
            tracing::warn!("no file changes detected");
            return self
                .host
                .create_issue_comment(
                    &owner,
                    &repo,
                    pr.number,
                    "Automation completed but no file changes were made.",
                )
                .await;
        }

        let step = log.step(11, "commit-changes");
        let message = fallback(&outcome.commit_message, format!("Optimize PR #{}", pr.number));
        self.vcs
            .commit_all(&repo_dir, &message)
            .await
            .map_err(|e| step.fail("commit_all", e))?;

        let step = log.step(12, "push-changes");
        self.vcs
            .push(&repo_dir, &pr.head_ref)
            .await
            .map_err(|e| step.fail("push", e))?;

        let step = log.step(13, "update-pr-body");
        let new_body = if outcome.pr_body.trim().is_empty() {
            append_slash_context(&pr.body, slash)
        } else {
            outcome.pr_body.clone()
        };
        self.host
            .update_pr_body(&owner, &repo, pr.number, &new_body)
            .await
            .map_err(|e| step.fail("update_pr_body", e))?;

        let step = log.step(14, "post-completion-comment");
        self.host
            .create_issue_comment(
                &owner,
                &repo,
                pr.number,
                &format!("Automation applied: {slash}"),
            )
            .await
            .map_err(|e| step.fail("create_issue_comment", e))?;

        Ok(())
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Shared steps
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Run the agent and persist artifacts on every exit path. On failure a
    /// best-effort "Automation failed" comment is posted before the error
    /// surfaces.
    async fn run_agent(
        &self,
        cancel: &CancellationToken,
        ws: &Workspace,
        ctx: &LlmContext,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<AgentRunReport> {
        match self.agent.run(cancel, ctx).await {
            Ok(report) => {
                workspace::write_run_artifacts(ws, &report.artifacts, None).await;
                Ok(report)
            }
            Err(failure) => {
                workspace::write_run_artifacts(ws, &failure.artifacts, Some(&failure.error)).await;
                let _ = self
                    .host
                    .create_issue_comment(
                        owner,
                        repo,
                        number,
                        &format!("Automation failed: {}", failure.error),
                    )
                    .await;
                Err(failure.error)
            }
        }
    }

    /// Write the outcome's file map (preferred) or apply its patch.
    async fn apply_changes(&self, ws: &Workspace, outcome: &Outcome) -> Result<()> {
        let repo_dir = ws.repo_dir();
        if !outcome.files.is_empty() {
            for (rel_path, content) in &outcome.files {
                let full = repo_dir.join(rel_path);
                if let Some(parent) = full.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&full, content.as_bytes()).await?;
                tracing::debug!(path = %rel_path, bytes = content.len(), "wrote file");
            }
            return Ok(());
        }
        if !outcome.patch.is_empty() {
            tracing::info!(patch_bytes = outcome.patch.len(), "applying patch fallback");
            self.vcs.apply_patch(&repo_dir, &outcome.patch).await?;
        }
        Ok(())
    }
}
