//! The multi-turn agent loop.
//!
//! Per iteration: manage history size (compact, truncate, validate), call
//! the provider, repair duplicate tool-use ids, execute the requested tools
//! sequentially, and append exactly one user message carrying the results.
//! The loop ends on `end_turn`, on error, or at the iteration cap.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use fh_domain::config::CompactionConfig;
use fh_domain::message::{
    AgentRequest, ContentBlock, Message, Role, StopReason, Usage,
};
use fh_domain::Error;
use fh_providers::LlmProvider;
use fh_tools::{ToolContext, ToolOutput, ToolRegistry};

use crate::compact::Compactor;
use crate::truncate::{find_orphans, truncate_messages};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / report
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Optional observation hooks, invoked on each assistant message, each tool
/// dispatch, and each tool result.
#[derive(Default)]
pub struct LoopCallbacks {
    pub on_message: Option<Box<dyn Fn(&Message) + Send + Sync>>,
    pub on_tool_call: Option<Box<dyn Fn(&str, &serde_json::Value) + Send + Sync>>,
    pub on_tool_result: Option<Box<dyn Fn(&str, &ToolOutput) + Send + Sync>>,
}

pub struct LoopRequest {
    /// Base system prompt; repo instructions are appended under a
    /// `## Repository Instructions` section when present.
    pub system_prompt: String,
    pub repo_instructions: String,
    /// The initial user turn.
    pub task: String,
    pub max_iterations: u32,
    pub max_messages: usize,
    pub compaction: CompactionConfig,
    pub tool_context: ToolContext,
    pub callbacks: LoopCallbacks,
}

#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub name: String,
    pub input: serde_json::Value,
    pub output: ToolOutput,
}

#[derive(Debug, Clone, Default)]
pub struct LoopReport {
    pub messages: Vec<Message>,
    pub iterations: u32,
    pub usage: Usage,
    pub tool_calls: Vec<ToolCallRecord>,
}

impl LoopReport {
    /// Text of the last assistant message.
    pub fn final_text(&self) -> String {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(Message::text)
            .unwrap_or_default()
    }
}

/// A failed run still carries the partial state so callers can persist
/// artifacts from whatever the agent produced before the failure.
#[derive(Debug)]
pub struct LoopFailure {
    pub error: Error,
    pub partial: LoopReport,
}

impl std::fmt::Display for LoopFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for LoopFailure {}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AgentLoop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct AgentLoop {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
}

fn generate_tool_use_id() -> String {
    let bytes: [u8; 12] = rand::random();
    let mut id = String::with_capacity(6 + 24);
    id.push_str("toolu_");
    for b in bytes {
        id.push_str(&format!("{b:02x}"));
    }
    id
}

fn build_system_prompt(base: &str, repo_instructions: &str) -> String {
    let mut parts = Vec::new();
    if !base.trim().is_empty() {
        parts.push(base.trim().to_string());
    }
    if !repo_instructions.trim().is_empty() {
        parts.push(format!(
            "## Repository Instructions\n\n{}",
            repo_instructions.trim()
        ));
    }
    if parts.is_empty() {
        return "You are an autonomous engineering agent.".into();
    }
    parts.join("\n\n")
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn LlmProvider>, registry: Arc<ToolRegistry>) -> Self {
        Self { provider, registry }
    }

    pub async fn run(
        &self,
        cancel: &CancellationToken,
        req: LoopRequest,
    ) -> std::result::Result<LoopReport, LoopFailure> {
        let mut report = LoopReport {
            messages: vec![Message::user(&req.task)],
            ..Default::default()
        };

        let system_prompt = build_system_prompt(&req.system_prompt, &req.repo_instructions);
        let tool_defs = self.registry.definitions();
        let compactor = if req.compaction.enabled {
            Some(Compactor::new(
                Arc::clone(&self.provider),
                req.compaction.clone(),
            ))
        } else {
            None
        };
        let max_iterations = if req.max_iterations == 0 {
            50
        } else {
            req.max_iterations
        };
        let max_messages = if req.max_messages == 0 {
            50
        } else {
            req.max_messages
        };

        tracing::debug!(
            tools = tool_defs.len(),
            max_iterations,
            max_messages,
            system_prompt_len = system_prompt.len(),
            "agent loop starting"
        );

        let mut seen_tool_use_ids = std::collections::HashSet::new();

        while report.iterations < max_iterations {
            if cancel.is_cancelled() {
                tracing::debug!(iteration = report.iterations, "agent loop cancelled");
                return Err(LoopFailure {
                    error: Error::Cancelled,
                    partial: report,
                });
            }
            report.iterations += 1;

            // ── history-size management ───────────────────────────────
            if let Some(compactor) = &compactor {
                if compactor.should_compact(&report.messages) {
                    report.messages = compactor.compact(&report.messages).await;
                }
            }
            let mut candidate = if report.messages.len() > max_messages {
                truncate_messages(&report.messages, max_messages)
            } else {
                report.messages.clone()
            };
            let orphans = find_orphans(&candidate);
            if !orphans.is_empty() {
                tracing::warn!(
                    orphans = orphans.len(),
                    "history transformation produced orphans, using full history"
                );
                candidate = report.messages.clone();
            }

            // ── provider call ─────────────────────────────────────────
            let mut call = AgentRequest::new(candidate);
            call.system = Some(system_prompt.clone());
            call.tools = tool_defs.clone();

            let response = tokio::select! {
                resp = self.provider.call(call) => resp,
                _ = cancel.cancelled() => {
                    return Err(LoopFailure { error: Error::Cancelled, partial: report });
                }
            };
            let mut response = match response {
                Ok(resp) => resp,
                Err(e) => {
                    return Err(LoopFailure {
                        error: Error::Agent(format!("agent call failed: {e}")),
                        partial: report,
                    });
                }
            };
            report.usage.add(response.usage);

            // ── unique-id repair ──────────────────────────────────────
            // Some providers return empty ids or reuse ids across calls,
            // which breaks pairing once truncation drops one occurrence.
            for block in &mut response.content {
                if let ContentBlock::ToolUse { id, name, .. } = block {
                    if id.is_empty() || seen_tool_use_ids.contains(id) {
                        let new_id = generate_tool_use_id();
                        tracing::debug!(tool = %name, old = %id, new = %new_id, "repaired tool_use id");
                        *id = new_id;
                    }
                    seen_tool_use_ids.insert(id.clone());
                }
            }

            let assistant = response.to_message();
            report.messages.push(assistant.clone());
            if let Some(cb) = &req.callbacks.on_message {
                cb(&assistant);
            }

            tracing::debug!(
                iteration = report.iterations,
                stop_reason = ?response.stop_reason,
                blocks = response.content.len(),
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "assistant turn"
            );

            // ── stop-reason evaluation ────────────────────────────────
            match response.stop_reason {
                StopReason::EndTurn => {
                    tracing::debug!(iterations = report.iterations, "agent completed");
                    return Ok(report);
                }
                StopReason::MaxTokens => {
                    return Err(LoopFailure {
                        error: Error::Agent("max tokens reached".into()),
                        partial: report,
                    });
                }
                _ => {}
            }

            if !assistant.has_tool_use() {
                tracing::warn!(
                    stop_reason = ?response.stop_reason,
                    "unexpected stop reason without tool use"
                );
                continue;
            }

            // ── tool execution, in declaration order ──────────────────
            let uses: Vec<(String, String, serde_json::Value)> = assistant
                .tool_uses()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();

            let mut results = Vec::with_capacity(uses.len());
            for (id, name, input) in uses {
                if let Some(cb) = &req.callbacks.on_tool_call {
                    cb(&name, &input);
                }
                let output = match self.registry.get(&name) {
                    None => ToolOutput::error(format!("tool not found: {name}")),
                    Some(tool) => {
                        tokio::select! {
                            out = tool.execute(&req.tool_context, &input) => out,
                            _ = cancel.cancelled() => {
                                return Err(LoopFailure { error: Error::Cancelled, partial: report });
                            }
                        }
                    }
                };
                if let Some(cb) = &req.callbacks.on_tool_result {
                    cb(&name, &output);
                }
                tracing::debug!(
                    tool = %name,
                    is_error = output.is_error,
                    bytes = output.content.len(),
                    "tool executed"
                );
                report.tool_calls.push(ToolCallRecord {
                    name,
                    input,
                    output: output.clone(),
                });
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id,
                    content: output.content,
                    is_error: output.is_error,
                });
            }

            report.messages.push(Message {
                role: Role::User,
                content: results,
            });
        }

        Err(LoopFailure {
            error: Error::Agent(format!("max iterations ({max_iterations}) reached")),
            partial: report,
        })
    }
}
