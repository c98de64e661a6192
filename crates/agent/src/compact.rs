//! Conversation compaction.
//!
//! When the history grows past the threshold, the middle slab is replaced
//! by an LLM-authored summary. The first message (original task) and the
//! most recent messages survive verbatim; tool pairs that would be split
//! are re-attached, because pair preservation overrides aggressive
//! compaction.

use std::collections::HashSet;
use std::sync::Arc;

use fh_domain::config::CompactionConfig;
use fh_domain::message::{AgentRequest, ContentBlock, Message, Role};
use fh_providers::LlmProvider;

use crate::truncate::truncate_messages;

const SUMMARIZER_SYSTEM_PROMPT: &str = "\
You are a conversation summarizer. Your task is to create a concise but comprehensive summary of the conversation history that preserves all important context for continuing the task.

Your summary MUST include:
1. **Original Task**: What was the user's initial request/goal?
2. **Key Decisions**: Important decisions made during the conversation
3. **Files Modified**: List of files that were read, created, or modified with brief descriptions of changes
4. **Current State**: What has been accomplished so far?
5. **Pending Work**: What still needs to be done?
6. **Important Context**: Any critical information needed to continue (error messages, specific requirements, etc.)

Format your summary as a structured document. Be concise but don't omit important details.
Do NOT include tool call details or raw outputs - just summarize the key information.";

const TOOL_RESULT_PREVIEW_CHARS: usize = 500;

pub struct Compactor {
    provider: Arc<dyn LlmProvider>,
    config: CompactionConfig,
}

impl Compactor {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompactionConfig) -> Self {
        Self { provider, config }
    }

    pub fn should_compact(&self, messages: &[Message]) -> bool {
        self.config.enabled && messages.len() > self.config.threshold
    }

    /// Compact the conversation. On summarizer failure this degrades to a
    /// plain pair-preserving truncation instead of erroring the run.
    pub async fn compact(&self, messages: &[Message]) -> Vec<Message> {
        if messages.len() <= self.config.keep_recent + 1 {
            return messages.to_vec();
        }
        let summarize_end = messages.len() - self.config.keep_recent;
        if summarize_end <= 1 {
            return messages.to_vec();
        }

        let middle = &messages[1..summarize_end];
        let conversation_text = format_for_summary(middle);
        tracing::debug!(
            messages = middle.len(),
            chars = conversation_text.len(),
            "compacting conversation"
        );

        let summary = match self.generate_summary(&conversation_text).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(error = %e, "compaction summary failed, falling back to truncation");
                return truncate_messages(messages, self.config.keep_recent + 1);
            }
        };

        let mut result = Vec::with_capacity(self.config.keep_recent + 2);
        result.push(messages[0].clone());
        result.push(Message::assistant(format!(
            "[Conversation Summary - {} messages compacted]\n\n{summary}",
            middle.len()
        )));
        result.extend(reattach_tool_pairs(
            &messages[summarize_end..],
            &messages[..summarize_end],
        ));

        tracing::debug!(
            before = messages.len(),
            after = result.len(),
            "compaction complete"
        );
        result
    }

    async fn generate_summary(&self, conversation_text: &str) -> fh_domain::Result<String> {
        let mut req = AgentRequest::new(vec![Message::user(format!(
            "Please summarize the following conversation:\n\n{conversation_text}"
        ))]);
        req.system = Some(SUMMARIZER_SYSTEM_PROMPT.to_string());
        // No tools for summary generation.
        let resp = self.provider.call(req).await?;
        let summary = resp.text();
        if summary.is_empty() {
            return Err(fh_domain::Error::Agent(
                "summary generation returned empty response".into(),
            ));
        }
        Ok(summary)
    }
}

/// Render messages as labeled blocks for the summarizer prompt. Tool inputs
/// are elided and tool results truncated to keep the prompt manageable.
fn format_for_summary(messages: &[Message]) -> String {
    let mut out = String::new();
    for (i, msg) in messages.iter().enumerate() {
        let role = match msg.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        out.push_str(&format!("--- Message {} ({role}) ---\n", i + 1));
        for block in &msg.content {
            match block {
                ContentBlock::Text { text } if !text.is_empty() => {
                    out.push_str(text);
                    out.push('\n');
                }
                ContentBlock::Text { .. } => {}
                ContentBlock::ToolUse { name, .. } => {
                    out.push_str(&format!("[Tool Call: {name}]\n"));
                }
                ContentBlock::ToolResult {
                    content, is_error, ..
                } => {
                    let preview = if content.chars().count() > TOOL_RESULT_PREVIEW_CHARS {
                        let cut: String = content.chars().take(TOOL_RESULT_PREVIEW_CHARS).collect();
                        format!("{cut}... (truncated)")
                    } else {
                        content.clone()
                    };
                    if *is_error {
                        out.push_str(&format!("[Tool Error: {preview}]\n"));
                    } else {
                        out.push_str(&format!("[Tool Result: {preview}]\n"));
                    }
                }
            }
        }
        out.push('\n');
    }
    out
}

/// If a tool-result in the recent slab references a summarized tool-use,
/// prepend the owning messages so no result is orphaned.
fn reattach_tool_pairs(recent: &[Message], older: &[Message]) -> Vec<Message> {
    let recent_uses: HashSet<&str> = recent
        .iter()
        .flat_map(|m| m.tool_uses().map(|(id, _, _)| id))
        .collect();

    let mut orphaned: HashSet<&str> = HashSet::new();
    for msg in recent {
        for block in &msg.content {
            if let ContentBlock::ToolResult { tool_use_id, .. } = block {
                if !tool_use_id.is_empty() && !recent_uses.contains(tool_use_id.as_str()) {
                    orphaned.insert(tool_use_id);
                }
            }
        }
    }
    if orphaned.is_empty() {
        return recent.to_vec();
    }

    let needed: Vec<Message> = older
        .iter()
        .filter(|msg| msg.tool_uses().any(|(id, _, _)| orphaned.contains(id)))
        .cloned()
        .collect();

    tracing::debug!(
        reattached = needed.len(),
        "compaction: re-attached messages to preserve tool pairs"
    );

    let mut out = Vec::with_capacity(needed.len() + recent.len());
    out.extend(needed);
    out.extend_from_slice(recent);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_labels_roles_and_tools() {
        let messages = vec![
            Message::user("do the thing"),
            Message {
                role: Role::Assistant,
                content: vec![ContentBlock::ToolUse {
                    id: "t1".into(),
                    name: "read_file".into(),
                    input: json!({"path": "a"}),
                }],
            },
            Message {
                role: Role::User,
                content: vec![ContentBlock::ToolResult {
                    tool_use_id: "t1".into(),
                    content: "contents".into(),
                    is_error: false,
                }],
            },
        ];
        let text = format_for_summary(&messages);
        assert!(text.contains("(User)"));
        assert!(text.contains("[Tool Call: read_file]"));
        assert!(text.contains("[Tool Result: contents]"));
    }

    #[test]
    fn long_tool_results_are_truncated_in_summary_input() {
        let messages = vec![Message {
            role: Role::User,
            content: vec![ContentBlock::ToolResult {
                tool_use_id: "t1".into(),
                content: "x".repeat(2000),
                is_error: true,
            }],
        }];
        let text = format_for_summary(&messages);
        assert!(text.contains("[Tool Error:"));
        assert!(text.contains("... (truncated)"));
        assert!(text.len() < 700);
    }

    #[test]
    fn reattach_prepends_owning_messages() {
        let older = vec![
            Message::user("task"),
            Message {
                role: Role::Assistant,
                content: vec![ContentBlock::ToolUse {
                    id: "old-1".into(),
                    name: "bash".into(),
                    input: json!({}),
                }],
            },
        ];
        let recent = vec![Message {
            role: Role::User,
            content: vec![ContentBlock::ToolResult {
                tool_use_id: "old-1".into(),
                content: "ok".into(),
                is_error: false,
            }],
        }];
        let out = reattach_tool_pairs(&recent, &older);
        assert_eq!(out.len(), 2);
        assert!(out[0].tool_uses().any(|(id, _, _)| id == "old-1"));
    }

    #[test]
    fn reattach_is_identity_when_pairs_are_local() {
        let recent = vec![
            Message {
                role: Role::Assistant,
                content: vec![ContentBlock::ToolUse {
                    id: "r1".into(),
                    name: "bash".into(),
                    input: json!({}),
                }],
            },
            Message {
                role: Role::User,
                content: vec![ContentBlock::ToolResult {
                    tool_use_id: "r1".into(),
                    content: "ok".into(),
                    is_error: false,
                }],
            },
        ];
        let out = reattach_tool_pairs(&recent, &[]);
        assert_eq!(out.len(), 2);
    }
}
