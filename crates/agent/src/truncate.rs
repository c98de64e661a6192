//! Pair-preserving history truncation.
//!
//! Truncation always keeps `messages[0]` (the original task) and a suffix of
//! recent messages. The cut point walks backward until no surviving
//! tool-result references a truncated tool-use — correctness over
//! compactness.

use std::collections::HashSet;

use fh_domain::message::{ContentBlock, Message};

/// Fixed-point safety cap; the walk strictly decreases `keep_from` so this
/// is unreachable in practice.
const MAX_FIXPOINT_ITERATIONS: usize = 100;

/// Collect tool-use ids present in `messages[0]` (when `include_first`) and
/// `messages[keep_from..]`.
fn collect_tool_use_ids(
    messages: &[Message],
    keep_from: usize,
    include_first: bool,
) -> HashSet<String> {
    let mut ids = HashSet::new();
    let mut scan = |msg: &Message| {
        for block in &msg.content {
            if let ContentBlock::ToolUse { id, .. } = block {
                if !id.is_empty() {
                    ids.insert(id.clone());
                }
            }
        }
    };
    if include_first {
        if let Some(first) = messages.first() {
            scan(first);
        }
    }
    for msg in &messages[keep_from.min(messages.len())..] {
        scan(msg);
    }
    ids
}

/// Check that every tool-result references a tool-use appearing earlier in
/// the list. Returns the orphan descriptions, empty when the list is valid.
pub fn find_orphans(messages: &[Message]) -> Vec<String> {
    let mut seen_uses: HashSet<&str> = HashSet::new();
    let mut orphans = Vec::new();
    for (i, msg) in messages.iter().enumerate() {
        for block in &msg.content {
            match block {
                ContentBlock::ToolUse { id, .. } if !id.is_empty() => {
                    seen_uses.insert(id);
                }
                ContentBlock::ToolResult { tool_use_id, .. } => {
                    if tool_use_id.is_empty() {
                        orphans.push(format!("msg[{i}]:empty_id"));
                    } else if !seen_uses.contains(tool_use_id.as_str()) {
                        orphans.push(format!("msg[{i}]:{tool_use_id}"));
                    }
                }
                _ => {}
            }
        }
    }
    orphans
}

/// Truncate to roughly `max_messages`, preserving `messages[0]` and every
/// tool-use/tool-result pair. An already-small conversation is returned
/// unchanged.
pub fn truncate_messages(messages: &[Message], max_messages: usize) -> Vec<Message> {
    if messages.len() <= max_messages {
        return messages.to_vec();
    }

    let mut keep_from = messages.len().saturating_sub(max_messages) + 1;
    keep_from = keep_from.max(1);

    for _ in 0..MAX_FIXPOINT_ITERATIONS {
        let kept_ids = collect_tool_use_ids(messages, keep_from, true);
        let mut changed = false;

        'scan: for msg in &messages[keep_from..] {
            for block in &msg.content {
                let ContentBlock::ToolResult { tool_use_id, .. } = block else {
                    continue;
                };
                if tool_use_id.is_empty() || kept_ids.contains(tool_use_id) {
                    continue;
                }
                // Walk backward for the message owning the needed tool-use.
                for j in (1..keep_from).rev() {
                    let owns = messages[j]
                        .tool_uses()
                        .any(|(id, _, _)| id == tool_use_id);
                    if owns {
                        tracing::debug!(
                            index = j,
                            tool_use_id = %tool_use_id,
                            "truncation: extending to keep tool pair"
                        );
                        keep_from = j;
                        changed = true;
                        break 'scan;
                    }
                }
            }
        }

        if !changed {
            break;
        }
    }

    let mut result = Vec::with_capacity(messages.len() - keep_from + 1);
    result.push(messages[0].clone());
    result.extend_from_slice(&messages[keep_from..]);

    for orphan in find_orphans(&result) {
        tracing::warn!(%orphan, "truncation left an orphaned tool_result");
    }

    tracing::debug!(
        before = messages.len(),
        after = result.len(),
        "truncated message history"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use fh_domain::message::Role;
    use serde_json::json;

    fn user(text: &str) -> Message {
        Message::user(text)
    }

    fn tool_use_msg(id: &str) -> Message {
        Message {
            role: Role::Assistant,
            content: vec![ContentBlock::ToolUse {
                id: id.into(),
                name: "bash".into(),
                input: json!({"command": "ls"}),
            }],
        }
    }

    fn tool_result_msg(id: &str) -> Message {
        Message {
            role: Role::User,
            content: vec![ContentBlock::ToolResult {
                tool_use_id: id.into(),
                content: "ok".into(),
                is_error: false,
            }],
        }
    }

    /// 1 task message + 30 (use, result) pairs + final assistant text.
    fn pairs_conversation() -> Vec<Message> {
        let mut messages = vec![user("task")];
        for i in 0..30 {
            messages.push(tool_use_msg(&format!("id-{i}")));
            messages.push(tool_result_msg(&format!("id-{i}")));
        }
        messages.push(Message::assistant("done"));
        messages
    }

    #[test]
    fn small_conversation_is_identity() {
        let messages = vec![user("a"), Message::assistant("b")];
        let out = truncate_messages(&messages, 10);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text(), "a");
    }

    #[test]
    fn truncation_keeps_first_message_and_suffix() {
        let messages = pairs_conversation();
        let out = truncate_messages(&messages, 20);
        assert!(out.len() <= 21);
        assert_eq!(out[0].text(), "task");
        assert_eq!(out.last().unwrap().text(), "done");
    }

    #[test]
    fn truncation_never_orphans_tool_results() {
        let messages = pairs_conversation();
        for max in [4, 10, 20, 40] {
            let out = truncate_messages(&messages, max);
            assert!(
                find_orphans(&out).is_empty(),
                "orphans at max={max}: {:?}",
                find_orphans(&out)
            );
        }
    }

    #[test]
    fn cut_inside_a_pair_extends_to_the_tool_use() {
        // Arrange so the ideal cut lands on a tool_result whose tool_use is
        // just before the cut.
        let mut messages = vec![user("task")];
        for i in 0..5 {
            messages.push(tool_use_msg(&format!("p-{i}")));
            messages.push(tool_result_msg(&format!("p-{i}")));
        }
        // max 2 ⇒ keep_from points at the last tool_result only.
        let out = truncate_messages(&messages, 2);
        assert!(find_orphans(&out).is_empty());
        // Must contain the matching tool_use for the surviving result.
        let has_use = out.iter().any(|m| m.tool_uses().any(|(id, _, _)| id == "p-4"));
        assert!(has_use);
    }

    #[test]
    fn find_orphans_flags_missing_and_empty_ids() {
        let messages = vec![
            user("task"),
            tool_result_msg("never-seen"),
            Message {
                role: Role::User,
                content: vec![ContentBlock::ToolResult {
                    tool_use_id: String::new(),
                    content: "x".into(),
                    is_error: false,
                }],
            },
        ];
        let orphans = find_orphans(&messages);
        assert_eq!(orphans.len(), 2);
        assert!(orphans[0].contains("never-seen"));
        assert!(orphans[1].contains("empty_id"));
    }

    #[test]
    fn valid_pairs_produce_no_orphans() {
        assert!(find_orphans(&pairs_conversation()).is_empty());
    }
}
