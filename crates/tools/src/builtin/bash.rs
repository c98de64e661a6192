//! Shell tool.
//!
//! Commands run under `sh -c` in the workspace root with a restricted
//! environment (fixed PATH, the host HOME, plus context extras). A small
//! blocklist rejects known-destructive commands before they start; the
//! timeout kills the process and surfaces an error result.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;

use crate::context::MAX_BASH_TIMEOUT_SECS;
use crate::{require_str, Tool, ToolContext, ToolOutput};

/// Literal-substring blocklist of destructive patterns.
const BLOCKED_COMMANDS: &[&str] = &[
    "rm -rf /",
    "rm -rf ~",
    "mkfs",
    "dd if=/dev/",
    ":(){:|:&};:",
    "> /dev/sd",
    "chmod -r 777 /",
];

fn blocked_pattern(command: &str) -> Option<&'static str> {
    let lower = command.to_lowercase();
    BLOCKED_COMMANDS.iter().find(|p| lower.contains(**p)).copied()
}

pub struct BashTool;

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Execute a shell command. Use this for running tests, building projects, or any shell operations. Commands run in the working directory."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Timeout in seconds (default: 60, max: 300)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, cx: &ToolContext, input: &Value) -> ToolOutput {
        if !cx.permissions.bash {
            return ToolOutput::error("bash execution not allowed");
        }
        let command = match require_str(input, "command") {
            Ok(command) => command,
            Err(out) => return out,
        };
        if let Some(pattern) = blocked_pattern(command) {
            return ToolOutput::error(format!(
                "potentially dangerous command blocked: {pattern}"
            ));
        }

        let timeout_secs = input
            .get("timeout")
            .and_then(|v| v.as_u64())
            .filter(|t| *t > 0)
            .unwrap_or(cx.bash_timeout_secs)
            .clamp(1, MAX_BASH_TIMEOUT_SECS);

        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(&cx.work_dir)
            .env_clear()
            .env("PATH", "/usr/local/bin:/usr/bin:/bin:/usr/sbin:/sbin")
            .env("HOME", home)
            .envs(&cx.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return ToolOutput::error(format!("failed to spawn: {e}")),
        };

        let waited =
            tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
                .await;
        let output = match waited {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return ToolOutput::error(format!("command failed: {e}")),
            // Dropping the future killed the child via kill_on_drop.
            Err(_) => {
                return ToolOutput::error(format!(
                    "Command timed out after {timeout_secs} seconds"
                ))
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str("STDERR:\n");
            combined.push_str(&stderr);
        }

        if !output.status.success() {
            return ToolOutput::error(format!(
                "Command failed with {}\n{combined}",
                output.status
            ));
        }
        if combined.is_empty() {
            combined = "(no output)".into();
        }
        ToolOutput::text(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cx(dir: &std::path::Path) -> ToolContext {
        ToolContext::new(dir)
    }

    #[tokio::test]
    async fn captures_stdout() {
        let tmp = tempfile::tempdir().unwrap();
        let out = BashTool
            .execute(&cx(tmp.path()), &json!({"command": "printf hello"}))
            .await;
        assert!(!out.is_error, "{}", out.content);
        assert_eq!(out.content, "hello");
    }

    #[tokio::test]
    async fn stderr_is_prefixed_and_merged() {
        let tmp = tempfile::tempdir().unwrap();
        let out = BashTool
            .execute(
                &cx(tmp.path()),
                &json!({"command": "printf out; printf err >&2"}),
            )
            .await;
        assert!(!out.is_error);
        assert!(out.content.contains("out"));
        assert!(out.content.contains("STDERR:\nerr"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_error_result() {
        let tmp = tempfile::tempdir().unwrap();
        let out = BashTool
            .execute(&cx(tmp.path()), &json!({"command": "exit 3"}))
            .await;
        assert!(out.is_error);
        assert!(out.content.contains("Command failed"));
    }

    #[tokio::test]
    async fn timeout_kills_and_reports() {
        let tmp = tempfile::tempdir().unwrap();
        let out = BashTool
            .execute(
                &cx(tmp.path()),
                &json!({"command": "sleep 30", "timeout": 1}),
            )
            .await;
        assert!(out.is_error);
        assert!(out.content.contains("timed out after 1 seconds"));
    }

    #[tokio::test]
    async fn destructive_commands_are_blocked() {
        let tmp = tempfile::tempdir().unwrap();
        let out = BashTool
            .execute(&cx(tmp.path()), &json!({"command": "rm -rf / --no-preserve-root"}))
            .await;
        assert!(out.is_error);
        assert!(out.content.contains("blocked"));
    }

    #[tokio::test]
    async fn runs_in_workspace_root() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("marker.txt"), "m").unwrap();
        let out = BashTool
            .execute(&cx(tmp.path()), &json!({"command": "ls"}))
            .await;
        assert!(out.content.contains("marker.txt"));
    }

    #[tokio::test]
    async fn denied_without_permission() {
        let tmp = tempfile::tempdir().unwrap();
        let cx = ToolContext::new(tmp.path()).with_permissions(crate::Permissions::read_only());
        let out = BashTool.execute(&cx, &json!({"command": "true"})).await;
        assert!(out.is_error);
    }
}
