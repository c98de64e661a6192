//! Tool registry and built-in tools.
//!
//! A [`Tool`] is a named capability with a JSON-Schema input shape. Tools
//! never return `Err` for user-level failures — a failed execution is an
//! in-band [`ToolOutput`] with `is_error` set, so the agent sees the error
//! text and can adapt.

pub mod builtin;
pub mod context;
pub mod mcp;
pub mod registry;

pub use context::{Permissions, ToolContext};
pub use registry::ToolRegistry;

use async_trait::async_trait;

/// Result of one tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// A registered capability. Per-call state lives in the [`ToolContext`];
/// tools themselves are stateless and shared.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema describing the tool input.
    fn input_schema(&self) -> serde_json::Value;

    async fn execute(&self, cx: &ToolContext, input: &serde_json::Value) -> ToolOutput;
}

/// Read an optional string field from tool input.
pub(crate) fn input_str<'a>(input: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    input.get(key).and_then(|v| v.as_str())
}

/// Read a required non-empty string field, or produce the error output.
pub(crate) fn require_str<'a>(
    input: &'a serde_json::Value,
    key: &str,
) -> Result<&'a str, ToolOutput> {
    match input_str(input, key) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ToolOutput::error(format!("{key} is required"))),
    }
}
