use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// External tool servers (MCP)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One external tool server: a child process speaking JSON-RPC 2.0 over
/// stdio. Its tools are registered as `mcp_<name>_<tool>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Child environment. Nothing is inherited from the parent process
    /// unless listed here.
    #[serde(default)]
    pub env: HashMap<String, String>,
}
