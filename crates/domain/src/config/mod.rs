mod agent;
mod github;
mod llm;
mod mcp;
mod server;
mod workflow;
mod workspace;

pub use agent::*;
pub use github::*;
pub use llm::*;
pub use mcp::*;
pub use server::*;
pub use workflow::*;
pub use workspace::*;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    /// External tool servers contributing tools over stdio JSON-RPC.
    #[serde(default)]
    pub mcp_servers: Vec<McpServerConfig>,
}

impl Config {
    /// Parse a TOML config string. An empty string yields all defaults.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Resolve secrets from the environment and validate required settings.
    /// Failures here are fatal before serving.
    pub fn resolve(&mut self) -> Result<()> {
        self.github.resolve_token()?;
        self.llm.resolve_api_key()?;
        if self.workflow.workers < 1 {
            self.workflow.workers = 1;
        }
        Ok(())
    }
}
