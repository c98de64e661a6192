//! Bridge from external tool servers into the registry.
//!
//! Each discovered server tool is wrapped as a [`Tool`] named
//! `mcp_<server>_<tool>`. A server that fails to connect degrades
//! gracefully: the warning is logged and the built-ins keep working.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use fh_domain::config::McpServerConfig;
use fh_mcp_client::{McpServer, ToolInfo};

use crate::{Tool, ToolContext, ToolOutput, ToolRegistry};

pub struct McpTool {
    server: Arc<McpServer>,
    info: ToolInfo,
    registry_name: String,
}

impl McpTool {
    pub fn new(server: Arc<McpServer>, info: ToolInfo) -> Self {
        let registry_name = format!("mcp_{}_{}", server.name(), info.name);
        Self {
            server,
            info,
            registry_name,
        }
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.registry_name
    }

    fn description(&self) -> &str {
        &self.info.description
    }

    fn input_schema(&self) -> Value {
        self.info.input_schema.clone()
    }

    async fn execute(&self, _cx: &ToolContext, input: &Value) -> ToolOutput {
        match self.server.call_tool(&self.info.name, input.clone()).await {
            Ok(result) => ToolOutput {
                content: result.text(),
                is_error: result.is_error,
            },
            Err(e) => ToolOutput::error(e.to_string()),
        }
    }
}

/// Connect every configured server and register its tools. Returns the live
/// handles so the caller can shut them down at process end.
pub async fn register_servers(
    registry: &ToolRegistry,
    configs: &[McpServerConfig],
    work_dir: &std::path::Path,
) -> Vec<Arc<McpServer>> {
    let mut servers = Vec::new();
    for config in configs {
        match McpServer::connect(config, work_dir).await {
            Ok(server) => {
                let server = Arc::new(server);
                for info in server.tools().to_vec() {
                    let tool = Arc::new(McpTool::new(Arc::clone(&server), info));
                    if let Err(e) = registry.register(tool) {
                        tracing::warn!(server = %config.name, error = %e, "failed to register tool");
                    }
                }
                servers.push(server);
            }
            Err(e) => {
                tracing::warn!(
                    server = %config.name,
                    error = %e,
                    "failed to initialize tool server, skipping"
                );
            }
        }
    }
    servers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn failed_server_does_not_block_builtins() {
        let registry = ToolRegistry::new();
        crate::builtin::register_all(&registry).unwrap();
        let builtin_count = registry.len();

        let tmp = tempfile::tempdir().unwrap();
        let configs = vec![McpServerConfig {
            name: "broken".into(),
            command: "definitely-not-a-real-binary-xyz".into(),
            args: vec![],
            env: HashMap::new(),
        }];
        let servers = register_servers(&registry, &configs, tmp.path()).await;
        assert!(servers.is_empty());
        assert_eq!(registry.len(), builtin_count);
    }
}
