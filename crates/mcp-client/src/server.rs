//! One connected external tool server.

use std::path::Path;
use std::time::Duration;

use serde_json::{json, Value};

use fh_domain::config::McpServerConfig;
use fh_domain::{Error, Result};

use crate::protocol::{
    InitializeParams, InitializeResult, Implementation, ListToolsResult, ToolCallResult,
    ToolInfo, METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
};
use crate::transport::StdioTransport;

const INITIALIZE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct McpServer {
    name: String,
    transport: StdioTransport,
    server_info: Implementation,
    tools: Vec<ToolInfo>,
}

impl McpServer {
    /// Spawn the process, run the MCP handshake, and discover tools.
    ///
    /// A failure anywhere here is isolated to this server: the caller logs a
    /// warning and keeps going with built-ins and other servers.
    pub async fn connect(config: &McpServerConfig, work_dir: &Path) -> Result<Self> {
        let transport = StdioTransport::spawn(config, work_dir)
            .map_err(|e| Error::Other(format!("tool server {}: {e}", config.name)))?;

        let handshake = async {
            let params = serde_json::to_value(InitializeParams::client())?;
            let resp = transport
                .send(METHOD_INITIALIZE, Some(params))
                .await
                .map_err(|e| Error::Other(format!("initialize: {e}")))?;
            if let Some(err) = resp.error {
                return Err(Error::Other(format!("initialize failed: {err}")));
            }
            let result: InitializeResult =
                serde_json::from_value(resp.result.unwrap_or(Value::Null))?;

            transport
                .notify(METHOD_INITIALIZED)
                .await
                .map_err(|e| Error::Other(format!("initialized notification: {e}")))?;

            let tools_resp = transport
                .send(METHOD_TOOLS_LIST, None)
                .await
                .map_err(|e| Error::Other(format!("tools/list: {e}")))?;
            let tools = match tools_resp.error {
                Some(err) => {
                    tracing::warn!(server = %config.name, error = %err, "tools/list returned error");
                    Vec::new()
                }
                None => {
                    let listed: ListToolsResult =
                        serde_json::from_value(tools_resp.result.unwrap_or(Value::Null))?;
                    listed.tools
                }
            };
            Ok((result.server_info, tools))
        };

        let (server_info, tools) = tokio::time::timeout(INITIALIZE_TIMEOUT, handshake)
            .await
            .map_err(|_| Error::Timeout(format!("tool server {} initialize", config.name)))??;

        tracing::info!(
            server = %config.name,
            server_impl = %server_info.name,
            tool_count = tools.len(),
            "tool server initialized"
        );

        Ok(Self {
            name: config.name.clone(),
            transport,
            server_info,
            tools,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    pub fn tools(&self) -> &[ToolInfo] {
        &self.tools
    }

    /// Forward to `tools/call` with `{name, arguments}`.
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<ToolCallResult> {
        if !self.transport.is_alive() {
            return Err(Error::Other(format!("tool server {} is down", self.name)));
        }
        let params = json!({ "name": tool_name, "arguments": arguments });
        let resp = self
            .transport
            .send(METHOD_TOOLS_CALL, Some(params))
            .await
            .map_err(|e| Error::Other(format!("tools/call: {e}")))?;
        if let Some(err) = resp.error {
            return Err(Error::Other(format!("tools/call failed: {err}")));
        }
        serde_json::from_value(resp.result.unwrap_or(Value::Null)).map_err(Error::Json)
    }

    pub async fn shutdown(&self) {
        tracing::debug!(server = %self.name, "shutting down tool server");
        self.transport.close().await;
    }
}
