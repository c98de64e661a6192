//! External tool server client.
//!
//! Third-party tool processes speak JSON-RPC 2.0 over newline-delimited
//! JSON on stdio, with the MCP method namespace (`initialize`,
//! `notifications/initialized`, `tools/list`, `tools/call`). Each configured
//! server becomes one [`McpServer`] handle whose discovered tools are
//! registered into the shared tool registry under `mcp_<server>_<tool>`.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{ContentItem, ToolCallResult, ToolInfo, PROTOCOL_VERSION};
pub use server::McpServer;
pub use transport::{StdioTransport, TransportError};
