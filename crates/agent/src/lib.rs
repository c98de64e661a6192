//! The agent loop: a multi-turn conversation between one LLM provider and
//! the tool registry, bounded by iteration and history-size limits.

pub mod compact;
pub mod r#loop;
pub mod runner;
pub mod truncate;

pub use compact::Compactor;
pub use r#loop::{AgentLoop, LoopCallbacks, LoopFailure, LoopReport, LoopRequest, ToolCallRecord};
pub use runner::{AgentRunFailure, AgentRunReport, ApiAgentRunner, RunArtifacts, WorkflowAgent};
