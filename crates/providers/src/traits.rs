//! The provider capability.

use async_trait::async_trait;

use fh_domain::message::{AgentRequest, AgentResponse};
use fh_domain::Result;

/// One-shot request/response against a remote inference service. Retry and
/// dialect translation are the implementation's concern; callers see the
/// internal request/response shape only.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn call(&self, req: AgentRequest) -> Result<AgentResponse>;

    fn name(&self) -> &str;
}
