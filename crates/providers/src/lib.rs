//! LLM provider adapters.
//!
//! Two wire dialects hide behind one [`LlmProvider`] capability: the
//! Anthropic-style Messages API and the OpenAI-style Chat Completions API.
//! Call sites never branch on the dialect — new providers are new
//! implementations, not new call sites.

pub mod anthropic;
pub mod openai_compat;
pub mod retry;
pub mod traits;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiProvider;
pub use traits::LlmProvider;

use std::sync::Arc;

use fh_domain::config::{LlmConfig, ProviderKind};
use fh_domain::Result;

/// Build the configured provider.
pub fn from_config(cfg: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    Ok(match cfg.provider {
        ProviderKind::Claude => Arc::new(AnthropicProvider::from_config(cfg)?),
        ProviderKind::Openai => Arc::new(OpenAiProvider::from_config(cfg)?),
    })
}
