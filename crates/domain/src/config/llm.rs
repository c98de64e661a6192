use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Which wire dialect the provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic-style Messages API (`/v1/messages`).
    Claude,
    /// OpenAI-style Chat Completions (`/v1/chat/completions`).
    Openai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "d_kind")]
    pub provider: ProviderKind,
    #[serde(default)]
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "d_key_env")]
    pub api_key_env: String,
    #[serde(skip)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
    #[serde(default = "d_max_tokens")]
    pub max_tokens: u32,
    /// Deadline around one full call, including its retry attempts.
    #[serde(default = "d_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "d_attempts")]
    pub max_attempts: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: d_kind(),
            base_url: String::new(),
            api_key_env: d_key_env(),
            api_key: String::new(),
            model: String::new(),
            max_tokens: d_max_tokens(),
            timeout_secs: d_timeout(),
            max_attempts: d_attempts(),
        }
    }
}

impl LlmConfig {
    pub fn resolve_api_key(&mut self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("llm.base_url is required".into()));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Config("llm.model is required".into()));
        }
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => {
                self.api_key = key;
                Ok(())
            }
            _ => Err(Error::Config(format!(
                "environment variable {} is required",
                self.api_key_env
            ))),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_kind() -> ProviderKind {
    ProviderKind::Claude
}
fn d_key_env() -> String {
    "LLM_API_KEY".into()
}
fn d_max_tokens() -> u32 {
    4096
}
fn d_timeout() -> u64 {
    300
}
fn d_attempts() -> u32 {
    5
}
