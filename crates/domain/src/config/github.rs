use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GitHub
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "d_api_base")]
    pub api_base_url: String,
    /// Environment variable holding the hosting token. The token itself is
    /// never written to the config file.
    #[serde(default = "d_token_env")]
    pub token_env: String,
    /// Resolved at startup from `token_env`.
    #[serde(skip)]
    pub token: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base_url: d_api_base(),
            token_env: d_token_env(),
            token: String::new(),
        }
    }
}

impl GithubConfig {
    pub fn resolve_token(&mut self) -> Result<()> {
        match std::env::var(&self.token_env) {
            Ok(token) if !token.trim().is_empty() => {
                self.token = token;
                Ok(())
            }
            _ => Err(Error::Config(format!(
                "environment variable {} is required",
                self.token_env
            ))),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_api_base() -> String {
    "https://api.github.com".into()
}
fn d_token_env() -> String {
    "GITHUB_TOKEN".into()
}
