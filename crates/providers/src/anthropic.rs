//! Anthropic-native adapter.
//!
//! The internal conversation model already uses Anthropic's block shapes,
//! so the request serializes directly and the response parses directly into
//! the common [`AgentResponse`]. No translation layer.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use fh_domain::config::LlmConfig;
use fh_domain::message::{AgentRequest, AgentResponse};
use fh_domain::{Error, Result};

use crate::retry::{should_retry, RetryPolicy};
use crate::traits::LlmProvider;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MESSAGES_PATH: &str = "/v1/messages";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct AnthropicProvider {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            timeout: Duration::from_secs(cfg.timeout_secs.max(1)),
            retry: RetryPolicy::new(cfg.max_attempts, Duration::from_secs(2)),
            client,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("Anthropic base URL is empty".into()));
        }
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("Anthropic API key is empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Config("Anthropic model is empty".into()));
        }
        Ok(())
    }

    async fn attempt(&self, payload: &Value) -> (Option<u16>, Result<AgentResponse>) {
        let url = format!("{}{}", self.base_url, MESSAGES_PATH);
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await;

        let resp = match resp {
            Ok(resp) => resp,
            Err(e) => return (None, Err(Error::Http(e.to_string()))),
        };
        let status = resp.status().as_u16();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => return (Some(status), Err(Error::Http(e.to_string()))),
        };

        if status >= 400 {
            return (Some(status), Err(wrap_api_error("claude", status, &body)));
        }
        // A 2xx with an empty or unparseable body is treated as transient.
        let parsed = parse_response(&body);
        (Some(status), parsed)
    }
}

fn parse_response(body: &str) -> Result<AgentResponse> {
    if body.trim().is_empty() {
        return Err(Error::Provider {
            provider: "claude".into(),
            message: "empty response body".into(),
        });
    }
    serde_json::from_str::<AgentResponse>(body).map_err(|e| Error::Provider {
        provider: "claude".into(),
        message: format!("parse response: {e}"),
    })
}

pub(crate) fn wrap_api_error(provider: &str, status: u16, body: &str) -> Error {
    // Prefer the structured error message when the body carries one.
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());
    Error::Provider {
        provider: provider.to_string(),
        message: format!("{status} {detail}"),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn call(&self, mut req: AgentRequest) -> Result<AgentResponse> {
        self.validate()?;
        if req.model.is_empty() {
            req.model = self.model.clone();
        }
        if req.max_tokens == 0 {
            req.max_tokens = self.max_tokens;
        }
        let payload = serde_json::to_value(&req)?;

        tracing::debug!(
            model = %req.model,
            messages = req.messages.len(),
            tools = req.tools.len(),
            "anthropic request"
        );

        let attempts = async {
            let mut last_err = Error::Provider {
                provider: "claude".into(),
                message: "no attempts made".into(),
            };
            for attempt in 0..self.retry.max_attempts {
                let (status, result) = self.attempt(&payload).await;
                match result {
                    Ok(resp) => {
                        tracing::debug!(
                            id = %resp.id,
                            stop_reason = ?resp.stop_reason,
                            blocks = resp.content.len(),
                            "anthropic response"
                        );
                        return Ok(resp);
                    }
                    Err(e) => {
                        let retryable = match status {
                            // 2xx with a bad body is transient.
                            Some(code) if code < 400 => true,
                            other => should_retry(other),
                        };
                        tracing::warn!(
                            attempt = attempt + 1,
                            max = self.retry.max_attempts,
                            status = ?status,
                            error = %e,
                            "anthropic attempt failed"
                        );
                        last_err = e;
                        if !retryable || attempt + 1 == self.retry.max_attempts {
                            return Err(last_err);
                        }
                    }
                }
                tokio::time::sleep(self.retry.backoff(attempt)).await;
            }
            Err(last_err)
        };

        tokio::time::timeout(self.timeout, attempts)
            .await
            .map_err(|_| Error::Timeout(format!("anthropic call exceeded {:?}", self.timeout)))?
    }

    fn name(&self) -> &str {
        "claude"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_prefers_structured_message() {
        let err = wrap_api_error(
            "claude",
            529,
            r#"{"error": {"type": "overloaded_error", "message": "Overloaded"}}"#,
        );
        let msg = err.to_string();
        assert!(msg.contains("claude API error"));
        assert!(msg.contains("529"));
        assert!(msg.contains("Overloaded"));
    }

    #[test]
    fn api_error_falls_back_to_raw_body() {
        let err = wrap_api_error("claude", 500, "upstream broke");
        assert!(err.to_string().contains("upstream broke"));
    }

    #[test]
    fn empty_body_is_a_provider_error() {
        assert!(parse_response("").is_err());
        assert!(parse_response("   ").is_err());
    }
}
