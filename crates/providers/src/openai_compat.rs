//! OpenAI-compatible adapter.
//!
//! Works with OpenAI, OpenRouter, DeepSeek, vLLM, and any other endpoint
//! following the chat-completions contract. Performs a bidirectional
//! translation between the internal (Anthropic-shaped) conversation model
//! and the OpenAI wire format:
//!
//! - assistant tool-use blocks become `tool_calls[]` with stringified
//!   arguments, and the text blocks collapse into the message body;
//! - user messages carrying tool-result blocks are split into one synthetic
//!   `tool`-role message per result, keyed by `tool_call_id`;
//! - `finish_reason` maps stop → end_turn, tool_calls → tool_use,
//!   length → max_tokens.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use fh_domain::config::LlmConfig;
use fh_domain::message::{
    AgentRequest, AgentResponse, ContentBlock, Message, Role, StopReason, Usage,
};
use fh_domain::{Error, Result};

use crate::anthropic::wrap_api_error;
use crate::retry::{should_retry, RetryPolicy};
use crate::traits::LlmProvider;

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl OpenAiProvider {
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
            return Err(Error::Config("OpenAI base URL is empty".into()));
        }
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("OpenAI API key is empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Config("OpenAI model is empty".into()));
        }
        Ok(())
    }

    /// Known corner: a base URL that already ends with the API path is used
    /// as-is instead of double-appending.
    fn endpoint(&self) -> String {
        if self.base_url.ends_with(CHAT_COMPLETIONS_PATH) {
            self.base_url.clone()
        } else {
            format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH)
        }
    }

    async fn attempt(&self, payload: &Value) -> (Option<u16>, Result<AgentResponse>) {
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
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
            return (Some(status), Err(wrap_api_error("openai", status, &body)));
        }
        (Some(status), parse_chat_response(&body))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outbound translation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub(crate) fn build_chat_body(req: &AgentRequest) -> Value {
    let mut messages: Vec<Value> = Vec::with_capacity(req.messages.len() + 1);

    if let Some(system) = &req.system {
        if !system.is_empty() {
            messages.push(json!({"role": "system", "content": system}));
        }
    }
    for msg in &req.messages {
        convert_message(msg, &mut messages);
    }

    let mut body = json!({
        "model": req.model,
        "messages": messages,
    });
    if req.max_tokens > 0 {
        body["max_tokens"] = json!(req.max_tokens);
    }
    if let Some(temp) = req.temperature {
        body["temperature"] = json!(temp);
    }
    if !req.tools.is_empty() {
        let tools: Vec<Value> = req
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.input_schema,
                    }
                })
            })
            .collect();
        body["tools"] = Value::Array(tools);
        body["tool_choice"] = json!("auto");
    }
    body
}

fn convert_message(msg: &Message, out: &mut Vec<Value>) {
    match msg.role {
        Role::User => {
            let mut text = String::new();
            // Tool results become individual `tool` role messages first,
            // preserving their order relative to each other.
            for block in &msg.content {
                match block {
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        ..
                    } => {
                        out.push(json!({
                            "role": "tool",
                            "tool_call_id": tool_use_id,
                            "content": content,
                        }));
                    }
                    ContentBlock::Text { text: t } => text.push_str(t),
                    ContentBlock::ToolUse { .. } => {}
                }
            }
            if !text.is_empty() {
                out.push(json!({"role": "user", "content": text}));
            }
        }
        Role::Assistant => {
            let mut text = String::new();
            let mut tool_calls: Vec<Value> = Vec::new();
            for block in &msg.content {
                match block {
                    ContentBlock::Text { text: t } => text.push_str(t),
                    ContentBlock::ToolUse { id, name, input } => {
                        tool_calls.push(json!({
                            "id": id,
                            "type": "function",
                            "function": {
                                "name": name,
                                "arguments": input.to_string(),
                            }
                        }));
                    }
                    ContentBlock::ToolResult { .. } => {}
                }
            }
            let mut assistant = json!({"role": "assistant"});
            assistant["content"] = if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            };
            if !tool_calls.is_empty() {
                assistant["tool_calls"] = Value::Array(tool_calls);
            }
            out.push(assistant);
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound translation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub(crate) fn parse_chat_response(body: &str) -> Result<AgentResponse> {
    if body.trim().is_empty() {
        return Err(Error::Provider {
            provider: "openai".into(),
            message: "empty response body".into(),
        });
    }
    let v: Value = serde_json::from_str(body).map_err(|e| Error::Provider {
        provider: "openai".into(),
        message: format!("parse response: {e}"),
    })?;

    let choice = v
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| Error::Provider {
            provider: "openai".into(),
            message: "response has no choices".into(),
        })?;
    let message = choice.get("message").cloned().unwrap_or(Value::Null);

    let mut content: Vec<ContentBlock> = Vec::new();
    if let Some(text) = message.get("content").and_then(|c| c.as_str()) {
        if !text.is_empty() {
            content.push(ContentBlock::Text {
                text: text.to_string(),
            });
        }
    }
    if let Some(tool_calls) = message.get("tool_calls").and_then(|t| t.as_array()) {
        for call in tool_calls {
            let id = call.get("id").and_then(|i| i.as_str()).unwrap_or("");
            let function = call.get("function").cloned().unwrap_or(Value::Null);
            let name = function.get("name").and_then(|n| n.as_str()).unwrap_or("");
            let arguments = function
                .get("arguments")
                .and_then(|a| a.as_str())
                .unwrap_or("");
            let input: Value =
                serde_json::from_str(arguments).unwrap_or(Value::Object(Default::default()));
            content.push(ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            });
        }
    }

    let stop_reason = match choice.get("finish_reason").and_then(|f| f.as_str()) {
        Some("tool_calls") => StopReason::ToolUse,
        Some("length") => StopReason::MaxTokens,
        _ => StopReason::EndTurn,
    };

    let usage = v
        .get("usage")
        .map(|u| Usage {
            input_tokens: u.get("prompt_tokens").and_then(|n| n.as_u64()).unwrap_or(0),
            output_tokens: u
                .get("completion_tokens")
                .and_then(|n| n.as_u64())
                .unwrap_or(0),
        })
        .unwrap_or_default();

    Ok(AgentResponse {
        id: v
            .get("id")
            .and_then(|i| i.as_str())
            .unwrap_or_default()
            .to_string(),
        content,
        stop_reason,
        usage,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn call(&self, mut req: AgentRequest) -> Result<AgentResponse> {
        self.validate()?;
        if req.model.is_empty() {
            req.model = self.model.clone();
        }
        if req.max_tokens == 0 {
            req.max_tokens = self.max_tokens;
        }
        let payload = build_chat_body(&req);

        tracing::debug!(
            model = %req.model,
            messages = req.messages.len(),
            tools = req.tools.len(),
            "openai request"
        );

        let attempts = async {
            let mut last_err = Error::Provider {
                provider: "openai".into(),
                message: "no attempts made".into(),
            };
            for attempt in 0..self.retry.max_attempts {
                let (status, result) = self.attempt(&payload).await;
                match result {
                    Ok(resp) => return Ok(resp),
                    Err(e) => {
                        let retryable = match status {
                            Some(code) if code < 400 => true,
                            other => should_retry(other),
                        };
                        tracing::warn!(
                            attempt = attempt + 1,
                            max = self.retry.max_attempts,
                            status = ?status,
                            error = %e,
                            "openai attempt failed"
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
            .map_err(|_| Error::Timeout(format!("openai call exceeded {:?}", self.timeout)))?
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fh_domain::message::ToolDefinition;

    fn request_with_tool_round_trip() -> AgentRequest {
        let mut req = AgentRequest::new(vec![
            Message::user("Hi"),
            Message {
                role: Role::Assistant,
                content: vec![ContentBlock::ToolUse {
                    id: "call_1".into(),
                    name: "read_file".into(),
                    input: json!({"path": "a"}),
                }],
            },
            Message {
                role: Role::User,
                content: vec![ContentBlock::ToolResult {
                    tool_use_id: "call_1".into(),
                    content: "X".into(),
                    is_error: false,
                }],
            },
        ]);
        req.model = "gpt-4o".into();
        req.tools = vec![ToolDefinition {
            name: "read_file".into(),
            description: "read".into(),
            input_schema: json!({"type": "object"}),
        }];
        req
    }

    #[test]
    fn outbound_splits_tool_results_into_tool_role_messages() {
        let body = build_chat_body(&request_with_tool_round_trip());
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["tool_calls"][0]["id"], "call_1");
        assert_eq!(
            messages[1]["tool_calls"][0]["function"]["name"],
            "read_file"
        );
        assert_eq!(
            messages[1]["tool_calls"][0]["function"]["arguments"],
            "{\"path\":\"a\"}"
        );
        assert_eq!(messages[2]["role"], "tool");
        assert_eq!(messages[2]["tool_call_id"], "call_1");
        assert_eq!(messages[2]["content"], "X");
    }

    #[test]
    fn outbound_wraps_tools_as_functions_with_auto_choice() {
        let body = build_chat_body(&request_with_tool_round_trip());
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "read_file");
        assert_eq!(body["tool_choice"], "auto");
    }

    #[test]
    fn outbound_system_prompt_becomes_first_message() {
        let mut req = AgentRequest::new(vec![Message::user("task")]);
        req.model = "gpt-4o".into();
        req.system = Some("be brief".into());
        let body = build_chat_body(&req);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be brief");
    }

    #[test]
    fn inbound_tool_calls_become_tool_use_blocks() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "read_file", "arguments": "{\"path\": \"a\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 7}
        }"#;
        let resp = parse_chat_response(body).unwrap();
        assert_eq!(resp.stop_reason, StopReason::ToolUse);
        assert_eq!(resp.usage.input_tokens, 5);
        match &resp.content[0] {
            ContentBlock::ToolUse { id, name, input } => {
                assert_eq!(id, "call_1");
                assert_eq!(name, "read_file");
                assert_eq!(input["path"], "a");
            }
            other => panic!("expected tool_use, got {other:?}"),
        }
    }

    #[test]
    fn inbound_finish_reasons_map() {
        for (reason, expected) in [
            ("stop", StopReason::EndTurn),
            ("tool_calls", StopReason::ToolUse),
            ("length", StopReason::MaxTokens),
            ("weird", StopReason::EndTurn),
        ] {
            let body = format!(
                r#"{{"choices": [{{"message": {{"content": "x"}}, "finish_reason": "{reason}"}}]}}"#
            );
            let resp = parse_chat_response(&body).unwrap();
            assert_eq!(resp.stop_reason, expected, "finish_reason {reason}");
        }
    }

    #[test]
    fn base_url_with_full_path_is_not_doubled() {
        let mut cfg = LlmConfig::default();
        cfg.api_key = "k".into();
        cfg.model = "gpt-4o".into();
        cfg.base_url = "https://host/v1/chat/completions".into();
        let provider = OpenAiProvider::from_config(&cfg).unwrap();
        assert_eq!(provider.endpoint(), "https://host/v1/chat/completions");

        cfg.base_url = "https://host".into();
        let provider = OpenAiProvider::from_config(&cfg).unwrap();
        assert_eq!(provider.endpoint(), "https://host/v1/chat/completions");
    }

    #[test]
    fn inbound_no_choices_is_an_error() {
        assert!(parse_chat_response(r#"{"choices": []}"#).is_err());
    }

    #[test]
    fn malformed_arguments_fall_back_to_empty_input() {
        let body = r#"{
            "choices": [{
                "message": {
                    "tool_calls": [{"id": "c1", "function": {"name": "f", "arguments": "not json"}}]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;
        let resp = parse_chat_response(body).unwrap();
        match &resp.content[0] {
            ContentBlock::ToolUse { input, .. } => assert!(input.as_object().unwrap().is_empty()),
            other => panic!("expected tool_use, got {other:?}"),
        }
    }
}
