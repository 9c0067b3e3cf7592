//! Anthropic Messages API client.

use async_trait::async_trait;
use serde_json::{json, Value};

use convoy_types::{AiModel, AiProviderConfig, ModelPrice};

use crate::client::AiClient;
use crate::error::{LlmError, Result};
use crate::types::{
    ChatRole, CompletionRequest, CompletionResponse, StopReason, ToolCall, Usage,
};

/// Default Anthropic API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value.
const API_VERSION: &str = "2023-06-01";

/// Built-in model list used when configuration supplies none (e.g. a
/// provider auto-detected from `ANTHROPIC_API_KEY`).
pub fn default_models() -> Vec<AiModel> {
    vec![
        AiModel::new("claude-sonnet-4-20250514", 200_000)
            .with_alias("sonnet")
            .with_price(ModelPrice {
                input_mtoken: Some(3.0),
                output_mtoken: Some(15.0),
                cache_write_mtoken: Some(3.75),
                cache_read_mtoken: Some(0.3),
            }),
        AiModel::new("claude-opus-4-20250514", 200_000)
            .with_alias("opus")
            .with_price(ModelPrice {
                input_mtoken: Some(15.0),
                output_mtoken: Some(75.0),
                cache_write_mtoken: Some(18.75),
                cache_read_mtoken: Some(1.5),
            }),
        AiModel::new("claude-3-5-haiku-20241022", 200_000)
            .with_alias("haiku")
            .with_price(ModelPrice {
                input_mtoken: Some(0.8),
                output_mtoken: Some(4.0),
                cache_write_mtoken: Some(1.0),
                cache_read_mtoken: Some(0.08),
            }),
    ]
}

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    name: String,
    api_key: String,
    base_url: String,
    models: Vec<AiModel>,
    http: reqwest::Client,
}

impl AnthropicClient {
    /// Create a client from a resolved provider config and API key.
    ///
    /// The config's model list is used as-is when non-empty, otherwise the
    /// built-in defaults apply.
    pub fn new(config: &AiProviderConfig, api_key: impl Into<String>) -> Self {
        let models = if config.models.is_empty() {
            default_models()
        } else {
            config.models.clone()
        };

        Self {
            name: config.name.clone(),
            api_key: api_key.into(),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            models,
            http: reqwest::Client::new(),
        }
    }

    fn build_payload(&self, request: &CompletionRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| match m.role {
                ChatRole::User => json!({"role": "user", "content": m.content}),
                ChatRole::Assistant => {
                    if m.tool_calls.is_empty() {
                        json!({"role": "assistant", "content": m.content})
                    } else {
                        let mut blocks: Vec<Value> = Vec::new();
                        if !m.content.is_empty() {
                            blocks.push(json!({"type": "text", "text": m.content}));
                        }
                        for call in &m.tool_calls {
                            blocks.push(json!({
                                "type": "tool_use",
                                "id": call.id,
                                "name": call.name,
                                "input": call.arguments,
                            }));
                        }
                        json!({"role": "assistant", "content": blocks})
                    }
                }
                // Tool results travel as user-role content blocks.
                ChatRole::Tool => json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": m.tool_call_id,
                        "content": m.content,
                    }],
                }),
            })
            .collect();

        let mut payload = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "messages": messages,
        });

        if let Some(ref system) = request.system {
            payload["system"] = json!(system);
        }
        if let Some(temperature) = request.temperature {
            payload["temperature"] = json!(temperature);
        }
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameters,
                    })
                })
                .collect();
            payload["tools"] = json!(tools);
        }

        payload
    }

    fn parse_response(&self, body: Value) -> Result<CompletionResponse> {
        let content = body
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| LlmError::UnexpectedResponse {
                provider: self.name.clone(),
                message: "missing content array".to_string(),
            })?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in content {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("text") => {
                    if let Some(t) = block.get("text").and_then(|t| t.as_str()) {
                        text.push_str(t);
                    }
                }
                Some("tool_use") => {
                    tool_calls.push(ToolCall {
                        id: block
                            .get("id")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        name: block
                            .get("name")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        arguments: block.get("input").cloned().unwrap_or(Value::Null),
                    });
                }
                _ => {}
            }
        }

        let stop_reason = match body.get("stop_reason").and_then(|v| v.as_str()) {
            Some("end_turn") => StopReason::EndTurn,
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            _ => StopReason::Other,
        };

        let usage = Usage {
            input_tokens: body
                .pointer("/usage/input_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32,
            output_tokens: body
                .pointer("/usage/output_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32,
        };

        Ok(CompletionResponse {
            text,
            tool_calls,
            stop_reason,
            usage,
        })
    }
}

#[async_trait]
impl AiClient for AnthropicClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> &[AiModel] {
        &self.models
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/v1/messages", self.base_url);
        let payload = self.build_payload(&request);

        tracing::debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending completion request"
        );

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: self.name.clone(),
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let body: Value = response.json().await?;
        self.parse_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatMessage, ToolDefinition};

    fn test_client() -> AnthropicClient {
        AnthropicClient::new(&AiProviderConfig::new("anthropic"), "sk-test")
    }

    #[test]
    fn test_default_models_have_aliases() {
        let models = default_models();
        assert!(models.iter().any(|m| m.matches("sonnet")));
        assert!(models.iter().any(|m| m.matches("haiku")));
    }

    #[test]
    fn test_config_models_override_defaults() {
        let config = AiProviderConfig::new("anthropic").with_model(AiModel::new("custom", 100));
        let client = AnthropicClient::new(&config, "k");
        assert_eq!(client.models().len(), 1);
        assert!(client.supports_model("custom"));
        assert!(!client.supports_model("sonnet"));
    }

    #[test]
    fn test_payload_with_tools_and_system() {
        let client = test_client();
        let request = CompletionRequest::new(
            "claude-sonnet-4-20250514",
            vec![ChatMessage::user("hi")],
            1024,
        )
        .with_system("be terse")
        .with_tools(vec![ToolDefinition {
            name: "read_file".into(),
            description: "Read a file".into(),
            parameters: json!({"type": "object"}),
        }]);

        let payload = client.build_payload(&request);
        assert_eq!(payload["system"], json!("be terse"));
        assert_eq!(payload["tools"][0]["name"], json!("read_file"));
        assert_eq!(payload["tools"][0]["input_schema"]["type"], json!("object"));
    }

    #[test]
    fn test_payload_tool_result_becomes_user_block() {
        let client = test_client();
        let request = CompletionRequest::new(
            "m",
            vec![ChatMessage::tool_result("call_1", "42 files")],
            100,
        );
        let payload = client.build_payload(&request);
        assert_eq!(payload["messages"][0]["role"], json!("user"));
        assert_eq!(
            payload["messages"][0]["content"][0]["tool_use_id"],
            json!("call_1")
        );
    }

    #[test]
    fn test_parse_response_with_tool_use() {
        let client = test_client();
        let body = json!({
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "toolu_1", "name": "read_file",
                 "input": {"path": "/tmp/x"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 20}
        });
        let response = client.parse_response(body).unwrap();
        assert_eq!(response.text, "Let me check.");
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "read_file");
        assert_eq!(response.usage.input_tokens, 10);
    }

    #[test]
    fn test_parse_response_missing_content_errors() {
        let client = test_client();
        let err = client.parse_response(json!({"oops": true})).unwrap_err();
        assert!(matches!(err, LlmError::UnexpectedResponse { .. }));
    }
}
