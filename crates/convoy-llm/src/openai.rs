//! OpenAI Chat Completions client.
//!
//! Also serves any OpenAI-compatible endpoint through a base URL override
//! (local runtimes, proxies, alternative vendors).

use async_trait::async_trait;
use serde_json::{json, Value};

use convoy_types::{AiModel, AiProviderConfig, ModelPrice};

use crate::client::AiClient;
use crate::error::{LlmError, Result};
use crate::types::{
    ChatRole, CompletionRequest, CompletionResponse, StopReason, ToolCall, Usage,
};

/// Default OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Built-in model list used when configuration supplies none.
pub fn default_models() -> Vec<AiModel> {
    vec![
        AiModel::new("gpt-4.1", 1_000_000).with_alias("gpt4").with_price(ModelPrice {
            input_mtoken: Some(2.0),
            output_mtoken: Some(8.0),
            cache_write_mtoken: None,
            cache_read_mtoken: Some(0.5),
        }),
        AiModel::new("gpt-4.1-mini", 1_000_000)
            .with_alias("mini")
            .with_price(ModelPrice {
                input_mtoken: Some(0.4),
                output_mtoken: Some(1.6),
                cache_write_mtoken: None,
                cache_read_mtoken: Some(0.1),
            }),
    ]
}

/// Client for OpenAI-compatible chat completion endpoints.
pub struct OpenAiClient {
    name: String,
    api_key: String,
    base_url: String,
    models: Vec<AiModel>,
    http: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client from a resolved provider config and API key.
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
        let mut messages: Vec<Value> = Vec::new();
        if let Some(ref system) = request.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        for m in &request.messages {
            match m.role {
                ChatRole::User => messages.push(json!({"role": "user", "content": m.content})),
                ChatRole::Assistant => {
                    let mut msg = json!({"role": "assistant", "content": m.content});
                    if !m.tool_calls.is_empty() {
                        let calls: Vec<Value> = m
                            .tool_calls
                            .iter()
                            .map(|c| {
                                json!({
                                    "id": c.id,
                                    "type": "function",
                                    "function": {
                                        "name": c.name,
                                        "arguments": c.arguments.to_string(),
                                    },
                                })
                            })
                            .collect();
                        msg["tool_calls"] = json!(calls);
                    }
                    messages.push(msg);
                }
                ChatRole::Tool => messages.push(json!({
                    "role": "tool",
                    "tool_call_id": m.tool_call_id,
                    "content": m.content,
                })),
            }
        }

        let mut payload = json!({
            "model": request.model,
            "messages": messages,
            "max_tokens": request.max_tokens,
        });
        if let Some(temperature) = request.temperature {
            payload["temperature"] = json!(temperature);
        }
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        },
                    })
                })
                .collect();
            payload["tools"] = json!(tools);
        }

        payload
    }

    fn parse_response(&self, body: Value) -> Result<CompletionResponse> {
        let message = body
            .pointer("/choices/0/message")
            .ok_or_else(|| LlmError::UnexpectedResponse {
                provider: self.name.clone(),
                message: "missing choices[0].message".to_string(),
            })?;

        let text = message
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let mut tool_calls = Vec::new();
        if let Some(calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
            for call in calls {
                let arguments = call
                    .pointer("/function/arguments")
                    .and_then(|v| v.as_str())
                    .and_then(|s| serde_json::from_str(s).ok())
                    .unwrap_or(Value::Null);
                tool_calls.push(ToolCall {
                    id: call
                        .get("id")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    name: call
                        .pointer("/function/name")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    arguments,
                });
            }
        }

        let stop_reason = match body
            .pointer("/choices/0/finish_reason")
            .and_then(|v| v.as_str())
        {
            Some("stop") => StopReason::EndTurn,
            Some("tool_calls") => StopReason::ToolUse,
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::Other,
        };

        let usage = Usage {
            input_tokens: body
                .pointer("/usage/prompt_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32,
            output_tokens: body
                .pointer("/usage/completion_tokens")
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
impl AiClient for OpenAiClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> &[AiModel] {
        &self.models
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = self.build_payload(&request);

        tracing::debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            "sending completion request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
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
    use crate::types::ChatMessage;

    fn test_client() -> OpenAiClient {
        OpenAiClient::new(&AiProviderConfig::new("openai"), "sk-test")
    }

    #[test]
    fn test_base_url_override() {
        let config = AiProviderConfig::new("localai").with_url("http://localhost:8080/v1");
        let client = OpenAiClient::new(&config, "unused");
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_system_prompt_becomes_first_message() {
        let client = test_client();
        let request = CompletionRequest::new("gpt-4.1", vec![ChatMessage::user("hi")], 100)
            .with_system("be terse");
        let payload = client.build_payload(&request);
        assert_eq!(payload["messages"][0]["role"], json!("system"));
        assert_eq!(payload["messages"][1]["role"], json!("user"));
    }

    #[test]
    fn test_tool_arguments_serialized_as_string() {
        let client = test_client();
        let request = CompletionRequest::new(
            "gpt-4.1",
            vec![ChatMessage::assistant_with_tools(
                "",
                vec![ToolCall {
                    id: "c1".into(),
                    name: "f".into(),
                    arguments: json!({"x": 1}),
                }],
            )],
            100,
        );
        let payload = client.build_payload(&request);
        let args = payload["messages"][0]["tool_calls"][0]["function"]["arguments"]
            .as_str()
            .unwrap();
        assert_eq!(args, r#"{"x":1}"#);
    }

    #[test]
    fn test_parse_response_with_tool_calls() {
        let client = test_client();
        let body = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "read_file", "arguments": "{\"path\":\"/x\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 7}
        });
        let response = client.parse_response(body).unwrap();
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.tool_calls[0].arguments, json!({"path": "/x"}));
        assert_eq!(response.usage.output_tokens, 7);
    }

    #[test]
    fn test_parse_response_missing_choices_errors() {
        let client = test_client();
        assert!(client.parse_response(json!({})).is_err());
    }
}
