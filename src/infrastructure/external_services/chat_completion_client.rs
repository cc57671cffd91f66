use async_trait::async_trait;
use reqwest::{Client, Error as ReqwestError};
use serde_json::{Value, json};
use std::time::Duration;

use crate::application::ports::language_model::{
    GenerateParams, LanguageModel, LanguageModelError, ModelResponse, ToolDefinition,
};
use crate::domain::entities::{ChatMessage, Role, ToolCall};

#[derive(Debug, Clone)]
pub struct ChatCompletionConfig {
    /// Base URL including the version segment, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Language model behind an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionClient {
    client: Client,
    config: ChatCompletionConfig,
}

impl ChatCompletionClient {
    pub fn new(config: ChatCompletionConfig) -> Result<Self, ReqwestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn request_body(
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        params: &GenerateParams,
    ) -> Value {
        let mut body = json!({
            "model": params.model,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "messages": messages.iter().map(wire_message).collect::<Vec<_>>(),
        });

        if !tools.is_empty() {
            let tool_defs: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tool_defs);
        }

        body
    }
}

fn wire_message(message: &ChatMessage) -> Value {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    let mut value = json!({ "role": role, "content": message.content });

    if let Some(call_id) = &message.tool_call_id {
        value["tool_call_id"] = json!(call_id);
    }
    if !message.tool_calls.is_empty() {
        value["tool_calls"] = Value::Array(
            message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": { "name": call.name, "arguments": call.arguments }
                    })
                })
                .collect(),
        );
    }
    value
}

fn parse_response(body: &Value) -> Result<ModelResponse, LanguageModelError> {
    let message = body
        .pointer("/choices/0/message")
        .ok_or_else(|| LanguageModelError::MalformedResponse("no choices in response".to_string()))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .map(str::to_string);

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .enumerate()
                .filter_map(|(position, call)| {
                    let function = call.get("function")?;
                    let name = function.get("name")?.as_str()?.to_string();
                    let arguments = match function.get("arguments") {
                        Some(Value::String(raw)) => raw.clone(),
                        Some(other) => other.to_string(),
                        None => "{}".to_string(),
                    };
                    let id = call
                        .get("id")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("call_{}", position));
                    Some(ToolCall {
                        id,
                        name,
                        arguments,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ModelResponse {
        content,
        tool_calls,
    })
}

#[async_trait]
impl LanguageModel for ChatCompletionClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        params: &GenerateParams,
    ) -> Result<ModelResponse, LanguageModelError> {
        if self.config.base_url.trim().is_empty() {
            return Err(LanguageModelError::NotConfigured(
                "LLM_BASE_URL is not set".to_string(),
            ));
        }

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = Self::request_body(messages, tools, params);

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LanguageModelError::NetworkError(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LanguageModelError::ApiError(format!(
                "{}: {}",
                status,
                text.chars().take(300).collect::<String>()
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| LanguageModelError::MalformedResponse(e.to_string()))?;

        let parsed = parse_response(&json)?;
        tracing::debug!(
            "Model replied with {} tool call(s)",
            parsed.tool_calls.len()
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GenerateParams {
        GenerateParams {
            model: "gpt-test".to_string(),
            temperature: 0.2,
            max_tokens: 512,
        }
    }

    #[test]
    fn test_request_body_uses_function_tools() {
        let tools = vec![ToolDefinition {
            name: "search_products".to_string(),
            description: "Search products".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let messages = vec![
            ChatMessage::system("Be brief."),
            ChatMessage::assistant_with_calls(
                "",
                vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "search_products".to_string(),
                    arguments: r#"{"search":"wine"}"#.to_string(),
                }],
            ),
            ChatMessage::tool(r#"{"total":0}"#, "call_1"),
        ];

        let body = ChatCompletionClient::request_body(&messages, &tools, &params());

        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "search_products");
        assert_eq!(body["messages"][1]["tool_calls"][0]["function"]["arguments"], r#"{"search":"wine"}"#);
        assert_eq!(body["messages"][2]["role"], "tool");
        assert_eq!(body["messages"][2]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_no_tools_key_without_tools() {
        let body = ChatCompletionClient::request_body(&[ChatMessage::user("hi")], &[], &params());
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_parse_tool_calls() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_a", "type": "function",
                         "function": {"name": "search_faqs", "arguments": "{\"search\":\"returns\"}"}},
                        {"type": "function",
                         "function": {"name": "search_products", "arguments": {"maxPrice": 20}}}
                    ]
                }
            }]
        });

        let response = parse_response(&body).unwrap();
        assert!(response.content.is_none());
        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.tool_calls[0].id, "call_a");
        assert_eq!(response.tool_calls[1].id, "call_1");
        assert_eq!(response.tool_calls[1].arguments, r#"{"maxPrice":20}"#);
    }

    #[test]
    fn test_parse_rejects_missing_choices() {
        assert!(matches!(
            parse_response(&json!({"error": "nope"})),
            Err(LanguageModelError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_base_url_is_not_configured() {
        let client = ChatCompletionClient::new(ChatCompletionConfig {
            base_url: String::new(),
            api_key: None,
            timeout_secs: 1,
        })
        .unwrap();

        let result = client.chat(&[ChatMessage::user("hi")], &[], &params()).await;
        assert!(matches!(result, Err(LanguageModelError::NotConfigured(_))));
    }
}
