use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::entities::{ChatMessage, ToolCall};

#[derive(Debug)]
pub enum LanguageModelError {
    NetworkError(String),
    ApiError(String),
    MalformedResponse(String),
    NotConfigured(String),
}

impl std::fmt::Display for LanguageModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LanguageModelError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            LanguageModelError::ApiError(msg) => write!(f, "API error: {}", msg),
            LanguageModelError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
            LanguageModelError::NotConfigured(msg) => write!(f, "Not configured: {}", msg),
        }
    }
}

impl std::error::Error for LanguageModelError {}

/// Function-calling schema offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        params: &GenerateParams,
    ) -> Result<ModelResponse, LanguageModelError>;
}
