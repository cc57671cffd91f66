use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum AgentSettingsError {
    Unavailable(String),
    Invalid(String),
}

impl std::fmt::Display for AgentSettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentSettingsError::Unavailable(msg) => write!(f, "Agent settings unavailable: {}", msg),
            AgentSettingsError::Invalid(msg) => write!(f, "Agent settings invalid: {}", msg),
        }
    }
}

impl std::error::Error for AgentSettingsError {}

/// System prompt and model parameters, owned outside this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSettings {
    pub system_prompt: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    1024
}

#[async_trait]
pub trait AgentSettingsSource: Send + Sync {
    /// Latest settings; implementations may reload between calls.
    async fn current(&self) -> Result<AgentSettings, AgentSettingsError>;
}
