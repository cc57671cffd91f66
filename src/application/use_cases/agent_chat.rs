use std::sync::Arc;

use crate::application::agent::orchestrator::{AgentError, AgentOrchestrator, AgentReply};
use crate::domain::entities::ChatMessage;

const MAX_HISTORY: usize = 50;

#[derive(Debug)]
pub enum AgentChatError {
    ValidationError(String),
}

impl std::fmt::Display for AgentChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentChatError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for AgentChatError {}

impl From<AgentError> for AgentChatError {
    fn from(error: AgentError) -> Self {
        AgentChatError::ValidationError(error.to_string())
    }
}

pub struct AgentChatUseCase {
    orchestrator: Arc<AgentOrchestrator>,
}

impl AgentChatUseCase {
    pub fn new(orchestrator: Arc<AgentOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn execute(&self, messages: Vec<ChatMessage>) -> Result<AgentReply, AgentChatError> {
        if messages.is_empty() {
            return Err(AgentChatError::ValidationError(
                "messages cannot be empty".to_string(),
            ));
        }

        // Older context is dropped rather than rejected.
        let start = messages.len().saturating_sub(MAX_HISTORY);
        let history = &messages[start..];

        let reply = self.orchestrator.respond(history).await?;
        tracing::info!(
            "Agent turn finished: {:?} after {} tool call(s)",
            reply.outcome,
            reply.invocations.len()
        );
        Ok(reply)
    }
}
