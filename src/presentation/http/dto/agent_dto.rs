use serde::{Deserialize, Serialize};

use crate::application::agent::orchestrator::{AgentReply, ToolInvocation, TurnOutcome};
use crate::domain::entities::ChatMessage;

#[derive(Debug, Deserialize)]
pub struct ChatRequestDto {
    pub messages: Vec<ChatMessageDto>,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessageDto {
    pub role: String,
    pub content: String,
}

impl ChatRequestDto {
    /// Only user, assistant and system roles are accepted from clients.
    pub fn into_messages(self) -> Result<Vec<ChatMessage>, String> {
        self.messages
            .into_iter()
            .map(|message| match message.role.trim().to_lowercase().as_str() {
                "user" => Ok(ChatMessage::user(message.content)),
                "assistant" => Ok(ChatMessage::assistant(message.content)),
                "system" => Ok(ChatMessage::system(message.content)),
                other => Err(format!("Unsupported message role: {}", other)),
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponseDto {
    pub role: String,
    pub content: String,
    pub outcome: TurnOutcome,
    pub tool_calls: Vec<ToolInvocation>,
}

impl From<AgentReply> for ChatResponseDto {
    fn from(reply: AgentReply) -> Self {
        Self {
            role: "assistant".to_string(),
            content: reply.content,
            outcome: reply.outcome,
            tool_calls: reply.invocations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Role;

    #[test]
    fn test_roles_are_mapped() {
        let dto: ChatRequestDto = serde_json::from_str(
            r#"{"messages":[{"role":"system","content":"x"},{"role":"User","content":"hi"}]}"#,
        )
        .unwrap();
        let messages = dto.into_messages().unwrap();

        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn test_tool_role_is_rejected() {
        let dto: ChatRequestDto =
            serde_json::from_str(r#"{"messages":[{"role":"tool","content":"{}"}]}"#).unwrap();
        assert!(dto.into_messages().is_err());
    }
}
