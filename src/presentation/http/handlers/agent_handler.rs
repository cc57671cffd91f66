use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use crate::application::use_cases::AgentChatUseCase;
use crate::application::use_cases::agent_chat::AgentChatError;
use crate::presentation::http::dto::{ApiResponse, ChatRequestDto, ChatResponseDto};

pub struct AgentHandler {
    chat_use_case: Arc<AgentChatUseCase>,
}

impl AgentHandler {
    pub fn new(chat_use_case: Arc<AgentChatUseCase>) -> Self {
        Self { chat_use_case }
    }

    pub async fn chat(
        State(handler): State<Arc<AgentHandler>>,
        Json(request): Json<ChatRequestDto>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let messages = match request.into_messages() {
            Ok(messages) => messages,
            Err(e) => {
                return Ok((
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error("INVALID_MESSAGE".to_string(), e, None)),
                ));
            }
        };

        match handler.chat_use_case.execute(messages).await {
            Ok(reply) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(ChatResponseDto::from(reply))),
            )),
            Err(AgentChatError::ValidationError(msg)) => Ok((
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error("INVALID_CONVERSATION".to_string(), msg, None)),
            )),
        }
    }
}
