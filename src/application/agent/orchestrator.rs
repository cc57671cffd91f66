use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

use crate::application::ports::agent_settings::AgentSettingsSource;
use crate::application::ports::language_model::{
    GenerateParams, LanguageModel, ModelResponse, ToolDefinition,
};
use crate::application::tools::registry::{ToolCommand, ToolRegistry};
use crate::application::tools::tool::ParsedInput;
use crate::domain::entities::{ChatMessage, Role};

pub const DEFAULT_MAX_ITERATIONS: usize = 3;

pub const CANNED_REPLY: &str = "Sorry, I can't look that up right now. Please try again in a few minutes.";

/// Rejections of the conversation itself. Collaborator failures never surface; they end in the canned reply.
#[derive(Debug)]
pub enum AgentError {
    EmptyConversation,
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::EmptyConversation => write!(f, "Conversation has no user message"),
        }
    }
}

impl std::error::Error for AgentError {}

#[derive(Debug)]
enum TurnFailure {
    SettingsUnavailable(String),
    ModelUnavailable(String),
}

impl std::fmt::Display for TurnFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnFailure::SettingsUnavailable(msg) => write!(f, "Agent settings unavailable: {}", msg),
            TurnFailure::ModelUnavailable(msg) => write!(f, "Language model unavailable: {}", msg),
        }
    }
}

/// `Live` drives the language model and falls back to a canned reply when it fails.
/// `Diagnostic` never calls the model: `/tool_name arguments` runs a tool directly and
/// any other message lists the registered tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    Live,
    Diagnostic,
}

impl AgentMode {
    pub fn from_string(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(AgentMode::Live),
            "diagnostic" => Ok(AgentMode::Diagnostic),
            other => Err(format!("Invalid agent mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    AwaitingModel,
    ToolsRequested,
    ExecutingTools,
    FinalAnswer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    Answered,
    /// Iteration cap reached; the content is a partial answer.
    Exhausted,
    Canned,
    /// Produced without the language model.
    Diagnostic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool_name: String,
    pub arguments: String,
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReply {
    pub content: String,
    pub outcome: TurnOutcome,
    pub invocations: Vec<ToolInvocation>,
    pub states: Vec<TurnState>,
}

impl AgentReply {
    fn canned() -> Self {
        Self {
            content: CANNED_REPLY.to_string(),
            outcome: TurnOutcome::Canned,
            invocations: Vec::new(),
            states: vec![TurnState::FinalAnswer],
        }
    }
}

struct Turn {
    messages: Vec<ChatMessage>,
    invocations: Vec<ToolInvocation>,
    states: Vec<TurnState>,
    last_text: Option<String>,
}

impl Turn {
    fn enter(&mut self, state: TurnState) {
        tracing::debug!("Turn state -> {:?}", state);
        self.states.push(state);
    }

    fn finish(mut self, content: String, outcome: TurnOutcome) -> AgentReply {
        self.enter(TurnState::FinalAnswer);
        AgentReply {
            content,
            outcome,
            invocations: self.invocations,
            states: self.states,
        }
    }

    /// Best text available once the iteration cap is hit.
    fn partial_answer(&self) -> String {
        if let Some(text) = &self.last_text {
            return text.clone();
        }
        if self.invocations.is_empty() {
            return "I'm not sure how to answer that. Could you rephrase the question?".to_string();
        }
        let mut names: Vec<&str> = self.invocations.iter().map(|i| i.tool_name.as_str()).collect();
        names.dedup();
        format!(
            "I looked this up using {} but could not put together a complete answer. Could you rephrase the question?",
            names.join(", ")
        )
    }
}

/// Drives one conversation turn: model, tools, model, until a final answer.
pub struct AgentOrchestrator {
    model: Arc<dyn LanguageModel>,
    settings: Arc<dyn AgentSettingsSource>,
    registry: Arc<ToolRegistry>,
    max_iterations: usize,
    mode: AgentMode,
}

impl AgentOrchestrator {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        settings: Arc<dyn AgentSettingsSource>,
        registry: Arc<ToolRegistry>,
        max_iterations: usize,
        mode: AgentMode,
    ) -> Self {
        Self {
            model,
            settings,
            registry,
            max_iterations,
            mode,
        }
    }

    /// Always produces a reply for a conversation that has a user message.
    pub async fn respond(&self, history: &[ChatMessage]) -> Result<AgentReply, AgentError> {
        let Some(request) = history.iter().rev().find(|m| m.is_from_user()) else {
            return Err(AgentError::EmptyConversation);
        };

        if self.mode == AgentMode::Diagnostic {
            return Ok(self.run_diagnostic(request.content.trim()).await);
        }

        match self.run(history).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                tracing::error!("Agent turn failed, sending canned reply: {}", e);
                Ok(AgentReply::canned())
            }
        }
    }

    async fn run_diagnostic(&self, request: &str) -> AgentReply {
        let mut turn = Turn {
            messages: Vec::new(),
            invocations: Vec::new(),
            states: Vec::new(),
            last_text: None,
        };

        let Some(command) = request.strip_prefix('/') else {
            let tools: Vec<String> = self
                .registry
                .definitions()
                .into_iter()
                .map(|d| format!("- {}: {}", d.name, d.description))
                .collect();
            let listing = format!(
                "Diagnostic mode: the language model is not called. Send /<tool> <arguments> to run a tool.\n{}",
                tools.join("\n")
            );
            return turn.finish(listing, TurnOutcome::Diagnostic);
        };

        let (name, arguments) = match command.trim().split_once(char::is_whitespace) {
            Some((name, arguments)) => (name, arguments.trim()),
            None => (command.trim(), ""),
        };
        let arguments = if arguments.is_empty() { "{}" } else { arguments };
        tracing::info!("Diagnostic call to {}", name);

        turn.enter(TurnState::ToolsRequested);
        turn.enter(TurnState::ExecutingTools);
        let outcome = self
            .registry
            .dispatch(ToolCommand::new(name, ParsedInput::parse(arguments)))
            .await;
        turn.invocations.push(ToolInvocation {
            tool_name: name.to_string(),
            arguments: arguments.to_string(),
            is_error: outcome.is_error,
        });
        turn.finish(outcome.content, TurnOutcome::Diagnostic)
    }

    async fn run(&self, history: &[ChatMessage]) -> Result<AgentReply, TurnFailure> {
        let settings = self
            .settings
            .current()
            .await
            .map_err(|e| TurnFailure::SettingsUnavailable(e.to_string()))?;

        let params = GenerateParams {
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };

        let mut messages = vec![ChatMessage::system(settings.system_prompt.clone())];
        // The system prompt is owned by the settings source; clients only supply the dialogue.
        messages.extend(
            history
                .iter()
                .filter(|m| matches!(m.role, Role::User | Role::Assistant))
                .map(|m| ChatMessage {
                    tool_calls: Vec::new(),
                    tool_call_id: None,
                    ..m.clone()
                }),
        );

        let mut turn = Turn {
            messages,
            invocations: Vec::new(),
            states: Vec::new(),
            last_text: None,
        };

        let tool_definitions = self.registry.definitions();
        let no_tools: Vec<ToolDefinition> = Vec::new();

        for round in 0..=self.max_iterations {
            // The round after the cap offers no tools so the model has to answer.
            let offered = if round < self.max_iterations {
                &tool_definitions
            } else {
                &no_tools
            };

            turn.enter(TurnState::AwaitingModel);
            let response = self
                .model
                .chat(&turn.messages, offered, &params)
                .await
                .map_err(|e| TurnFailure::ModelUnavailable(e.to_string()))?;

            let text = response
                .content
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string);

            if !response.wants_tools() {
                let content = text.unwrap_or_else(|| turn.partial_answer());
                turn.messages.push(ChatMessage::assistant(content.clone()));
                return Ok(turn.finish(content, TurnOutcome::Answered));
            }

            if text.is_some() {
                turn.last_text = text;
            }

            if round == self.max_iterations {
                tracing::warn!(
                    "Model still requested {} tool call(s) after {} rounds",
                    response.tool_calls.len(),
                    self.max_iterations
                );
                break;
            }

            turn.enter(TurnState::ToolsRequested);
            tracing::info!(
                "Tool round {}/{}: {} tool call(s)",
                round + 1,
                self.max_iterations,
                response.tool_calls.len()
            );

            turn.enter(TurnState::ExecutingTools);
            self.execute_tools(&mut turn, response).await;
        }

        let partial = turn.partial_answer();
        turn.messages.push(ChatMessage::assistant(partial.clone()));
        Ok(turn.finish(partial, TurnOutcome::Exhausted))
    }

    /// Runs the requested calls concurrently and appends results in request order.
    async fn execute_tools(&self, turn: &mut Turn, response: ModelResponse) {
        let ModelResponse {
            content,
            tool_calls,
        } = response;

        let outcomes = join_all(
            tool_calls
                .iter()
                .map(|call| self.registry.dispatch(ToolCommand::from_call(call))),
        )
        .await;

        turn.messages.push(ChatMessage::assistant_with_calls(
            content.unwrap_or_default(),
            tool_calls.clone(),
        ));

        for (call, outcome) in tool_calls.iter().zip(outcomes) {
            turn.invocations.push(ToolInvocation {
                tool_name: call.name.clone(),
                arguments: call.arguments.clone(),
                is_error: outcome.is_error,
            });
            turn.messages.push(ChatMessage::tool(outcome.content, &call.id));
        }
    }
}
