pub mod orchestrator;

pub use orchestrator::{AgentError, AgentMode, AgentOrchestrator, AgentReply};
