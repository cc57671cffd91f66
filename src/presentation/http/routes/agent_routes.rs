use axum::{Router, routing::post};
use std::sync::Arc;

use crate::presentation::http::handlers::AgentHandler;

pub fn agent_routes(agent_handler: Arc<AgentHandler>) -> Router {
    Router::new()
        .route("/agent/chat", post(AgentHandler::chat))
        .with_state(agent_handler)
}
