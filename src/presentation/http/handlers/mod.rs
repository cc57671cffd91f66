pub mod agent_handler;
pub mod embedding_handler;
pub mod health_handler;
pub mod retrieval_handler;

pub use agent_handler::AgentHandler;
pub use embedding_handler::EmbeddingHandler;
pub use health_handler::HealthHandler;
pub use retrieval_handler::RetrievalHandler;
