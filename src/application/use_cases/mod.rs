pub mod agent_chat;
pub mod regenerate_embeddings;
pub mod search_catalog;

pub use agent_chat::AgentChatUseCase;
pub use regenerate_embeddings::RegenerateEmbeddingsUseCase;
pub use search_catalog::SearchCatalogUseCase;
