pub mod agent_settings;
pub mod embedding_provider;
pub mod language_model;

pub use agent_settings::AgentSettingsSource;
pub use embedding_provider::EmbeddingProvider;
pub use language_model::LanguageModel;
