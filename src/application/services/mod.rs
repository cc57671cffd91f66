pub mod cascade_search;
pub mod embedding_regeneration;
pub mod embedding_service;
pub mod order_quote;
pub mod similarity_search;
pub mod text_chunker;

pub use cascade_search::{CascadeSearchController, RetrievalRequest, RetrievalResponse};
pub use embedding_regeneration::{CancellationFlag, EmbeddingRegenerationService};
pub use embedding_service::EmbeddingService;
pub use order_quote::OrderQuoteService;
pub use similarity_search::SimilaritySearchEngine;
pub use text_chunker::SentenceChunker;
