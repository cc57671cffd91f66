pub mod embedding_vector;
pub mod entity_kind;
pub mod keyword_query;

pub use embedding_vector::{ChunkDataError, EmbeddingVector};
pub use entity_kind::{EntityKind, FallbackPolicy};
pub use keyword_query::{KeywordQuery, MatchRank};
