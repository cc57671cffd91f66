use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::ContentChunk;
use crate::domain::value_objects::EntityKind;

#[derive(Debug)]
pub enum ChunkRepositoryError {
    DatabaseError(String),
    ValidationError(String),
}

impl std::fmt::Display for ChunkRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkRepositoryError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ChunkRepositoryError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ChunkRepositoryError {}

#[async_trait]
pub trait ChunkRepository: Send + Sync {
    /// Deletes every chunk of `parent_id` and inserts `chunks` as one atomic step.
    ///
    /// `chunks` must all belong to `parent_id` and carry the indices 0..n in order.
    async fn replace_for_parent(
        &self,
        parent_id: Uuid,
        chunks: &[ContentChunk],
    ) -> Result<usize, ChunkRepositoryError>;
    async fn find_by_parent(&self, parent_id: Uuid)
    -> Result<Vec<ContentChunk>, ChunkRepositoryError>;
    /// Chunks of `kind` with a non-null embedding, ordered by parent then chunk index.
    async fn find_embedded_by_kind(
        &self,
        kind: EntityKind,
    ) -> Result<Vec<ContentChunk>, ChunkRepositoryError>;
    async fn count_by_parent(&self, parent_id: Uuid) -> Result<i64, ChunkRepositoryError>;
    async fn count_by_kind(&self, kind: EntityKind) -> Result<i64, ChunkRepositoryError>;
}

/// Shared precondition check for `replace_for_parent` implementations.
pub fn validate_replacement(
    parent_id: Uuid,
    chunks: &[ContentChunk],
) -> Result<(), ChunkRepositoryError> {
    if let Some(stranger) = chunks.iter().find(|chunk| !chunk.belongs_to(parent_id)) {
        return Err(ChunkRepositoryError::ValidationError(format!(
            "Chunk {} belongs to {}, not {}",
            stranger.id(),
            stranger.parent_id(),
            parent_id
        )));
    }
    if !crate::domain::entities::content_chunk::is_contiguous_sequence(chunks) {
        return Err(ChunkRepositoryError::ValidationError(format!(
            "Chunks for {} are not a contiguous 0-based sequence",
            parent_id
        )));
    }
    Ok(())
}
