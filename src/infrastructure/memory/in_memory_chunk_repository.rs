use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::ContentChunk;
use crate::domain::repositories::ChunkRepository;
use crate::domain::repositories::chunk_repository::{ChunkRepositoryError, validate_replacement};
use crate::domain::value_objects::EntityKind;

/// Chunk store kept in process memory, keyed by parent so iteration order matches
/// the `parent_id, chunk_index` ordering of the Postgres store.
#[derive(Default)]
pub struct InMemoryChunkRepository {
    chunks: RwLock<BTreeMap<Uuid, Vec<ContentChunk>>>,
}

impl InMemoryChunkRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkRepository for InMemoryChunkRepository {
    async fn replace_for_parent(
        &self,
        parent_id: Uuid,
        chunks: &[ContentChunk],
    ) -> Result<usize, ChunkRepositoryError> {
        validate_replacement(parent_id, chunks)?;

        let mut store = self.chunks.write().await;
        if chunks.is_empty() {
            store.remove(&parent_id);
        } else {
            store.insert(parent_id, chunks.to_vec());
        }
        Ok(chunks.len())
    }

    async fn find_by_parent(
        &self,
        parent_id: Uuid,
    ) -> Result<Vec<ContentChunk>, ChunkRepositoryError> {
        let store = self.chunks.read().await;
        Ok(store.get(&parent_id).cloned().unwrap_or_default())
    }

    async fn find_embedded_by_kind(
        &self,
        kind: EntityKind,
    ) -> Result<Vec<ContentChunk>, ChunkRepositoryError> {
        let store = self.chunks.read().await;
        Ok(store
            .values()
            .flatten()
            .filter(|chunk| chunk.entity_kind() == kind && chunk.has_embedding())
            .cloned()
            .collect())
    }

    async fn count_by_parent(&self, parent_id: Uuid) -> Result<i64, ChunkRepositoryError> {
        let store = self.chunks.read().await;
        Ok(store.get(&parent_id).map(|c| c.len() as i64).unwrap_or(0))
    }

    async fn count_by_kind(&self, kind: EntityKind) -> Result<i64, ChunkRepositoryError> {
        let store = self.chunks.read().await;
        Ok(store
            .values()
            .flatten()
            .filter(|chunk| chunk.entity_kind() == kind)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(parent_id: Uuid, index: i32, embedded: bool) -> ContentChunk {
        ContentChunk::new(
            parent_id,
            EntityKind::Product,
            index,
            format!("chunk {}", index),
            embedded.then(|| vec![1.0, 0.0]),
            None,
        )
    }

    #[tokio::test]
    async fn test_replace_swaps_whole_set() {
        let repository = InMemoryChunkRepository::new();
        let parent_id = Uuid::new_v4();

        let first = vec![chunk(parent_id, 0, true), chunk(parent_id, 1, true), chunk(parent_id, 2, false)];
        repository.replace_for_parent(parent_id, &first).await.unwrap();
        assert_eq!(repository.count_by_parent(parent_id).await.unwrap(), 3);
        assert_eq!(
            repository
                .find_embedded_by_kind(EntityKind::Product)
                .await
                .unwrap()
                .len(),
            2
        );

        let second = vec![chunk(parent_id, 0, true)];
        repository.replace_for_parent(parent_id, &second).await.unwrap();
        assert_eq!(repository.count_by_parent(parent_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_gapped_sequence_is_rejected_without_touching_existing_rows() {
        let repository = InMemoryChunkRepository::new();
        let parent_id = Uuid::new_v4();
        repository
            .replace_for_parent(parent_id, &[chunk(parent_id, 0, true)])
            .await
            .unwrap();

        let gapped = vec![chunk(parent_id, 0, true), chunk(parent_id, 2, true)];
        assert!(repository.replace_for_parent(parent_id, &gapped).await.is_err());
        assert_eq!(repository.count_by_parent(parent_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_foreign_chunks_are_rejected() {
        let repository = InMemoryChunkRepository::new();
        let parent_id = Uuid::new_v4();
        let other = Uuid::new_v4();

        let result = repository
            .replace_for_parent(parent_id, &[chunk(other, 0, true)])
            .await;
        assert!(matches!(result, Err(ChunkRepositoryError::ValidationError(_))));
    }
}
