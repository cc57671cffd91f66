use std::sync::Arc;
use uuid::Uuid;

use crate::application::services::embedding_regeneration::{
    CancellationFlag, EmbeddingRegenerationService, RegenerationError, RegenerationReport,
};
use crate::domain::value_objects::EntityKind;

#[derive(Debug, Clone)]
pub struct RegenerateItemResponse {
    pub parent_id: Uuid,
    pub chunk_count: usize,
    pub unembedded: usize,
}

/// Entry point for the "(re)generate embeddings" action. Batch runs stop early once
/// the shared shutdown flag is raised.
pub struct RegenerateEmbeddingsUseCase {
    regeneration_service: Arc<EmbeddingRegenerationService>,
    shutdown: CancellationFlag,
}

impl RegenerateEmbeddingsUseCase {
    pub fn new(
        regeneration_service: Arc<EmbeddingRegenerationService>,
        shutdown: CancellationFlag,
    ) -> Self {
        Self {
            regeneration_service,
            shutdown,
        }
    }

    pub async fn regenerate_kind(
        &self,
        kind: EntityKind,
    ) -> Result<RegenerationReport, RegenerationError> {
        tracing::info!("Regenerating embeddings for all {}", kind.plural());
        self.regeneration_service
            .regenerate_kind(kind, &self.shutdown)
            .await
    }

    pub async fn regenerate_item(
        &self,
        kind: EntityKind,
        parent_id: Uuid,
    ) -> Result<RegenerateItemResponse, RegenerationError> {
        let regenerated = self
            .regeneration_service
            .regenerate_by_id(kind, parent_id)
            .await?;

        Ok(RegenerateItemResponse {
            parent_id,
            chunk_count: regenerated.chunks,
            unembedded: regenerated.unembedded,
        })
    }
}
