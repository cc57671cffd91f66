use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::application::services::embedding_service::EmbeddingService;
use crate::application::services::text_chunker::SentenceChunker;
use crate::domain::entities::{CatalogItem, ContentChunk};
use crate::domain::repositories::{CatalogRepository, ChunkRepository};
use crate::domain::value_objects::EntityKind;

#[derive(Debug)]
pub enum RegenerationError {
    NotFound(Uuid),
    /// Every chunk failed to embed while the stored set still had embeddings; the stored set was kept.
    EmbeddingUnavailable(Uuid),
    CatalogError(String),
    StoreError(String),
}

impl std::fmt::Display for RegenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegenerationError::NotFound(id) => write!(f, "Catalog item not found: {}", id),
            RegenerationError::EmbeddingUnavailable(id) => write!(
                f,
                "Embedding provider unavailable, kept existing embeddings for {}",
                id
            ),
            RegenerationError::CatalogError(msg) => write!(f, "Catalog error: {}", msg),
            RegenerationError::StoreError(msg) => write!(f, "Chunk store error: {}", msg),
        }
    }
}

impl std::error::Error for RegenerationError {}

/// Cooperative stop signal, checked between parents of a batch run.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerationReport {
    /// Parents whose chunk set was rebuilt.
    pub count: usize,
    pub chunks: usize,
    /// Stored chunks that carry no embedding because the provider failed.
    pub unembedded: usize,
    pub failed: Vec<Uuid>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegeneratedItem {
    pub chunks: usize,
    pub unembedded: usize,
}

pub struct EmbeddingRegenerationService {
    chunker: SentenceChunker,
    embedding_service: Arc<EmbeddingService>,
    chunk_repository: Arc<dyn ChunkRepository>,
    catalog_repository: Arc<dyn CatalogRepository>,
    max_chunk_chars: usize,
}

impl EmbeddingRegenerationService {
    pub fn new(
        embedding_service: Arc<EmbeddingService>,
        chunk_repository: Arc<dyn ChunkRepository>,
        catalog_repository: Arc<dyn CatalogRepository>,
        max_chunk_chars: usize,
    ) -> Self {
        Self {
            chunker: SentenceChunker,
            embedding_service,
            chunk_repository,
            catalog_repository,
            max_chunk_chars,
        }
    }

    /// Rebuilds the chunk set of one item. Chunks whose embedding failed are stored unembedded,
    /// unless all of them failed and the item already has embedded chunks.
    pub async fn regenerate_item(
        &self,
        item: &CatalogItem,
    ) -> Result<RegeneratedItem, RegenerationError> {
        let paged = item.kind() == EntityKind::Document;
        let drafts = self
            .chunker
            .chunk_pages(&item.source_pages(), self.max_chunk_chars, paged);

        let texts: Vec<String> = drafts.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embedding_service.embed_batch(&texts).await;

        let mut degraded = 0;
        let chunks: Vec<ContentChunk> = drafts
            .into_iter()
            .zip(embeddings)
            .map(|(draft, generated)| {
                if generated.degraded {
                    degraded += 1;
                }
                ContentChunk::new(
                    item.id(),
                    item.kind(),
                    draft.chunk_index,
                    draft.content,
                    generated.into_stored(),
                    draft.page_number,
                )
            })
            .collect();

        if !chunks.is_empty()
            && degraded == chunks.len()
            && self.has_embeddings(item.id()).await?
        {
            tracing::warn!(
                "Embedding failed for every chunk of {} {}, keeping the stored set",
                item.kind(),
                item.id()
            );
            return Err(RegenerationError::EmbeddingUnavailable(item.id()));
        }

        let stored = self
            .chunk_repository
            .replace_for_parent(item.id(), &chunks)
            .await
            .map_err(|e| RegenerationError::StoreError(e.to_string()))?;

        if degraded > 0 {
            tracing::warn!(
                "{} of {} chunks for {} {} stored without embedding",
                degraded,
                stored,
                item.kind(),
                item.id()
            );
        }
        tracing::info!("Regenerated {} chunks for {} {}", stored, item.kind(), item.id());

        Ok(RegeneratedItem {
            chunks: stored,
            unembedded: degraded,
        })
    }

    async fn has_embeddings(&self, parent_id: Uuid) -> Result<bool, RegenerationError> {
        let existing = self
            .chunk_repository
            .find_by_parent(parent_id)
            .await
            .map_err(|e| RegenerationError::StoreError(e.to_string()))?;
        Ok(existing.iter().any(|chunk| chunk.has_embedding()))
    }

    pub async fn regenerate_by_id(
        &self,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<RegeneratedItem, RegenerationError> {
        let item = self
            .catalog_repository
            .find_by_id(id)
            .await
            .map_err(|e| RegenerationError::CatalogError(e.to_string()))?
            .filter(|item| item.kind() == kind)
            .ok_or(RegenerationError::NotFound(id))?;

        self.regenerate_item(&item).await
    }

    /// Regenerates every item of a kind, one parent at a time.
    pub async fn regenerate_kind(
        &self,
        kind: EntityKind,
        cancellation: &CancellationFlag,
    ) -> Result<RegenerationReport, RegenerationError> {
        let items = self
            .catalog_repository
            .list_by_kind(kind)
            .await
            .map_err(|e| RegenerationError::CatalogError(e.to_string()))?;

        let mut report = RegenerationReport::default();
        for item in &items {
            if cancellation.is_cancelled() {
                tracing::warn!(
                    "Regeneration of {} cancelled after {} of {} items",
                    kind.plural(),
                    report.count + report.failed.len(),
                    items.len()
                );
                report.cancelled = true;
                break;
            }

            match self.regenerate_item(item).await {
                Ok(regenerated) => {
                    report.count += 1;
                    report.chunks += regenerated.chunks;
                    report.unembedded += regenerated.unembedded;
                }
                Err(e) => {
                    tracing::error!("Failed to regenerate {} {}: {}", kind, item.id(), e);
                    report.failed.push(item.id());
                }
            }
        }

        tracing::info!(
            "Regenerated {} {} ({} chunks, {} failed)",
            report.count,
            kind.plural(),
            report.chunks,
            report.failed.len()
        );
        if report.unembedded > 0 {
            tracing::warn!(
                "{} of {} regenerated {} chunks have no embedding",
                report.unembedded,
                report.chunks,
                kind
            );
        }
        Ok(report)
    }
}
