use rayon::prelude::*;
use std::sync::Arc;

use crate::application::services::embedding_service::EmbeddingService;
use crate::domain::entities::ContentChunk;
use crate::domain::repositories::ChunkRepository;
use crate::domain::value_objects::{EmbeddingVector, EntityKind};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.30;

#[derive(Debug)]
pub enum SimilaritySearchError {
    ProviderError(String),
    RepositoryError(String),
}

impl std::fmt::Display for SimilaritySearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimilaritySearchError::ProviderError(msg) => write!(f, "Embedding provider error: {}", msg),
            SimilaritySearchError::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
        }
    }
}

impl std::error::Error for SimilaritySearchError {}

#[derive(Debug, Clone)]
pub struct ChunkMatch {
    pub chunk: ContentChunk,
    pub similarity_score: f32,
}

/// Exhaustive cosine scan over every embedded chunk of one kind.
pub struct SimilaritySearchEngine {
    embedding_service: Arc<EmbeddingService>,
    chunk_repository: Arc<dyn ChunkRepository>,
    min_similarity: f32,
}

impl SimilaritySearchEngine {
    pub fn new(
        embedding_service: Arc<EmbeddingService>,
        chunk_repository: Arc<dyn ChunkRepository>,
        min_similarity: f32,
    ) -> Self {
        Self {
            embedding_service,
            chunk_repository,
            min_similarity,
        }
    }

    pub fn min_similarity(&self) -> f32 {
        self.min_similarity
    }

    pub async fn search(
        &self,
        kind: EntityKind,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ChunkMatch>, SimilaritySearchError> {
        let generated = self.embedding_service.embed(query).await;
        if generated.degraded {
            return Err(SimilaritySearchError::ProviderError(format!(
                "could not embed query for {}",
                kind.plural()
            )));
        }

        let chunks = self
            .chunk_repository
            .find_embedded_by_kind(kind)
            .await
            .map_err(|e| SimilaritySearchError::RepositoryError(e.to_string()))?;

        let dimension = self.embedding_service.embedding_dimension();
        let candidates: Vec<(ContentChunk, EmbeddingVector)> = chunks
            .into_iter()
            .filter_map(|chunk| {
                let raw = chunk.embedding()?.to_vec();
                match EmbeddingVector::decode(raw, dimension) {
                    Ok(vector) => Some((chunk, vector)),
                    Err(e) => {
                        tracing::warn!(
                            "Skipping chunk {} of {}: {}",
                            chunk.id(),
                            chunk.parent_id(),
                            e
                        );
                        None
                    }
                }
            })
            .collect();

        let query_vector = generated.vector;
        // par_iter + collect keeps input order, which the stable sort relies on for ties.
        let scores: Vec<f32> = candidates
            .par_iter()
            .map(|(_, vector)| query_vector.cosine_similarity(vector))
            .collect();

        let mut matches: Vec<ChunkMatch> = candidates
            .into_iter()
            .zip(scores)
            .filter(|(_, score)| *score >= self.min_similarity)
            .map(|((chunk, _), similarity_score)| ChunkMatch {
                chunk,
                similarity_score,
            })
            .collect();

        matches.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        matches.truncate(top_k);

        tracing::debug!(
            "Similarity search over {} returned {} matches",
            kind.plural(),
            matches.len()
        );

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::embedding_service::test_support::ScriptedEmbeddingProvider;
    use crate::infrastructure::memory::InMemoryChunkRepository;
    use uuid::Uuid;

    fn chunk(parent_id: Uuid, index: i32, vector: Vec<f32>) -> ContentChunk {
        ContentChunk::new(
            parent_id,
            EntityKind::Product,
            index,
            format!("chunk {}", index),
            Some(vector),
            None,
        )
    }

    async fn engine(
        provider: ScriptedEmbeddingProvider,
        parents: Vec<(Uuid, Vec<ContentChunk>)>,
    ) -> SimilaritySearchEngine {
        let repository = Arc::new(InMemoryChunkRepository::new());
        for (parent_id, chunks) in parents {
            repository.replace_for_parent(parent_id, &chunks).await.unwrap();
        }
        SimilaritySearchEngine::new(
            Arc::new(EmbeddingService::new(Arc::new(provider))),
            repository,
            DEFAULT_MIN_SIMILARITY,
        )
    }

    #[tokio::test]
    async fn test_results_are_sorted_and_thresholded() {
        let parent_id = Uuid::new_v4();
        let provider = ScriptedEmbeddingProvider::new(2).with("red wine", vec![1.0, 0.0]);
        let engine = engine(
            provider,
            vec![(
                parent_id,
                vec![
                    chunk(parent_id, 0, vec![0.0, 1.0]),
                    chunk(parent_id, 1, vec![0.6, 0.8]),
                    chunk(parent_id, 2, vec![1.0, 0.0]),
                ],
            )],
        )
        .await;

        let matches = engine.search(EntityKind::Product, "red wine", 5).await.unwrap();
        let indices: Vec<i32> = matches.iter().map(|m| m.chunk.chunk_index()).collect();
        assert_eq!(indices, vec![2, 1]);
        assert!((matches[0].similarity_score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_ties_keep_chunk_order_and_top_k_applies() {
        let parent_id = Uuid::new_v4();
        let provider = ScriptedEmbeddingProvider::new(2).with("oil", vec![1.0, 1.0]);
        let chunks = (0..4).map(|i| chunk(parent_id, i, vec![2.0, 2.0])).collect();
        let engine = engine(provider, vec![(parent_id, chunks)]).await;

        let matches = engine.search(EntityKind::Product, "oil", 3).await.unwrap();
        let indices: Vec<i32> = matches.iter().map(|m| m.chunk.chunk_index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_corrupt_rows_are_skipped() {
        let parent_id = Uuid::new_v4();
        let provider = ScriptedEmbeddingProvider::new(2).with("oil", vec![1.0, 0.0]);
        let engine = engine(
            provider,
            vec![(
                parent_id,
                vec![
                    chunk(parent_id, 0, vec![1.0, 0.0, 0.0]),
                    chunk(parent_id, 1, vec![f32::NAN, 1.0]),
                    chunk(parent_id, 2, vec![1.0, 0.1]),
                ],
            )],
        )
        .await;

        let matches = engine.search(EntityKind::Product, "oil", 5).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].chunk.chunk_index(), 2);
    }

    #[tokio::test]
    async fn test_provider_failure_is_reported() {
        let engine = engine(ScriptedEmbeddingProvider::failing(2), Vec::new()).await;
        let result = engine.search(EntityKind::Faq, "refunds", 5).await;
        assert!(matches!(result, Err(SimilaritySearchError::ProviderError(_))));
    }
}
