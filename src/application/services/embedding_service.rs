use std::sync::Arc;

use crate::application::ports::embedding_provider::{
    BatchEmbeddingRequest, EmbeddingProvider, EmbeddingProviderError, EmbeddingRequest,
    ProviderEmbedding,
};
use crate::domain::value_objects::EmbeddingVector;

const BATCH_SIZE: usize = 10;

/// Generator output. A degraded vector is all zeros and must be treated as unembedded.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedEmbedding {
    pub vector: EmbeddingVector,
    pub degraded: bool,
}

impl GeneratedEmbedding {
    /// The vector to persist, `None` when generation failed.
    pub fn into_stored(self) -> Option<Vec<f32>> {
        if self.degraded {
            None
        } else {
            Some(self.vector.into_inner())
        }
    }
}

pub struct EmbeddingService {
    embedding_provider: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingService {
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedding_provider }
    }

    pub async fn embed(&self, text: &str) -> GeneratedEmbedding {
        let request = EmbeddingRequest {
            text: text.to_string(),
            model_name: Some(self.embedding_provider.model_name()),
        };

        match self.embedding_provider.generate_embedding(request).await {
            Ok(response) => match self.normalize(response.embedding) {
                Some(vector) => GeneratedEmbedding {
                    vector,
                    degraded: false,
                },
                None => self.degraded("malformed embedding in provider response"),
            },
            Err(e) => self.degraded(&e.to_string()),
        }
    }

    /// One result per input, in input order.
    pub async fn embed_batch(&self, texts: &[String]) -> Vec<GeneratedEmbedding> {
        let mut results = Vec::with_capacity(texts.len());

        for batch in texts.chunks(BATCH_SIZE) {
            let request = BatchEmbeddingRequest {
                texts: batch.to_vec(),
                model_name: Some(self.embedding_provider.model_name()),
            };

            let response = self
                .embedding_provider
                .generate_embeddings(request)
                .await
                .and_then(|response| {
                    if response.embeddings.len() == batch.len() {
                        Ok(response)
                    } else {
                        Err(EmbeddingProviderError::ApiError(format!(
                            "expected {} embeddings, received {}",
                            batch.len(),
                            response.embeddings.len()
                        )))
                    }
                });

            match response {
                Ok(response) => {
                    for embedding in response.embeddings {
                        results.push(match self.normalize(embedding) {
                            Some(vector) => GeneratedEmbedding {
                                vector,
                                degraded: false,
                            },
                            None => self.degraded("malformed embedding in batch response"),
                        });
                    }
                }
                Err(e) => {
                    let reason = e.to_string();
                    results.extend(batch.iter().map(|_| self.degraded(&reason)));
                }
            }
        }

        results
    }

    pub async fn health_check(&self) -> bool {
        self.embedding_provider.health_check().await.unwrap_or(false)
    }

    pub fn model_name(&self) -> String {
        self.embedding_provider.model_name()
    }

    pub fn embedding_dimension(&self) -> usize {
        self.embedding_provider.embedding_dimension()
    }

    fn normalize(&self, embedding: ProviderEmbedding) -> Option<EmbeddingVector> {
        let vector = match embedding {
            ProviderEmbedding::Pooled(values) => EmbeddingVector::new(values),
            ProviderEmbedding::PerToken(tokens) => EmbeddingVector::mean_pool(&tokens)?,
        };

        EmbeddingVector::decode(vector.into_inner(), self.embedding_dimension()).ok()
    }

    fn degraded(&self, reason: &str) -> GeneratedEmbedding {
        tracing::warn!(
            "Embedding generation failed, substituting zero vector: {}",
            reason
        );
        GeneratedEmbedding {
            vector: EmbeddingVector::zero(self.embedding_dimension()),
            degraded: true,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::ScriptedEmbeddingProvider;
    use super::*;
    use async_trait::async_trait;

    use crate::application::ports::embedding_provider::{
        BatchEmbeddingResponse, EmbeddingResponse,
    };

    struct TokenLevelProvider;

    #[async_trait]
    impl EmbeddingProvider for TokenLevelProvider {
        async fn generate_embedding(
            &self,
            _request: EmbeddingRequest,
        ) -> Result<EmbeddingResponse, EmbeddingProviderError> {
            Ok(EmbeddingResponse {
                embedding: ProviderEmbedding::PerToken(vec![vec![1.0, 0.0], vec![3.0, 2.0]]),
                model_name: "tokens".to_string(),
            })
        }

        async fn generate_embeddings(
            &self,
            request: BatchEmbeddingRequest,
        ) -> Result<BatchEmbeddingResponse, EmbeddingProviderError> {
            // Drops the last input to simulate a malformed batch.
            let count = request.texts.len().saturating_sub(1);
            Ok(BatchEmbeddingResponse {
                embeddings: vec![ProviderEmbedding::Pooled(vec![1.0, 1.0]); count],
                model_name: "tokens".to_string(),
            })
        }

        async fn health_check(&self) -> Result<bool, EmbeddingProviderError> {
            Ok(true)
        }

        fn model_name(&self) -> String {
            "tokens".to_string()
        }

        fn embedding_dimension(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn test_per_token_output_is_mean_pooled() {
        let service = EmbeddingService::new(Arc::new(TokenLevelProvider));
        let generated = service.embed("anything").await;

        assert!(!generated.degraded);
        assert_eq!(generated.vector.as_slice(), &[2.0, 1.0]);
    }

    #[tokio::test]
    async fn test_batch_count_mismatch_degrades_whole_batch() {
        let service = EmbeddingService::new(Arc::new(TokenLevelProvider));
        let texts = vec!["a".to_string(), "b".to_string()];
        let generated = service.embed_batch(&texts).await;

        assert_eq!(generated.len(), 2);
        assert!(generated.iter().all(|g| g.degraded && g.vector.is_zero()));
    }

    #[tokio::test]
    async fn test_provider_failure_yields_zero_vector() {
        let service = EmbeddingService::new(Arc::new(ScriptedEmbeddingProvider::failing(4)));
        let generated = service.embed("olive oil").await;

        assert!(generated.degraded);
        assert_eq!(generated.vector, EmbeddingVector::zero(4));
        assert_eq!(generated.into_stored(), None);
    }

    #[tokio::test]
    async fn test_batch_preserves_input_order() {
        let provider = ScriptedEmbeddingProvider::new(3)
            .with("first", vec![1.0, 0.0, 0.0])
            .with("second", vec![0.0, 1.0, 0.0]);
        let service = EmbeddingService::new(Arc::new(provider));

        let texts: Vec<String> = (0..12)
            .map(|i| if i % 2 == 0 { "first" } else { "second" }.to_string())
            .collect();
        let generated = service.embed_batch(&texts).await;

        assert_eq!(generated.len(), 12);
        for (i, embedding) in generated.iter().enumerate() {
            let expected = if i % 2 == 0 { 0 } else { 1 };
            assert_eq!(embedding.vector.as_slice()[expected], 1.0);
        }
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_malformed() {
        let provider = ScriptedEmbeddingProvider::new(3).with("short", vec![1.0, 2.0]);
        let service = EmbeddingService::new(Arc::new(provider));

        assert!(service.embed("short").await.degraded);
    }
}
