use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::services::EmbeddingService;
use crate::domain::repositories::ChunkRepository;
use crate::domain::value_objects::EntityKind;
use crate::presentation::http::dto::{ApiResponse, EmbeddingHealthDto, HealthResponseDto};

/// Reports the embedding provider and the chunk store alongside the service version.
pub struct HealthHandler {
    embedding_service: Arc<EmbeddingService>,
    chunk_repository: Arc<dyn ChunkRepository>,
}

impl HealthHandler {
    pub fn new(
        embedding_service: Arc<EmbeddingService>,
        chunk_repository: Arc<dyn ChunkRepository>,
    ) -> Self {
        Self {
            embedding_service,
            chunk_repository,
        }
    }

    pub async fn health(
        State(handler): State<Arc<HealthHandler>>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let embedding_available = handler.embedding_service.health_check().await;
        if !embedding_available {
            tracing::warn!("Embedding provider failed its health check");
        }

        let mut chunks = BTreeMap::new();
        let mut store_available = true;
        for kind in EntityKind::ALL {
            match handler.chunk_repository.count_by_kind(kind).await {
                Ok(count) => {
                    chunks.insert(kind.plural().to_string(), count);
                }
                Err(e) => {
                    tracing::error!("Failed to count {} chunks: {}", kind, e);
                    store_available = false;
                }
            }
        }

        let status = if embedding_available && store_available {
            "healthy"
        } else {
            "degraded"
        };

        let health_response = HealthResponseDto {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            embedding_provider: EmbeddingHealthDto {
                model: handler.embedding_service.model_name(),
                dimension: handler.embedding_service.embedding_dimension(),
                available: embedding_available,
            },
            store_available,
            chunks,
        };

        Ok((StatusCode::OK, Json(ApiResponse::success(health_response))))
    }
}
