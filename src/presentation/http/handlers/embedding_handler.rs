use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::services::embedding_regeneration::RegenerationError;
use crate::application::use_cases::RegenerateEmbeddingsUseCase;
use crate::domain::value_objects::EntityKind;
use crate::presentation::http::dto::{
    ApiResponse, RegenerateItemResponseDto, RegenerateKindResponseDto,
};

pub struct EmbeddingHandler {
    regenerate_use_case: Arc<RegenerateEmbeddingsUseCase>,
}

impl EmbeddingHandler {
    pub fn new(regenerate_use_case: Arc<RegenerateEmbeddingsUseCase>) -> Self {
        Self {
            regenerate_use_case,
        }
    }

    pub async fn regenerate_kind(
        State(handler): State<Arc<EmbeddingHandler>>,
        Path(kind): Path<String>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let kind = match EntityKind::from_string(&kind) {
            Ok(kind) => kind,
            Err(e) => {
                return Ok((
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error("INVALID_KIND".to_string(), e, None)),
                ));
            }
        };

        match handler.regenerate_use_case.regenerate_kind(kind).await {
            Ok(report) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(RegenerateKindResponseDto::new(
                    kind, report,
                ))),
            )),
            Err(e) => Ok(regeneration_error(e)),
        }
    }

    pub async fn regenerate_item(
        State(handler): State<Arc<EmbeddingHandler>>,
        Path((kind, item_id)): Path<(String, Uuid)>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let kind = match EntityKind::from_string(&kind) {
            Ok(kind) => kind,
            Err(e) => {
                return Ok((
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error("INVALID_KIND".to_string(), e, None)),
                ));
            }
        };

        match handler
            .regenerate_use_case
            .regenerate_item(kind, item_id)
            .await
        {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(RegenerateItemResponseDto::from(
                    response,
                ))),
            )),
            Err(e) => Ok(regeneration_error(e)),
        }
    }
}

fn regeneration_error<T>(error: RegenerationError) -> (StatusCode, Json<ApiResponse<T>>) {
    match error {
        RegenerationError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(
                "ITEM_NOT_FOUND".to_string(),
                format!("Catalog item with ID {} not found", id),
                None,
            )),
        ),
        RegenerationError::EmbeddingUnavailable(id) => {
            tracing::warn!("Kept existing embeddings for {}", id);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::error(
                    "EMBEDDING_UNAVAILABLE".to_string(),
                    error.to_string(),
                    None,
                )),
            )
        }
        other => {
            tracing::error!("Embedding regeneration failed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(
                    "REGENERATION_FAILED".to_string(),
                    other.to_string(),
                    None,
                )),
            )
        }
    }
}
