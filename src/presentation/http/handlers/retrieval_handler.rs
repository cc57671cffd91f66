use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::application::services::cascade_search::RetrievalRequest;
use crate::application::use_cases::SearchCatalogUseCase;
use crate::application::use_cases::search_catalog::SearchCatalogError;
use crate::domain::value_objects::EntityKind;
use crate::presentation::http::dto::{ApiResponse, RetrievalResponseDto};

pub struct RetrievalHandler {
    search_use_case: Arc<SearchCatalogUseCase>,
}

impl RetrievalHandler {
    pub fn new(search_use_case: Arc<SearchCatalogUseCase>) -> Self {
        Self { search_use_case }
    }

    pub async fn search(
        State(handler): State<Arc<RetrievalHandler>>,
        Path(kind): Path<String>,
        Json(request): Json<RetrievalRequest>,
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

        match handler.search_use_case.execute(kind, request).await {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(RetrievalResponseDto::from(response))),
            )),
            Err(SearchCatalogError::ValidationError(msg)) => Ok((
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error("INVALID_REQUEST".to_string(), msg, None)),
            )),
            Err(e @ SearchCatalogError::UnsupportedKind(_)) => Ok((
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(
                    "KIND_NOT_CONFIGURED".to_string(),
                    e.to_string(),
                    None,
                )),
            )),
        }
    }
}
