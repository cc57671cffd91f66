use std::collections::HashMap;
use std::sync::Arc;

use crate::application::services::cascade_search::{
    CascadeSearchController, RetrievalRequest, RetrievalResponse,
};
use crate::domain::value_objects::EntityKind;

#[derive(Debug)]
pub enum SearchCatalogError {
    ValidationError(String),
    UnsupportedKind(EntityKind),
}

impl std::fmt::Display for SearchCatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchCatalogError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            SearchCatalogError::UnsupportedKind(kind) => {
                write!(f, "No retrieval configured for {}", kind.plural())
            }
        }
    }
}

impl std::error::Error for SearchCatalogError {}

#[derive(Debug, Clone)]
pub struct SearchCatalogResponse {
    pub kind: EntityKind,
    pub response: RetrievalResponse,
    pub search_time_ms: u64,
}

pub struct SearchCatalogUseCase {
    controllers: HashMap<EntityKind, Arc<CascadeSearchController>>,
}

impl SearchCatalogUseCase {
    pub fn new(controllers: Vec<Arc<CascadeSearchController>>) -> Self {
        Self {
            controllers: controllers
                .into_iter()
                .map(|controller| (controller.kind(), controller))
                .collect(),
        }
    }

    pub async fn execute(
        &self,
        kind: EntityKind,
        request: RetrievalRequest,
    ) -> Result<SearchCatalogResponse, SearchCatalogError> {
        let start_time = std::time::Instant::now();

        if let (Some(min), Some(max)) = (request.min_price, request.max_price) {
            if min > max {
                return Err(SearchCatalogError::ValidationError(format!(
                    "minPrice {} is greater than maxPrice {}",
                    min, max
                )));
            }
        }
        if request.limit == Some(0) {
            return Err(SearchCatalogError::ValidationError(
                "limit must be at least 1".to_string(),
            ));
        }

        let controller = self
            .controllers
            .get(&kind)
            .ok_or(SearchCatalogError::UnsupportedKind(kind))?;

        let response = controller.execute(request).await;

        Ok(SearchCatalogResponse {
            kind,
            response,
            search_time_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}
