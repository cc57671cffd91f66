use axum::{Router, routing::post};
use std::sync::Arc;

use crate::presentation::http::handlers::EmbeddingHandler;

pub fn embedding_routes(embedding_handler: Arc<EmbeddingHandler>) -> Router {
    Router::new()
        .route(
            "/embeddings/{kind}/regenerate",
            post(EmbeddingHandler::regenerate_kind),
        )
        .route(
            "/embeddings/{kind}/{item_id}/regenerate",
            post(EmbeddingHandler::regenerate_item),
        )
        .with_state(embedding_handler)
}
