use axum::{Router, routing::post};
use std::sync::Arc;

use crate::presentation::http::handlers::RetrievalHandler;

pub fn retrieval_routes(retrieval_handler: Arc<RetrievalHandler>) -> Router {
    Router::new()
        .route("/retrieval/{kind}", post(RetrievalHandler::search))
        .with_state(retrieval_handler)
}
