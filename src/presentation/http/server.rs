use axum::Router;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::application::services::embedding_regeneration::CancellationFlag;
use crate::presentation::http::{
    handlers::{AgentHandler, EmbeddingHandler, HealthHandler, RetrievalHandler},
    routes::{agent_routes, embedding_routes, health_routes, retrieval_routes},
};

const REQUEST_BODY_LIMIT: usize = 2 * 1024 * 1024;

pub struct HttpServer {
    health_handler: Arc<HealthHandler>,
    retrieval_handler: Arc<RetrievalHandler>,
    embedding_handler: Arc<EmbeddingHandler>,
    agent_handler: Arc<AgentHandler>,
    shutdown: CancellationFlag,
    port: u16,
}

impl HttpServer {
    pub fn new(
        health_handler: Arc<HealthHandler>,
        retrieval_handler: Arc<RetrievalHandler>,
        embedding_handler: Arc<EmbeddingHandler>,
        agent_handler: Arc<AgentHandler>,
        shutdown: CancellationFlag,
        port: Option<u16>,
    ) -> Self {
        Self {
            health_handler,
            retrieval_handler,
            embedding_handler,
            agent_handler,
            shutdown,
            port: port.unwrap_or(3000),
        }
    }

    pub fn router(&self) -> Router {
        build_router(
            self.health_handler.clone(),
            self.retrieval_handler.clone(),
            self.embedding_handler.clone(),
            self.agent_handler.clone(),
        )
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        let shutdown = self.shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for shutdown signal: {}", e);
                }
                tracing::info!("Shutdown requested, stopping running regenerations");
                shutdown.cancel();
            })
            .await?;

        Ok(())
    }
}

pub fn build_router(
    health_handler: Arc<HealthHandler>,
    retrieval_handler: Arc<RetrievalHandler>,
    embedding_handler: Arc<EmbeddingHandler>,
    agent_handler: Arc<AgentHandler>,
) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health_routes(health_handler))
        .merge(retrieval_routes(retrieval_handler))
        .merge(embedding_routes(embedding_handler))
        .merge(agent_routes(agent_handler))
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(REQUEST_BODY_LIMIT))
        .layer(
            TraceLayer::new_for_http()
                .on_request(
                    |request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {
                        tracing::info!("Received request: {} {}", request.method(), request.uri());
                    },
                )
                .on_response(
                    |response: &axum::http::Response<axum::body::Body>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            "Response: {} (took {} ms)",
                            response.status(),
                            latency.as_millis()
                        );
                    },
                )
                .on_failure(
                    |error: ServerErrorsFailureClass,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::error!(
                            "Request failed: {:?} (took {} ms)",
                            error,
                            latency.as_millis()
                        );
                    },
                ),
        )
}
