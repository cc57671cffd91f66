mod application;
mod domain;
mod infrastructure;
mod presentation;

use dotenv::dotenv;

use crate::infrastructure::{AppConfig, AppContainer};
use crate::presentation::http::HttpServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        "Starting catalog-rag ({:?} backend, agent mode {:?})",
        config.backend,
        config.agent_mode
    );

    let container = AppContainer::new(&config).await?;

    let server = HttpServer::new(
        container.health_handler.clone(),
        container.retrieval_handler.clone(),
        container.embedding_handler.clone(),
        container.agent_handler.clone(),
        container.shutdown.clone(),
        Some(config.port),
    );

    server.run().await
}
