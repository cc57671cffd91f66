use std::sync::Arc;

use crate::{
    application::{
        agent::AgentOrchestrator,
        ports::{AgentSettingsSource, EmbeddingProvider, LanguageModel},
        services::{
            CancellationFlag, CascadeSearchController, EmbeddingRegenerationService,
            EmbeddingService, OrderQuoteService, SimilaritySearchEngine,
            cascade_search::RetrievalSettings,
        },
        tools::{CatalogSearchTool, CompleteOrderTool, Tool, ToolRegistry},
        use_cases::{AgentChatUseCase, RegenerateEmbeddingsUseCase, SearchCatalogUseCase},
    },
    domain::{
        repositories::{CatalogRepository, ChunkRepository},
        value_objects::EntityKind,
    },
    infrastructure::{
        config::{AppConfig, CatalogBackend, ConfigError},
        database::{
            create_connection_pool, get_database_connection,
            repositories::{PostgresCatalogRepository, PostgresChunkRepository},
            run_migrations,
        },
        external_services::{
            ChatCompletionClient, ChatCompletionConfig, EmbeddingsClientConfig,
            InferenceEmbeddingProvider,
        },
        memory::{InMemoryCatalogRepository, InMemoryChunkRepository, load_seed_items},
        settings::FileAgentSettingsSource,
    },
    presentation::http::handlers::{AgentHandler, EmbeddingHandler, HealthHandler, RetrievalHandler},
};

const LLM_TIMEOUT_SECS: u64 = 60;

pub struct AppContainer {
    // Repositories
    pub catalog_repository: Arc<dyn CatalogRepository>,
    pub chunk_repository: Arc<dyn ChunkRepository>,

    // External Services
    pub embedding_provider: Arc<dyn EmbeddingProvider>,
    pub language_model: Arc<dyn LanguageModel>,
    pub agent_settings: Arc<dyn AgentSettingsSource>,

    // Application Services
    pub embedding_service: Arc<EmbeddingService>,
    pub similarity_engine: Arc<SimilaritySearchEngine>,
    pub controllers: Vec<Arc<CascadeSearchController>>,
    pub tool_registry: Arc<ToolRegistry>,
    pub regeneration_service: Arc<EmbeddingRegenerationService>,
    pub orchestrator: Arc<AgentOrchestrator>,

    // Use Cases
    pub search_catalog_use_case: Arc<SearchCatalogUseCase>,
    pub regenerate_embeddings_use_case: Arc<RegenerateEmbeddingsUseCase>,
    pub agent_chat_use_case: Arc<AgentChatUseCase>,

    // HTTP Handlers
    pub health_handler: Arc<HealthHandler>,
    pub retrieval_handler: Arc<RetrievalHandler>,
    pub embedding_handler: Arc<EmbeddingHandler>,
    pub agent_handler: Arc<AgentHandler>,

    /// Raised on shutdown; batch regenerations stop between items.
    pub shutdown: CancellationFlag,
}

impl AppContainer {
    pub async fn new(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let (catalog_repository, chunk_repository) = Self::build_stores(config).await?;

        // Create external services
        let embedding_provider: Arc<dyn EmbeddingProvider> =
            Arc::new(InferenceEmbeddingProvider::new(EmbeddingsClientConfig::new(
                config.embeddings_service_url.clone(),
                config.embedding_model.clone(),
                config.embedding_dimension,
            ))?);

        let language_model: Arc<dyn LanguageModel> =
            Arc::new(ChatCompletionClient::new(ChatCompletionConfig {
                base_url: config.llm_base_url.clone(),
                api_key: config.llm_api_key.clone(),
                timeout_secs: LLM_TIMEOUT_SECS,
            })?);

        let agent_settings: Arc<dyn AgentSettingsSource> = Arc::new(
            FileAgentSettingsSource::new(config.agent_settings_path.clone()),
        );

        Ok(Self::assemble(
            config,
            catalog_repository,
            chunk_repository,
            embedding_provider,
            language_model,
            agent_settings,
        ))
    }

    async fn build_stores(
        config: &AppConfig,
    ) -> Result<(Arc<dyn CatalogRepository>, Arc<dyn ChunkRepository>), Box<dyn std::error::Error>>
    {
        match config.backend {
            CatalogBackend::Memory => {
                let catalog = match &config.catalog_seed_path {
                    Some(path) => InMemoryCatalogRepository::from_seed_file(path).await?,
                    None => InMemoryCatalogRepository::default(),
                };
                tracing::info!("Using in-memory catalog and chunk store");
                Ok((Arc::new(catalog), Arc::new(InMemoryChunkRepository::new())))
            }
            CatalogBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .ok_or_else(|| ConfigError::Missing("DATABASE_URL".to_string()))?;

                // Create database connection pool
                let db_pool = create_connection_pool(database_url)?;
                let mut conn = get_database_connection(database_url)?;
                run_migrations(&mut conn)?;

                let catalog = PostgresCatalogRepository::new(db_pool.clone());
                if let Some(path) = &config.catalog_seed_path {
                    let items = load_seed_items(path).await?;
                    let inserted = catalog.seed(&items)?;
                    tracing::info!("Seeded {} new catalog items", inserted);
                }

                Ok((
                    Arc::new(catalog),
                    Arc::new(PostgresChunkRepository::new(db_pool)),
                ))
            }
        }
    }

    /// Wires every collaborator from already-built stores and external services.
    pub fn assemble(
        config: &AppConfig,
        catalog_repository: Arc<dyn CatalogRepository>,
        chunk_repository: Arc<dyn ChunkRepository>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        language_model: Arc<dyn LanguageModel>,
        agent_settings: Arc<dyn AgentSettingsSource>,
    ) -> Self {
        // Create application services
        let embedding_service = Arc::new(EmbeddingService::new(embedding_provider.clone()));
        let similarity_engine = Arc::new(SimilaritySearchEngine::new(
            embedding_service.clone(),
            chunk_repository.clone(),
            config.retrieval_min_similarity,
        ));

        let retrieval_settings = RetrievalSettings {
            top_k: config.retrieval_top_k,
            stop_words: Arc::new(config.stop_words.clone()),
        };
        let controllers: Vec<Arc<CascadeSearchController>> = EntityKind::ALL
            .iter()
            .map(|kind| {
                Arc::new(CascadeSearchController::new(
                    *kind,
                    similarity_engine.clone(),
                    catalog_repository.clone(),
                    retrieval_settings.clone(),
                ))
            })
            .collect();

        // Create tools
        let quote_service = Arc::new(OrderQuoteService::new(catalog_repository.clone()));
        let mut tools: Vec<Arc<dyn Tool>> = controllers
            .iter()
            .map(|controller| Arc::new(CatalogSearchTool::new(controller.clone())) as Arc<dyn Tool>)
            .collect();
        tools.push(Arc::new(CompleteOrderTool::new(quote_service)));
        let tool_registry = Arc::new(ToolRegistry::new(tools));

        let regeneration_service = Arc::new(EmbeddingRegenerationService::new(
            embedding_service.clone(),
            chunk_repository.clone(),
            catalog_repository.clone(),
            config.chunk_max_chars,
        ));

        let orchestrator = Arc::new(AgentOrchestrator::new(
            language_model.clone(),
            agent_settings.clone(),
            tool_registry.clone(),
            config.agent_max_iterations,
            config.agent_mode,
        ));

        // Create use cases
        let shutdown = CancellationFlag::new();
        let search_catalog_use_case = Arc::new(SearchCatalogUseCase::new(controllers.clone()));
        let regenerate_embeddings_use_case = Arc::new(RegenerateEmbeddingsUseCase::new(
            regeneration_service.clone(),
            shutdown.clone(),
        ));
        let agent_chat_use_case = Arc::new(AgentChatUseCase::new(orchestrator.clone()));

        // Create HTTP handlers
        let health_handler = Arc::new(HealthHandler::new(
            embedding_service.clone(),
            chunk_repository.clone(),
        ));
        let retrieval_handler = Arc::new(RetrievalHandler::new(search_catalog_use_case.clone()));
        let embedding_handler = Arc::new(EmbeddingHandler::new(
            regenerate_embeddings_use_case.clone(),
        ));
        let agent_handler = Arc::new(AgentHandler::new(agent_chat_use_case.clone()));

        tracing::info!(
            "Registered {} agent tools: {}",
            tool_registry.names().len(),
            tool_registry.names().join(", ")
        );

        Self {
            catalog_repository,
            chunk_repository,
            embedding_provider,
            language_model,
            agent_settings,
            embedding_service,
            similarity_engine,
            controllers,
            tool_registry,
            regeneration_service,
            orchestrator,
            search_catalog_use_case,
            regenerate_embeddings_use_case,
            agent_chat_use_case,
            health_handler,
            retrieval_handler,
            embedding_handler,
            agent_handler,
            shutdown,
        }
    }
}
