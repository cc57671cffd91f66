use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::services::similarity_search::SimilaritySearchEngine;
use crate::domain::entities::CatalogItem;
use crate::domain::repositories::CatalogRepository;
use crate::domain::value_objects::{EntityKind, FallbackPolicy, KeywordQuery};

/// Score carried by keyword hits. Embedding hits always clear a positive threshold.
pub const KEYWORD_MATCH_SCORE: f32 = 0.0;
pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 50;
const SNIPPET_CHARS: usize = 240;
const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalRequest {
    #[serde(default, alias = "query")]
    pub search: Option<String>,
    #[serde(default, alias = "category_or_path", alias = "category", alias = "path")]
    pub category_or_path: Option<String>,
    #[serde(default, alias = "is_active")]
    pub is_active: Option<bool>,
    #[serde(default, alias = "min_price")]
    pub min_price: Option<f64>,
    #[serde(default, alias = "max_price")]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default, alias = "count_only")]
    pub count_only: bool,
}

impl RetrievalRequest {
    pub fn search(text: &str) -> Self {
        Self {
            search: Some(text.to_string()),
            ..Self::default()
        }
    }

    fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Post-filters shared by the embedding and keyword paths.
    fn accepts(&self, item: &CatalogItem) -> bool {
        if let Some(active) = self.is_active {
            if item.is_active() != active {
                return false;
            }
        }
        if let Some(wanted) = self.category_or_path.as_deref().filter(|c| !c.trim().is_empty()) {
            if !item.matches_category(wanted) {
                return false;
            }
        }
        if self.min_price.is_some() || self.max_price.is_some() {
            let Some(price) = item.price() else {
                return false;
            };
            if self.min_price.is_some_and(|min| price < min) {
                return false;
            }
            if self.max_price.is_some_and(|max| price > max) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Embedding,
    Text,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Embedding,
    Text,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalHit {
    pub item: CatalogItem,
    pub snippet: String,
    pub similarity_score: f32,
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<i32>,
}

impl RetrievalHit {
    fn from_keyword(item: CatalogItem) -> Self {
        Self {
            snippet: item.preview(SNIPPET_CHARS),
            item,
            similarity_score: KEYWORD_MATCH_SCORE,
            source_type: SourceType::Text,
            page_number: None,
        }
    }

    fn to_tool_json(&self) -> Value {
        let mut value = self.item.to_tool_json();
        if let Value::Object(object) = &mut value {
            object.insert("snippet".to_string(), json!(self.snippet));
            object.insert("similarityScore".to_string(), json!(self.similarity_score));
            object.insert("sourceType".to_string(), json!(self.source_type));
            if let Some(page) = self.page_number {
                object.insert("page".to_string(), json!(page));
            }
        }
        value
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResponse {
    pub total: usize,
    pub items: Vec<RetrievalHit>,
    pub search_type: SearchType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<BTreeMap<String, usize>>,
}

impl RetrievalResponse {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            total: 0,
            items: Vec::new(),
            search_type: SearchType::Failed,
            error: Some(message.into()),
            counts: None,
        }
    }

    /// Payload handed to the language model; items sit under the plural kind key.
    pub fn to_tool_payload(&self, kind: EntityKind) -> Value {
        let mut payload = serde_json::Map::new();
        payload.insert("total".to_string(), json!(self.total));
        payload.insert(
            kind.plural().to_string(),
            Value::Array(self.items.iter().map(RetrievalHit::to_tool_json).collect()),
        );
        payload.insert("searchType".to_string(), json!(self.search_type));
        if let Some(error) = &self.error {
            payload.insert("error".to_string(), json!(error));
        }
        if let Some(counts) = &self.counts {
            payload.insert("counts".to_string(), json!(counts));
        }
        Value::Object(payload)
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub stop_words: Arc<HashSet<String>>,
}

#[derive(Debug)]
enum CascadeError {
    Unavailable(String),
    Repository(String),
}

impl std::fmt::Display for CascadeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CascadeError::Unavailable(msg) => write!(f, "{}", msg),
            CascadeError::Repository(msg) => write!(f, "Catalog lookup failed: {}", msg),
        }
    }
}

/// Embedding search first, keyword search second, for one entity kind.
pub struct CascadeSearchController {
    kind: EntityKind,
    policy: FallbackPolicy,
    engine: Arc<SimilaritySearchEngine>,
    catalog_repository: Arc<dyn CatalogRepository>,
    settings: RetrievalSettings,
}

impl CascadeSearchController {
    pub fn new(
        kind: EntityKind,
        engine: Arc<SimilaritySearchEngine>,
        catalog_repository: Arc<dyn CatalogRepository>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            kind,
            policy: kind.fallback_policy(),
            engine,
            catalog_repository,
            settings,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Never fails: every error ends up in the response's `error` field.
    pub async fn execute(&self, request: RetrievalRequest) -> RetrievalResponse {
        match self.collect(&request).await {
            Ok((search_type, hits)) => Self::assemble(&request, search_type, hits),
            Err(e) => {
                tracing::error!("{} retrieval failed: {}", self.kind.plural(), e);
                RetrievalResponse::failed(e.to_string())
            }
        }
    }

    async fn collect(
        &self,
        request: &RetrievalRequest,
    ) -> Result<(SearchType, Vec<RetrievalHit>), CascadeError> {
        let Some(search) = request.search_text() else {
            let items = self
                .catalog_repository
                .list_by_kind(self.kind)
                .await
                .map_err(|e| CascadeError::Repository(e.to_string()))?;
            let hits = items
                .into_iter()
                .filter(|item| request.accepts(item))
                .map(RetrievalHit::from_keyword)
                .collect();
            return Ok((SearchType::Text, hits));
        };

        match self.embedding_hits(search).await {
            Ok(hits) => {
                let hits: Vec<RetrievalHit> =
                    hits.into_iter().filter(|hit| request.accepts(&hit.item)).collect();
                if !hits.is_empty() {
                    return Ok((SearchType::Embedding, hits));
                }
                tracing::debug!(
                    "No embedding hits for {} query '{}', trying keywords",
                    self.kind.plural(),
                    search
                );
            }
            Err(e) => match self.policy {
                FallbackPolicy::FailClosed => {
                    tracing::warn!("{} embedding search failed: {}", self.kind.plural(), e);
                    return Err(CascadeError::Unavailable(format!(
                        "{} search is temporarily unavailable, please try again later",
                        capitalize(self.kind.as_str())
                    )));
                }
                FallbackPolicy::DegradeToKeyword => {
                    tracing::warn!(
                        "{} embedding search failed, degrading to keyword search: {}",
                        self.kind.plural(),
                        e
                    );
                }
            },
        }

        let hits = self
            .keyword_hits(search)
            .await?
            .into_iter()
            .filter(|hit| request.accepts(&hit.item))
            .collect();
        Ok((SearchType::Text, hits))
    }

    /// Best-scoring chunk per parent, in score order.
    async fn embedding_hits(&self, search: &str) -> Result<Vec<RetrievalHit>, CascadeError> {
        let matches = self
            .engine
            .search(self.kind, search, self.settings.top_k)
            .await
            .map_err(|e| CascadeError::Unavailable(e.to_string()))?;

        let mut seen = HashSet::new();
        let best: Vec<_> = matches
            .into_iter()
            .filter(|m| seen.insert(m.chunk.parent_id()))
            .collect();
        if best.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = best.iter().map(|m| m.chunk.parent_id()).collect();
        let mut items: HashMap<Uuid, CatalogItem> = self
            .catalog_repository
            .find_by_ids(self.kind, &ids)
            .await
            .map_err(|e| CascadeError::Unavailable(e.to_string()))?
            .into_iter()
            .map(|item| (item.id(), item))
            .collect();

        Ok(best
            .into_iter()
            .filter_map(|m| {
                let item = items.remove(&m.chunk.parent_id())?;
                Some(RetrievalHit {
                    item,
                    snippet: m.chunk.content().to_string(),
                    similarity_score: m.similarity_score,
                    source_type: SourceType::Embedding,
                    page_number: m.chunk.page_number(),
                })
            })
            .collect())
    }

    async fn keyword_hits(&self, search: &str) -> Result<Vec<RetrievalHit>, CascadeError> {
        let query = KeywordQuery::parse(search, &self.settings.stop_words);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self
            .catalog_repository
            .search_keywords(self.kind, &query)
            .await
            .map_err(|e| CascadeError::Repository(e.to_string()))?;

        Ok(query
            .filter_and_rank(candidates)
            .into_iter()
            .map(RetrievalHit::from_keyword)
            .collect())
    }

    fn assemble(
        request: &RetrievalRequest,
        search_type: SearchType,
        mut hits: Vec<RetrievalHit>,
    ) -> RetrievalResponse {
        let total = hits.len();

        if request.count_only {
            let mut counts = BTreeMap::new();
            for hit in &hits {
                let category = hit.item.category().unwrap_or(UNCATEGORIZED).to_string();
                *counts.entry(category).or_insert(0) += 1;
            }
            return RetrievalResponse {
                total,
                items: Vec::new(),
                search_type,
                error: None,
                counts: Some(counts),
            };
        }

        hits.truncate(request.effective_limit());
        RetrievalResponse {
            total,
            items: hits,
            search_type,
            error: None,
            counts: None,
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::CountingCatalog;
    use super::*;
    use crate::application::services::embedding_service::EmbeddingService;
    use crate::application::services::embedding_service::test_support::ScriptedEmbeddingProvider;
    use crate::application::services::similarity_search::DEFAULT_MIN_SIMILARITY;
    use crate::domain::entities::ContentChunk;
    use crate::domain::repositories::ChunkRepository;
    use crate::domain::value_objects::keyword_query::default_stop_words;
    use crate::infrastructure::memory::InMemoryChunkRepository;

    struct Fixture {
        controller: CascadeSearchController,
        catalog: Arc<CountingCatalog>,
    }

    fn wine_list() -> Vec<CatalogItem> {
        vec![
            CatalogItem::new(
                EntityKind::Product,
                "Rosso Toscano".into(),
                "Dry red wine from Tuscany.".into(),
            )
            .with_category("wine")
            .with_tags(&["chianti", "red"])
            .with_price(18.0),
            CatalogItem::new(
                EntityKind::Product,
                "Barolo Riserva".into(),
                "Aged Nebbiolo.".into(),
            )
            .with_category("wine")
            .with_price(45.0),
            CatalogItem::new(EntityKind::Product, "Olive oil".into(), "Cold pressed.".into())
                .with_category("pantry")
                .with_price(9.5),
            CatalogItem::new(EntityKind::Product, "Old vintage".into(), "Sold out.".into())
                .with_category("wine")
                .with_price(12.0)
                .inactive(),
        ]
    }

    async fn fixture(
        provider: ScriptedEmbeddingProvider,
        items: Vec<CatalogItem>,
        vectors: Vec<Vec<f32>>,
    ) -> Fixture {
        fixture_with(provider, items, vectors, false).await
    }

    async fn fixture_with(
        provider: ScriptedEmbeddingProvider,
        items: Vec<CatalogItem>,
        vectors: Vec<Vec<f32>>,
        failing_lookups: bool,
    ) -> Fixture {
        let chunks = Arc::new(InMemoryChunkRepository::new());
        for (item, vector) in items.iter().zip(vectors) {
            let chunk = ContentChunk::new(
                item.id(),
                item.kind(),
                0,
                item.source_pages().join(" "),
                Some(vector),
                None,
            );
            chunks.replace_for_parent(item.id(), &[chunk]).await.unwrap();
        }

        let kind = items.first().map(|i| i.kind()).unwrap_or(EntityKind::Faq);
        let catalog = CountingCatalog::new(items);
        let catalog = Arc::new(if failing_lookups {
            catalog.with_failing_lookups()
        } else {
            catalog
        });
        let engine = Arc::new(SimilaritySearchEngine::new(
            Arc::new(EmbeddingService::new(Arc::new(provider))),
            chunks,
            DEFAULT_MIN_SIMILARITY,
        ));
        let controller = CascadeSearchController::new(
            kind,
            engine,
            catalog.clone(),
            RetrievalSettings {
                top_k: 5,
                stop_words: Arc::new(default_stop_words()),
            },
        );
        Fixture {
            controller,
            catalog,
        }
    }

    async fn wine_fixture(provider: ScriptedEmbeddingProvider) -> Fixture {
        fixture(
            provider,
            wine_list(),
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.9, 0.1, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.8, 0.0, 0.2],
            ],
        )
        .await
    }

    #[tokio::test]
    async fn test_embedding_hit_skips_keyword_search() {
        let provider = ScriptedEmbeddingProvider::new(3).with("red wine", vec![1.0, 0.0, 0.0]);
        let fixture = wine_fixture(provider).await;

        let response = fixture
            .controller
            .execute(RetrievalRequest::search("red wine"))
            .await;

        assert_eq!(response.search_type, SearchType::Embedding);
        assert_eq!(response.items[0].item.title(), "Rosso Toscano");
        assert!(response.items.iter().all(|h| h.source_type == SourceType::Embedding));
        assert_eq!(fixture.catalog.keyword_calls(), 0);
    }

    #[tokio::test]
    async fn test_keyword_fallback_when_no_embedding_match() {
        // Unscripted queries embed to [0, 0, 1], orthogonal to every stored chunk but one.
        let fixture = wine_fixture(ScriptedEmbeddingProvider::new(3)).await;

        let response = fixture
            .controller
            .execute(RetrievalRequest::search("olive"))
            .await;

        assert_eq!(response.search_type, SearchType::Text);
        assert!(response.total >= 1);
        assert_eq!(response.items[0].item.title(), "Olive oil");
        assert_eq!(response.items[0].similarity_score, KEYWORD_MATCH_SCORE);
        assert_eq!(fixture.catalog.keyword_calls(), 1);
    }

    #[tokio::test]
    async fn test_tag_only_match_is_found() {
        let fixture = wine_fixture(ScriptedEmbeddingProvider::new(3)).await;

        let response = fixture
            .controller
            .execute(RetrievalRequest::search("chianti"))
            .await;

        assert_eq!(response.search_type, SearchType::Text);
        assert_eq!(response.total, 1);
        assert_eq!(response.items[0].item.title(), "Rosso Toscano");
    }

    #[tokio::test]
    async fn test_faq_provider_failure_fails_closed() {
        let faqs = vec![CatalogItem::new(
            EntityKind::Faq,
            "Do you ship abroad?".into(),
            "Within the EU only.".into(),
        )];
        let fixture = fixture(
            ScriptedEmbeddingProvider::failing(3),
            faqs,
            vec![vec![1.0, 0.0, 0.0]],
        )
        .await;

        let response = fixture
            .controller
            .execute(RetrievalRequest::search("shipping"))
            .await;

        assert_eq!(response.search_type, SearchType::Failed);
        assert_eq!(fixture.catalog.keyword_calls(), 0);

        let payload = response.to_tool_payload(EntityKind::Faq);
        assert_eq!(payload["total"], 0);
        assert_eq!(payload["faqs"], json!([]));
        assert!(
            payload["error"]
                .as_str()
                .unwrap()
                .contains("temporarily unavailable")
        );
    }

    #[tokio::test]
    async fn test_product_provider_failure_degrades_to_keywords() {
        let fixture = wine_fixture(ScriptedEmbeddingProvider::failing(3)).await;

        let response = fixture
            .controller
            .execute(RetrievalRequest::search("olive oil"))
            .await;

        assert_eq!(response.search_type, SearchType::Text);
        assert_eq!(response.total, 1);
        assert!(response.error.is_none());
        assert_eq!(fixture.catalog.keyword_calls(), 1);
    }

    #[tokio::test]
    async fn test_document_provider_failure_degrades_to_keywords() {
        let documents = vec![
            CatalogItem::new(
                EntityKind::Document,
                "Returns policy".into(),
                "Unused items can be returned within thirty days.".into(),
            )
            .with_category("policies/returns.pdf"),
            CatalogItem::new(
                EntityKind::Document,
                "Shipping guide".into(),
                "Orders ship within two working days.".into(),
            ),
        ];
        let fixture = fixture(
            ScriptedEmbeddingProvider::failing(3),
            documents,
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
        )
        .await;

        let response = fixture
            .controller
            .execute(RetrievalRequest::search("returned"))
            .await;

        assert_eq!(response.search_type, SearchType::Text);
        assert_eq!(response.total, 1);
        assert_eq!(response.items[0].item.title(), "Returns policy");
        assert!(response.error.is_none());
        assert_eq!(fixture.catalog.keyword_calls(), 1);
    }

    #[tokio::test]
    async fn test_service_provider_failure_fails_closed() {
        let services = vec![
            CatalogItem::new(
                EntityKind::Service,
                "Wine tasting".into(),
                "Guided tasting of six wines.".into(),
            )
            .with_price(35.0),
        ];
        let fixture = fixture(
            ScriptedEmbeddingProvider::failing(3),
            services,
            vec![vec![1.0, 0.0, 0.0]],
        )
        .await;

        let response = fixture
            .controller
            .execute(RetrievalRequest::search("tasting"))
            .await;

        assert_eq!(response.search_type, SearchType::Failed);
        assert!(response.items.is_empty());
        assert_eq!(
            response.error.as_deref(),
            Some("Service search is temporarily unavailable, please try again later")
        );
        assert_eq!(fixture.catalog.keyword_calls(), 0);
    }

    #[tokio::test]
    async fn test_faq_lookup_failure_after_embedding_fails_closed() {
        let faqs = vec![CatalogItem::new(
            EntityKind::Faq,
            "Do you ship abroad?".into(),
            "Within the EU only.".into(),
        )];
        let provider = ScriptedEmbeddingProvider::new(3).with("shipping", vec![1.0, 0.0, 0.0]);
        let fixture = fixture_with(provider, faqs, vec![vec![1.0, 0.0, 0.0]], true).await;

        let response = fixture
            .controller
            .execute(RetrievalRequest::search("shipping"))
            .await;

        assert_eq!(response.search_type, SearchType::Failed);
        assert!(
            response
                .error
                .as_deref()
                .unwrap()
                .contains("temporarily unavailable")
        );
        assert_eq!(fixture.catalog.keyword_calls(), 0);
    }

    #[tokio::test]
    async fn test_product_lookup_failure_after_embedding_degrades() {
        let provider = ScriptedEmbeddingProvider::new(3).with("olive oil", vec![0.0, 1.0, 0.0]);
        let fixture = fixture_with(
            provider,
            wine_list(),
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.9, 0.1, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.8, 0.0, 0.2],
            ],
            true,
        )
        .await;

        let response = fixture
            .controller
            .execute(RetrievalRequest::search("olive oil"))
            .await;

        assert_eq!(response.search_type, SearchType::Text);
        assert_eq!(response.items[0].item.title(), "Olive oil");
        assert_eq!(fixture.catalog.keyword_calls(), 1);
    }

    #[tokio::test]
    async fn test_post_filters_apply_to_listing() {
        let fixture = wine_fixture(ScriptedEmbeddingProvider::new(3)).await;

        let response = fixture
            .controller
            .execute(RetrievalRequest {
                max_price: Some(20.0),
                is_active: Some(true),
                ..RetrievalRequest::default()
            })
            .await;

        let titles: Vec<&str> = response.items.iter().map(|h| h.item.title()).collect();
        assert_eq!(titles, vec!["Rosso Toscano", "Olive oil"]);
        assert_eq!(response.search_type, SearchType::Text);
    }

    #[tokio::test]
    async fn test_post_filters_apply_to_embedding_hits() {
        let provider = ScriptedEmbeddingProvider::new(3).with("red wine", vec![1.0, 0.0, 0.0]);
        let fixture = wine_fixture(provider).await;

        let response = fixture
            .controller
            .execute(RetrievalRequest {
                min_price: Some(20.0),
                ..RetrievalRequest::search("red wine")
            })
            .await;

        assert_eq!(response.search_type, SearchType::Embedding);
        assert_eq!(response.total, 1);
        assert_eq!(response.items[0].item.title(), "Barolo Riserva");
    }

    #[tokio::test]
    async fn test_count_only_groups_by_category() {
        let fixture = wine_fixture(ScriptedEmbeddingProvider::new(3)).await;

        let response = fixture
            .controller
            .execute(RetrievalRequest {
                count_only: true,
                ..RetrievalRequest::default()
            })
            .await;

        let counts = response.counts.unwrap();
        assert_eq!(response.total, 4);
        assert!(response.items.is_empty());
        assert_eq!(counts.get("wine"), Some(&3));
        assert_eq!(counts.get("pantry"), Some(&1));
    }

    #[tokio::test]
    async fn test_limit_truncates_after_total() {
        let fixture = wine_fixture(ScriptedEmbeddingProvider::new(3)).await;

        let response = fixture
            .controller
            .execute(RetrievalRequest {
                category_or_path: Some("wine".to_string()),
                limit: Some(1),
                ..RetrievalRequest::default()
            })
            .await;

        assert_eq!(response.total, 3);
        assert_eq!(response.items.len(), 1);
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: RetrievalRequest = serde_json::from_value(json!({
            "search": "wine",
            "maxPrice": 20,
            "categoryOrPath": "red",
            "countOnly": true
        }))
        .unwrap();

        assert_eq!(request.max_price, Some(20.0));
        assert_eq!(request.category_or_path.as_deref(), Some("red"));
        assert!(request.count_only);
        assert_eq!(request.effective_limit(), DEFAULT_LIMIT);
    }
}
