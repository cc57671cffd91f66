use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::application::services::cascade_search::{
    RetrievalHit, SearchType, SourceType,
};
use crate::application::use_cases::search_catalog::SearchCatalogResponse;
use crate::domain::value_objects::EntityKind;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResponseDto {
    pub kind: EntityKind,
    pub total: usize,
    pub items: Vec<RetrievalItemDto>,
    pub search_type: SearchType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<BTreeMap<String, usize>>,
    pub search_time_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalItemDto {
    pub id: Uuid,
    pub title: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub price: Option<f64>,
    pub is_active: bool,
    pub snippet: String,
    pub similarity_score: f32,
    pub source_type: SourceType,
    pub page_number: Option<i32>,
}

impl From<SearchCatalogResponse> for RetrievalResponseDto {
    fn from(response: SearchCatalogResponse) -> Self {
        let SearchCatalogResponse {
            kind,
            response,
            search_time_ms,
        } = response;

        Self {
            kind,
            total: response.total,
            items: response.items.into_iter().map(RetrievalItemDto::from).collect(),
            search_type: response.search_type,
            error: response.error,
            counts: response.counts,
            search_time_ms,
        }
    }
}

impl From<RetrievalHit> for RetrievalItemDto {
    fn from(hit: RetrievalHit) -> Self {
        Self {
            id: hit.item.id(),
            title: hit.item.title().to_string(),
            category: hit.item.category().map(|c| c.to_string()),
            tags: hit.item.tags().to_vec(),
            price: hit.item.price(),
            is_active: hit.item.is_active(),
            snippet: hit.snippet,
            similarity_score: hit.similarity_score,
            source_type: hit.source_type,
            page_number: hit.page_number,
        }
    }
}
