use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::CatalogItem;
use crate::domain::value_objects::{EntityKind, KeywordQuery};

#[derive(Debug)]
pub enum CatalogRepositoryError {
    NotFound(Uuid),
    DatabaseError(String),
}

impl std::fmt::Display for CatalogRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogRepositoryError::NotFound(id) => write!(f, "Catalog item not found: {}", id),
            CatalogRepositoryError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for CatalogRepositoryError {}

/// Read access to the catalog owned by the CRUD layer.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CatalogItem>, CatalogRepositoryError>;
    async fn find_by_ids(
        &self,
        kind: EntityKind,
        ids: &[Uuid],
    ) -> Result<Vec<CatalogItem>, CatalogRepositoryError>;
    async fn list_by_kind(&self, kind: EntityKind)
    -> Result<Vec<CatalogItem>, CatalogRepositoryError>;
    /// Candidates matching any token in title, body, category or tags. Unranked.
    async fn search_keywords(
        &self,
        kind: EntityKind,
        query: &KeywordQuery,
    ) -> Result<Vec<CatalogItem>, CatalogRepositoryError>;
}
