use async_trait::async_trait;
use std::path::Path;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::CatalogItem;
use crate::domain::repositories::CatalogRepository;
use crate::domain::repositories::catalog_repository::CatalogRepositoryError;
use crate::domain::value_objects::{EntityKind, KeywordQuery};

/// Catalog held in memory, optionally seeded from a JSON array of items.
#[derive(Default)]
pub struct InMemoryCatalogRepository {
    items: RwLock<Vec<CatalogItem>>,
}

impl InMemoryCatalogRepository {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    pub async fn from_seed_file(path: &Path) -> Result<Self, CatalogRepositoryError> {
        Ok(Self::new(load_seed_items(path).await?))
    }
}

/// Reads a JSON array of catalog items, as used to seed either backend.
pub async fn load_seed_items(path: &Path) -> Result<Vec<CatalogItem>, CatalogRepositoryError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        CatalogRepositoryError::DatabaseError(format!(
            "Failed to read catalog seed {}: {}",
            path.display(),
            e
        ))
    })?;

    let items: Vec<CatalogItem> = serde_json::from_str(&raw).map_err(|e| {
        CatalogRepositoryError::DatabaseError(format!(
            "Failed to parse catalog seed {}: {}",
            path.display(),
            e
        ))
    })?;

    tracing::info!("Loaded {} catalog items from {}", items.len(), path.display());
    Ok(items)
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CatalogItem>, CatalogRepositoryError> {
        let items = self.items.read().await;
        Ok(items.iter().find(|item| item.id() == id).cloned())
    }

    async fn find_by_ids(
        &self,
        kind: EntityKind,
        ids: &[Uuid],
    ) -> Result<Vec<CatalogItem>, CatalogRepositoryError> {
        let items = self.items.read().await;
        Ok(items
            .iter()
            .filter(|item| item.kind() == kind && ids.contains(&item.id()))
            .cloned()
            .collect())
    }

    async fn list_by_kind(
        &self,
        kind: EntityKind,
    ) -> Result<Vec<CatalogItem>, CatalogRepositoryError> {
        let items = self.items.read().await;
        Ok(items.iter().filter(|item| item.kind() == kind).cloned().collect())
    }

    async fn search_keywords(
        &self,
        kind: EntityKind,
        query: &KeywordQuery,
    ) -> Result<Vec<CatalogItem>, CatalogRepositoryError> {
        let items = self.items.read().await;
        Ok(items
            .iter()
            .filter(|item| item.kind() == kind && query.rank(item).is_some())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::keyword_query::default_stop_words;

    #[tokio::test]
    async fn test_keyword_search_is_scoped_to_kind() {
        let repository = InMemoryCatalogRepository::new(vec![
            CatalogItem::new(EntityKind::Product, "Olive oil".into(), "Cold pressed".into()),
            CatalogItem::new(EntityKind::Faq, "Is the oil organic?".into(), "Yes".into()),
        ]);

        let query = KeywordQuery::parse("oil", &default_stop_words());
        let products = repository
            .search_keywords(EntityKind::Product, &query)
            .await
            .unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].title(), "Olive oil");
    }

    #[tokio::test]
    async fn test_seed_file_is_parsed() {
        let path = std::env::temp_dir().join(format!("catalog-seed-{}.json", Uuid::new_v4()));
        let seed = serde_json::json!([
            {
                "id": Uuid::new_v4(),
                "kind": "product",
                "title": "Chianti Classico",
                "body": "Tuscan red",
                "category": "wine",
                "tags": ["red"],
                "price": 18.5
            }
        ]);
        tokio::fs::write(&path, seed.to_string()).await.unwrap();

        let repository = InMemoryCatalogRepository::from_seed_file(&path).await.unwrap();
        let products = repository.list_by_kind(EntityKind::Product).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].price(), Some(18.5));
        assert!(products[0].is_active());

        let _ = tokio::fs::remove_file(&path).await;
    }
}
