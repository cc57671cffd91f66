use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::{Array, Bool, Nullable, Text};
use uuid::Uuid;

use crate::domain::entities::CatalogItem;
use crate::domain::repositories::CatalogRepository;
use crate::domain::repositories::catalog_repository::CatalogRepositoryError;
use crate::domain::value_objects::{EntityKind, KeywordQuery};
use crate::infrastructure::database::models::{CatalogItemModel, NewCatalogItemModel};
use crate::infrastructure::database::schema::catalog_items;
use crate::infrastructure::database::schema::catalog_items::dsl::*;
use crate::infrastructure::database::{DbConnection, DbPool, get_connection_from_pool};

diesel::define_sql_function!(fn array_to_string(array: Array<Text>, delimiter: Text) -> Text);
diesel::define_sql_function!(fn coalesce(value: Nullable<Text>, fallback: Text) -> Text);

type KeywordPredicate = Box<dyn BoxableExpression<catalog_items::table, Pg, SqlType = Bool>>;

pub struct PostgresCatalogRepository {
    pool: DbPool,
}

impl PostgresCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts items that are not present yet. Used to seed development databases.
    pub fn seed(&self, items: &[CatalogItem]) -> Result<usize, CatalogRepositoryError> {
        let mut conn = get_connection_from_pool(&self.pool)
            .map_err(|e| CatalogRepositoryError::DatabaseError(e.to_string()))?;

        let rows: Vec<NewCatalogItemModel> = items.iter().map(NewCatalogItemModel::from).collect();
        diesel::insert_into(catalog_items)
            .values(&rows)
            .on_conflict(id)
            .do_nothing()
            .execute(&mut conn)
            .map_err(|e| CatalogRepositoryError::DatabaseError(e.to_string()))
    }

    /// Runs diesel work on the blocking pool so async workers never wait on Postgres.
    async fn run_blocking<T, F>(&self, work: F) -> Result<T, CatalogRepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&mut DbConnection) -> Result<T, diesel::result::Error> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = get_connection_from_pool(&pool)
                .map_err(|e| CatalogRepositoryError::DatabaseError(e.to_string()))?;
            work(&mut conn).map_err(|e| CatalogRepositoryError::DatabaseError(e.to_string()))
        })
        .await
        .map_err(|e| CatalogRepositoryError::DatabaseError(format!("Task join error: {}", e)))?
    }

    fn to_domain(models: Vec<CatalogItemModel>) -> Vec<CatalogItem> {
        models
            .into_iter()
            .filter_map(|model| {
                let item_id = model.id;
                CatalogItem::try_from(model)
                    .map_err(|e| tracing::warn!("Skipping catalog row {}: {}", item_id, e))
                    .ok()
            })
            .collect()
    }

    /// One OR group per token over title, body, category and tags.
    fn keyword_predicate(patterns: Vec<String>) -> Option<KeywordPredicate> {
        patterns
            .into_iter()
            .map(|pattern| -> KeywordPredicate {
                Box::new(
                    title
                        .ilike(pattern.clone())
                        .or(body.ilike(pattern.clone()))
                        .or(coalesce(category, "").ilike(pattern.clone()))
                        .or(array_to_string(tags, " ").ilike(pattern)),
                )
            })
            .reduce(|left, right| Box::new(left.or(right)))
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn find_by_id(&self, item_id: Uuid) -> Result<Option<CatalogItem>, CatalogRepositoryError> {
        let model = self
            .run_blocking(move |conn| {
                catalog_items
                    .find(item_id)
                    .select(CatalogItemModel::as_select())
                    .first(conn)
                    .optional()
            })
            .await?;

        Ok(model.and_then(|m| Self::to_domain(vec![m]).pop()))
    }

    async fn find_by_ids(
        &self,
        kind_param: EntityKind,
        ids: &[Uuid],
    ) -> Result<Vec<CatalogItem>, CatalogRepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = ids.to_vec();
        let models = self
            .run_blocking(move |conn| {
                catalog_items
                    .filter(kind.eq(kind_param.as_str()))
                    .filter(id.eq_any(ids))
                    .select(CatalogItemModel::as_select())
                    .load(conn)
            })
            .await?;

        Ok(Self::to_domain(models))
    }

    async fn list_by_kind(
        &self,
        kind_param: EntityKind,
    ) -> Result<Vec<CatalogItem>, CatalogRepositoryError> {
        let models = self
            .run_blocking(move |conn| {
                catalog_items
                    .filter(kind.eq(kind_param.as_str()))
                    .order((title.asc(), id.asc()))
                    .select(CatalogItemModel::as_select())
                    .load(conn)
            })
            .await?;

        Ok(Self::to_domain(models))
    }

    async fn search_keywords(
        &self,
        kind_param: EntityKind,
        query: &KeywordQuery,
    ) -> Result<Vec<CatalogItem>, CatalogRepositoryError> {
        let patterns = query.like_patterns();
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let models = self
            .run_blocking(move |conn| {
                let Some(predicate) = Self::keyword_predicate(patterns) else {
                    return Ok(Vec::new());
                };
                catalog_items
                    .filter(kind.eq(kind_param.as_str()))
                    .filter(predicate)
                    .order((title.asc(), id.asc()))
                    .select(CatalogItemModel::as_select())
                    .load(conn)
            })
            .await?;

        Ok(Self::to_domain(models))
    }
}
