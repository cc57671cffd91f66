use async_trait::async_trait;
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::entities::ContentChunk;
use crate::domain::repositories::ChunkRepository;
use crate::domain::repositories::chunk_repository::{ChunkRepositoryError, validate_replacement};
use crate::domain::value_objects::EntityKind;
use crate::infrastructure::database::models::{EntityChunkModel, NewEntityChunkModel};
use crate::infrastructure::database::schema::entity_chunks::dsl::*;
use crate::infrastructure::database::{DbConnection, DbPool, get_connection_from_pool};

pub struct PostgresChunkRepository {
    pool: DbPool,
}

impl PostgresChunkRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Runs diesel work on the blocking pool so async workers never wait on Postgres.
    async fn run_blocking<T, F>(&self, work: F) -> Result<T, ChunkRepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&mut DbConnection) -> Result<T, diesel::result::Error> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = get_connection_from_pool(&pool)
                .map_err(|e| ChunkRepositoryError::DatabaseError(e.to_string()))?;
            work(&mut conn).map_err(|e| ChunkRepositoryError::DatabaseError(e.to_string()))
        })
        .await
        .map_err(|e| ChunkRepositoryError::DatabaseError(format!("Task join error: {}", e)))?
    }

    fn to_domain(models: Vec<EntityChunkModel>) -> Vec<ContentChunk> {
        models
            .into_iter()
            .filter_map(|model| {
                let chunk_id = model.id;
                ContentChunk::try_from(model)
                    .map_err(|e| tracing::warn!("Skipping chunk {}: {}", chunk_id, e))
                    .ok()
            })
            .collect()
    }
}

#[async_trait]
impl ChunkRepository for PostgresChunkRepository {
    async fn replace_for_parent(
        &self,
        parent: Uuid,
        chunks: &[ContentChunk],
    ) -> Result<usize, ChunkRepositoryError> {
        validate_replacement(parent, chunks)?;

        let rows: Vec<NewEntityChunkModel> = chunks.iter().map(NewEntityChunkModel::from).collect();

        self.run_blocking(move |conn| {
            conn.transaction::<usize, diesel::result::Error, _>(|conn| {
                let removed =
                    diesel::delete(entity_chunks.filter(parent_id.eq(parent))).execute(conn)?;
                tracing::debug!("Removed {} stale chunks of {}", removed, parent);

                if rows.is_empty() {
                    return Ok(0);
                }
                diesel::insert_into(entity_chunks).values(&rows).execute(conn)
            })
        })
        .await
    }

    async fn find_by_parent(&self, parent: Uuid) -> Result<Vec<ContentChunk>, ChunkRepositoryError> {
        let models = self
            .run_blocking(move |conn| {
                entity_chunks
                    .filter(parent_id.eq(parent))
                    .order(chunk_index.asc())
                    .select(EntityChunkModel::as_select())
                    .load(conn)
            })
            .await?;

        Ok(Self::to_domain(models))
    }

    async fn find_embedded_by_kind(
        &self,
        kind: EntityKind,
    ) -> Result<Vec<ContentChunk>, ChunkRepositoryError> {
        let models = self
            .run_blocking(move |conn| {
                entity_chunks
                    .filter(entity_kind.eq(kind.as_str()))
                    .filter(embedding.is_not_null())
                    .order((parent_id.asc(), chunk_index.asc()))
                    .select(EntityChunkModel::as_select())
                    .load(conn)
            })
            .await?;

        Ok(Self::to_domain(models))
    }

    async fn count_by_parent(&self, parent: Uuid) -> Result<i64, ChunkRepositoryError> {
        self.run_blocking(move |conn| {
            entity_chunks
                .filter(parent_id.eq(parent))
                .count()
                .get_result(conn)
        })
        .await
    }

    async fn count_by_kind(&self, kind: EntityKind) -> Result<i64, ChunkRepositoryError> {
        self.run_blocking(move |conn| {
            entity_chunks
                .filter(entity_kind.eq(kind.as_str()))
                .count()
                .get_result(conn)
        })
        .await
    }
}
