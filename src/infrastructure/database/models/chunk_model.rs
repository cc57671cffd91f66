use chrono::{DateTime, Utc};
use diesel::prelude::*;
use pgvector::Vector;
use uuid::Uuid;

use crate::domain::entities::ContentChunk as DomainChunk;
use crate::domain::value_objects::EntityKind;
use crate::infrastructure::database::schema::entity_chunks;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = entity_chunks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EntityChunkModel {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub entity_kind: String,
    pub chunk_index: i32,
    pub content: String,
    pub embedding: Option<Vector>,
    pub page_number: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = entity_chunks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewEntityChunkModel {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub entity_kind: String,
    pub chunk_index: i32,
    pub content: String,
    pub embedding: Option<Vector>,
    pub page_number: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<&DomainChunk> for NewEntityChunkModel {
    fn from(chunk: &DomainChunk) -> Self {
        Self {
            id: chunk.id(),
            parent_id: chunk.parent_id(),
            entity_kind: chunk.entity_kind().as_str().to_string(),
            chunk_index: chunk.chunk_index(),
            content: chunk.content().to_string(),
            embedding: chunk.embedding().map(|values| Vector::from(values.to_vec())),
            page_number: chunk.page_number(),
            created_at: chunk.created_at(),
        }
    }
}

impl TryFrom<EntityChunkModel> for DomainChunk {
    type Error = String;

    fn try_from(model: EntityChunkModel) -> Result<Self, Self::Error> {
        let kind = EntityKind::from_string(&model.entity_kind)?;
        Ok(DomainChunk::restore(
            model.id,
            model.parent_id,
            kind,
            model.chunk_index,
            model.content,
            model.embedding.map(|vector| vector.to_vec()),
            model.page_number,
            model.created_at,
        ))
    }
}
