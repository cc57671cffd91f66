use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::EntityKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentChunk {
    id: Uuid,
    parent_id: Uuid,
    entity_kind: EntityKind,
    chunk_index: i32,
    content: String,
    embedding: Option<Vec<f32>>,
    page_number: Option<i32>,
    created_at: DateTime<Utc>,
}

impl ContentChunk {
    pub fn new(
        parent_id: Uuid,
        entity_kind: EntityKind,
        chunk_index: i32,
        content: String,
        embedding: Option<Vec<f32>>,
        page_number: Option<i32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id,
            entity_kind,
            chunk_index,
            content,
            embedding,
            page_number,
            created_at: Utc::now(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid,
        parent_id: Uuid,
        entity_kind: EntityKind,
        chunk_index: i32,
        content: String,
        embedding: Option<Vec<f32>>,
        page_number: Option<i32>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            parent_id,
            entity_kind,
            chunk_index,
            content,
            embedding,
            page_number,
            created_at,
        }
    }

    // Getters
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn parent_id(&self) -> Uuid {
        self.parent_id
    }

    pub fn entity_kind(&self) -> EntityKind {
        self.entity_kind
    }

    pub fn chunk_index(&self) -> i32 {
        self.chunk_index
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }

    pub fn page_number(&self) -> Option<i32> {
        self.page_number
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }

    pub fn belongs_to(&self, parent_id: Uuid) -> bool {
        self.parent_id == parent_id
    }
}

/// True when the indices form the sequence 0, 1, .., n-1.
pub fn is_contiguous_sequence(chunks: &[ContentChunk]) -> bool {
    chunks
        .iter()
        .enumerate()
        .all(|(position, chunk)| chunk.chunk_index() == position as i32)
}
