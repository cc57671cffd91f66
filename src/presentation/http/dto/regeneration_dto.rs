use serde::Serialize;
use uuid::Uuid;

use crate::application::services::embedding_regeneration::RegenerationReport;
use crate::application::use_cases::regenerate_embeddings::RegenerateItemResponse;
use crate::domain::value_objects::EntityKind;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateKindResponseDto {
    pub kind: EntityKind,
    pub count: usize,
    pub chunks: usize,
    pub unembedded: usize,
    pub failed: Vec<Uuid>,
    pub cancelled: bool,
}

impl RegenerateKindResponseDto {
    pub fn new(kind: EntityKind, report: RegenerationReport) -> Self {
        Self {
            kind,
            count: report.count,
            chunks: report.chunks,
            unembedded: report.unembedded,
            failed: report.failed,
            cancelled: report.cancelled,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateItemResponseDto {
    pub parent_id: Uuid,
    pub chunk_count: usize,
    pub unembedded: usize,
}

impl From<RegenerateItemResponse> for RegenerateItemResponseDto {
    fn from(response: RegenerateItemResponse) -> Self {
        Self {
            parent_id: response.parent_id,
            chunk_count: response.chunk_count,
            unembedded: response.unembedded,
        }
    }
}
