//! Remote document service interface.

use async_trait::async_trait;
use folium_core::{PartId, RemoteError, RemoteId};
use folium_editor::{DocumentPart, LayerId, TranscriptionPayload};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Adapter-local identifier of a remote call.
pub type RequestId = u64;

/// Field values of a partial update, keyed by their wire names.
pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePatch {
    pub pk: RemoteId,
    pub fields: Fields,
}

/// A write to the document service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RemoteOperation {
    CreateLine { part: PartId, fields: Fields },
    UpdateLine { pk: RemoteId, fields: Fields },
    BulkUpdateLines { lines: Vec<LinePatch> },
    DeleteLine { pk: RemoteId },
    CreateRegion { part: PartId, fields: Fields },
    UpdateRegion { pk: RemoteId, fields: Fields },
    DeleteRegion { pk: RemoteId },
    MoveLine { pk: RemoteId, index: usize },
    MovePart { pk: PartId, index: usize },
    SaveTranscription {
        pk: Option<RemoteId>,
        line: RemoteId,
        layer: LayerId,
        content: String,
    },
}

impl RemoteOperation {
    pub fn name(&self) -> &'static str {
        match self {
            RemoteOperation::CreateLine { .. } => "create_line",
            RemoteOperation::UpdateLine { .. } => "update_line",
            RemoteOperation::BulkUpdateLines { .. } => "bulk_update_lines",
            RemoteOperation::DeleteLine { .. } => "delete_line",
            RemoteOperation::CreateRegion { .. } => "create_region",
            RemoteOperation::UpdateRegion { .. } => "update_region",
            RemoteOperation::DeleteRegion { .. } => "delete_region",
            RemoteOperation::MoveLine { .. } => "move_line",
            RemoteOperation::MovePart { .. } => "move_part",
            RemoteOperation::SaveTranscription { .. } => "save_transcription",
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(
            self,
            RemoteOperation::CreateLine { .. } | RemoteOperation::CreateRegion { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub id: RequestId,
    pub operation: RemoteOperation,
}

/// Successful answer. Creates and first transcription saves carry the id
/// the service assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoteResponse {
    #[serde(default)]
    pub pk: Option<RemoteId>,
}

impl RemoteResponse {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn created(pk: RemoteId) -> Self {
        Self { pk: Some(pk) }
    }
}

/// Document-part data source and write endpoint.
#[async_trait]
pub trait PartApi: Send + Sync {
    /// Performs one write.
    async fn send(&self, request: &RemoteRequest) -> Result<RemoteResponse, RemoteError>;

    /// Image references, geometry and navigation of one part.
    async fn fetch_part(&self, part: PartId) -> Result<DocumentPart, RemoteError>;

    /// Line transcriptions of a part in one layer.
    async fn fetch_transcriptions(
        &self,
        part: PartId,
        layer: LayerId,
    ) -> Result<Vec<TranscriptionPayload>, RemoteError>;
}
