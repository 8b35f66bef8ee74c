//! Wire representation of a document part and its transcriptions, and
//! loading it into a [`PartModel`].

use std::collections::HashMap;

use folium_core::{LocalId, PartId, Point, RemoteId};
use serde::{Deserialize, Serialize};

use crate::model::{PartModel, Polygon};
use crate::transcription::{LayerId, LineTranscription, TranscriptionVersion};

/// Image of a part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub uri: String,
    #[serde(default)]
    pub thumbnail_uri: Option<String>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPayload {
    pub pk: RemoteId,
    #[serde(rename = "box")]
    pub outline: Vec<Point>,
    #[serde(default)]
    pub typology: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePayload {
    pub pk: RemoteId,
    #[serde(default)]
    pub baseline: Option<Vec<Point>>,
    #[serde(default)]
    pub mask: Option<Vec<Point>>,
    #[serde(default)]
    pub region: Option<RemoteId>,
    #[serde(default)]
    pub order: usize,
    #[serde(default)]
    pub typology: Option<String>,
}

/// One page as served by the document service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPart {
    pub pk: PartId,
    #[serde(default)]
    pub title: String,
    pub image: ImageRef,
    #[serde(default)]
    pub regions: Vec<RegionPayload>,
    #[serde(default)]
    pub lines: Vec<LinePayload>,
    #[serde(default)]
    pub previous: Option<PartId>,
    #[serde(default)]
    pub next: Option<PartId>,
}

/// Transcription of one line in one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionPayload {
    pub pk: RemoteId,
    pub line: RemoteId,
    pub content: String,
    #[serde(default)]
    pub versions: Vec<TranscriptionVersion>,
}

impl DocumentPart {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Builds the model. Lines with neither a usable baseline nor mask are
    /// skipped, and region references to unknown regions are dropped.
    pub fn to_model(&self) -> PartModel {
        let mut model = PartModel::for_part(self.pk);

        let mut regions: HashMap<RemoteId, LocalId> = HashMap::new();
        for payload in &self.regions {
            if payload.outline.len() < 3 {
                tracing::warn!("Skipping region {} with {} points", payload.pk, payload.outline.len());
                continue;
            }
            let id = model.create_region(Polygon::new(payload.outline.clone()));
            if let Some(region) = model.region_mut(id) {
                region.pk = Some(payload.pk);
                region.typology = payload.typology.clone();
            }
            regions.insert(payload.pk, id);
        }

        let mut lines: Vec<&LinePayload> = self.lines.iter().collect();
        lines.sort_by_key(|l| l.order);
        for payload in lines {
            let baseline = payload
                .baseline
                .clone()
                .filter(|b| b.len() >= 2)
                .map(Polygon::new);
            let mask = payload
                .mask
                .clone()
                .filter(|m| m.len() >= 3)
                .map(Polygon::new);
            if baseline.is_none() && mask.is_none() {
                tracing::warn!("Skipping line {} without geometry", payload.pk);
                continue;
            }
            let line = model.new_line();
            line.pk = Some(payload.pk);
            line.baseline = baseline;
            line.mask = mask;
            line.order = payload.order;
            line.typology = payload.typology.clone();
            line.region = payload.region.and_then(|pk| regions.get(&pk).copied());
        }

        tracing::debug!(
            "Part {} loaded: {} lines, {} regions",
            self.pk,
            model.line_count(),
            model.region_count()
        );
        model
    }
}

impl PartModel {
    /// Attaches a layer's transcriptions to the lines they belong to.
    /// Returns how many lines were matched.
    pub fn apply_transcriptions(
        &mut self,
        layer: LayerId,
        transcriptions: &[TranscriptionPayload],
    ) -> usize {
        let mut matched = 0;
        for payload in transcriptions {
            let Some(id) = self.line_by_remote(payload.line) else {
                continue;
            };
            if let Some(line) = self.line_mut(id) {
                line.transcriptions.insert(
                    layer,
                    LineTranscription {
                        pk: Some(payload.pk),
                        content: payload.content.clone(),
                        versions: payload.versions.clone(),
                    },
                );
                matched += 1;
            }
        }
        matched
    }
}
