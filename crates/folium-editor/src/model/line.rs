use std::collections::BTreeMap;

use folium_core::{Bounds, LocalId, RemoteId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::polygon::Polygon;
use super::{PolygonKind, PolygonRef};
use crate::transcription::{LayerId, LineTranscription};

/// One text line of the open part.
///
/// A valid line has a baseline, a mask, or both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub key: LocalId,
    /// Service identifier, `None` until the create call resolves.
    pub pk: Option<RemoteId>,
    pub baseline: Option<Polygon>,
    pub mask: Option<Polygon>,
    pub region: Option<LocalId>,
    pub order: usize,
    pub typology: Option<String>,
    #[serde(default)]
    pub transcriptions: BTreeMap<LayerId, LineTranscription>,
}

impl Line {
    pub fn new(key: LocalId, order: usize) -> Self {
        Self {
            key,
            pk: None,
            baseline: None,
            mask: None,
            region: None,
            order,
            typology: None,
            transcriptions: BTreeMap::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.baseline.as_ref().is_some_and(|b| b.len() >= 2)
            || self.mask.as_ref().is_some_and(|m| m.len() >= 3)
    }

    pub fn is_saved(&self) -> bool {
        self.pk.is_some()
    }

    /// Polygons of this line in hit-test priority order.
    pub fn polygons(&self) -> SmallVec<[(PolygonRef, &Polygon); 2]> {
        let mut out = SmallVec::new();
        let key = folium_core::PrimitiveKey::Line(self.key);
        if let Some(baseline) = &self.baseline {
            out.push((PolygonRef::new(key, PolygonKind::Baseline), baseline));
        }
        if let Some(mask) = &self.mask {
            out.push((PolygonRef::new(key, PolygonKind::Mask), mask));
        }
        out
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let baseline = self.baseline.as_ref().and_then(Polygon::bounds);
        let mask = self.mask.as_ref().and_then(Polygon::bounds);
        match (baseline, mask) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        }
    }

    pub fn content(&self, layer: LayerId) -> Option<&str> {
        self.transcriptions
            .get(&layer)
            .map(|t| t.content.as_str())
    }
}
