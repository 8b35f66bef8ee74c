use folium_core::{LocalId, RemoteId};
use serde::{Deserialize, Serialize};

use super::polygon::Polygon;

/// A zone of the page grouping lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub key: LocalId,
    pub pk: Option<RemoteId>,
    pub outline: Polygon,
    pub typology: Option<String>,
}

impl Region {
    pub fn new(key: LocalId, outline: Polygon) -> Self {
        Self {
            key,
            pk: None,
            outline,
            typology: None,
        }
    }

    pub fn contains(&self, point: &folium_core::Point) -> bool {
        self.outline.len() >= 3 && folium_core::geometry::polygon_contains(self.outline.points(), point)
    }
}
