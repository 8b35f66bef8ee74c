//! Typed command channel from the editor to its host.
//!
//! Every mutation of persisted data leaves the editor as one
//! [`EditorCommand`] on an unbounded tokio channel, in the order the user
//! performed it. Updates carry both the new values and the values they
//! replaced so the receiver can roll back individual fields.

use std::fmt;

use folium_core::{LocalId, PartId, PrimitiveKey, RemoteId};
use tokio::sync::mpsc;

use crate::model::{Line, PartModel, Polygon, PolygonKind, PolygonRef, Region};
use crate::transcription::{LayerId, LineTranscription};

pub type CommandSender = mpsc::UnboundedSender<EditorCommand>;
pub type CommandReceiver = mpsc::UnboundedReceiver<EditorCommand>;

/// Creates the editor-to-host command channel.
pub fn command_channel() -> (CommandSender, CommandReceiver) {
    mpsc::unbounded_channel()
}

/// A persisted attribute of a line or region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Baseline,
    Mask,
    Region,
    Order,
    Outline,
    Typology,
    Content(LayerId),
}

impl Field {
    pub fn for_polygon(kind: PolygonKind) -> Self {
        match kind {
            PolygonKind::Baseline => Field::Baseline,
            PolygonKind::Mask => Field::Mask,
            PolygonKind::Outline => Field::Outline,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Baseline => write!(f, "baseline"),
            Field::Mask => write!(f, "mask"),
            Field::Region => write!(f, "region"),
            Field::Order => write!(f, "order"),
            Field::Outline => write!(f, "box"),
            Field::Typology => write!(f, "typology"),
            Field::Content(layer) => write!(f, "content[{}]", layer),
        }
    }
}

/// Value of one [`Field`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Baseline(Option<Polygon>),
    Mask(Option<Polygon>),
    Region(Option<LocalId>),
    Order(usize),
    Outline(Polygon),
    Typology(Option<String>),
    Content { layer: LayerId, content: String },
}

impl FieldValue {
    pub fn field(&self) -> Field {
        match self {
            FieldValue::Baseline(_) => Field::Baseline,
            FieldValue::Mask(_) => Field::Mask,
            FieldValue::Region(_) => Field::Region,
            FieldValue::Order(_) => Field::Order,
            FieldValue::Outline(_) => Field::Outline,
            FieldValue::Typology(_) => Field::Typology,
            FieldValue::Content { layer, .. } => Field::Content(*layer),
        }
    }

    /// Current value of `field` on a primitive.
    pub fn read(model: &PartModel, key: PrimitiveKey, field: Field) -> Option<FieldValue> {
        match key {
            PrimitiveKey::Line(id) => {
                let line = model.line(id)?;
                Some(match field {
                    Field::Baseline => FieldValue::Baseline(line.baseline.clone()),
                    Field::Mask => FieldValue::Mask(line.mask.clone()),
                    Field::Region => FieldValue::Region(line.region),
                    Field::Order => FieldValue::Order(line.order),
                    Field::Typology => FieldValue::Typology(line.typology.clone()),
                    Field::Content(layer) => FieldValue::Content {
                        layer,
                        content: line.content(layer).unwrap_or_default().to_string(),
                    },
                    Field::Outline => return None,
                })
            }
            PrimitiveKey::Region(id) => {
                let region = model.region(id)?;
                match field {
                    Field::Outline => Some(FieldValue::Outline(region.outline.clone())),
                    Field::Typology => Some(FieldValue::Typology(region.typology.clone())),
                    _ => None,
                }
            }
        }
    }

    /// Writes this value onto a primitive. Returns false when the primitive
    /// is gone or does not carry the field.
    pub fn apply(&self, model: &mut PartModel, key: PrimitiveKey) -> bool {
        match (key, self) {
            (PrimitiveKey::Line(id), FieldValue::Baseline(value)) => {
                model.set_polygon(&PolygonRef::baseline(id), value.clone())
            }
            (PrimitiveKey::Line(id), FieldValue::Mask(value)) => {
                model.set_polygon(&PolygonRef::mask(id), value.clone())
            }
            (PrimitiveKey::Line(id), FieldValue::Region(region)) => {
                model.assign_region(id, *region).is_some()
            }
            (PrimitiveKey::Line(id), FieldValue::Order(order)) => {
                model.move_line(id, *order).is_some()
            }
            (PrimitiveKey::Line(id), FieldValue::Typology(typology)) => match model.line_mut(id) {
                Some(line) => {
                    line.typology = typology.clone();
                    true
                }
                None => false,
            },
            (PrimitiveKey::Line(id), FieldValue::Content { layer, content }) => {
                match model.line_mut(id) {
                    Some(line) => {
                        line.transcriptions
                            .entry(*layer)
                            .or_insert_with(LineTranscription::default)
                            .content = content.clone();
                        true
                    }
                    None => false,
                }
            }
            (PrimitiveKey::Region(id), FieldValue::Outline(outline)) => {
                model.set_polygon(&PolygonRef::outline(id), Some(outline.clone()))
            }
            (PrimitiveKey::Region(id), FieldValue::Typology(typology)) => {
                match model.region_mut(id) {
                    Some(region) => {
                        region.typology = typology.clone();
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }
}

/// A field that changed, with the value it replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub previous: FieldValue,
    pub current: FieldValue,
}

impl FieldChange {
    pub fn new(previous: FieldValue, current: FieldValue) -> Self {
        Self { previous, current }
    }

    pub fn field(&self) -> Field {
        self.current.field()
    }

    /// Change of one polygon, or `None` when nothing changed.
    pub fn polygon(
        kind: PolygonKind,
        previous: Option<Polygon>,
        current: Option<Polygon>,
    ) -> Option<Self> {
        if previous == current {
            return None;
        }
        let wrap = |value: Option<Polygon>| match kind {
            PolygonKind::Baseline => Some(FieldValue::Baseline(value)),
            PolygonKind::Mask => Some(FieldValue::Mask(value)),
            PolygonKind::Outline => value.map(FieldValue::Outline),
        };
        Some(Self::new(wrap(previous)?, wrap(current)?))
    }
}

/// Partial update of one primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveUpdate {
    pub key: LocalId,
    /// Service id at emission time; `None` while the create is pending.
    pub pk: Option<RemoteId>,
    pub changes: Vec<FieldChange>,
}

impl PrimitiveUpdate {
    pub fn fields(&self) -> Vec<Field> {
        self.changes.iter().map(FieldChange::field).collect()
    }
}

/// Everything the editor asks its host to persist.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    CreateLine {
        key: LocalId,
        baseline: Option<Polygon>,
        mask: Option<Polygon>,
        region: Option<LocalId>,
        order: usize,
    },
    UpdateLine(PrimitiveUpdate),
    BulkUpdateLines(Vec<PrimitiveUpdate>),
    DeleteLine {
        key: LocalId,
        pk: Option<RemoteId>,
        snapshot: Line,
    },
    CreateRegion {
        key: LocalId,
        outline: Polygon,
        typology: Option<String>,
    },
    UpdateRegion(PrimitiveUpdate),
    DeleteRegion {
        key: LocalId,
        pk: Option<RemoteId>,
        snapshot: Region,
        detached: Vec<LocalId>,
    },
    MoveLine {
        key: LocalId,
        pk: Option<RemoteId>,
        from: usize,
        to: usize,
    },
    MovePart {
        part: PartId,
        from: usize,
        to: usize,
    },
    SaveTranscription {
        line: LocalId,
        layer: LayerId,
        previous: String,
        content: String,
    },
}

impl EditorCommand {
    pub fn name(&self) -> &'static str {
        match self {
            EditorCommand::CreateLine { .. } => "createLine",
            EditorCommand::UpdateLine(_) => "updateLine",
            EditorCommand::BulkUpdateLines(_) => "bulkUpdateLines",
            EditorCommand::DeleteLine { .. } => "deleteLine",
            EditorCommand::CreateRegion { .. } => "createRegion",
            EditorCommand::UpdateRegion(_) => "updateRegion",
            EditorCommand::DeleteRegion { .. } => "deleteRegion",
            EditorCommand::MoveLine { .. } => "moveLine",
            EditorCommand::MovePart { .. } => "movePart",
            EditorCommand::SaveTranscription { .. } => "saveTranscription",
        }
    }

    /// Primitive the command is about, if it concerns a single one.
    pub fn key(&self) -> Option<PrimitiveKey> {
        match self {
            EditorCommand::CreateLine { key, .. }
            | EditorCommand::DeleteLine { key, .. }
            | EditorCommand::MoveLine { key, .. } => Some(PrimitiveKey::Line(*key)),
            EditorCommand::UpdateLine(update) => Some(PrimitiveKey::Line(update.key)),
            EditorCommand::SaveTranscription { line, .. } => Some(PrimitiveKey::Line(*line)),
            EditorCommand::CreateRegion { key, .. } | EditorCommand::DeleteRegion { key, .. } => {
                Some(PrimitiveKey::Region(*key))
            }
            EditorCommand::UpdateRegion(update) => Some(PrimitiveKey::Region(update.key)),
            EditorCommand::BulkUpdateLines(_) | EditorCommand::MovePart { .. } => None,
        }
    }
}
