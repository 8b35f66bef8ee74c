//! Document service backed by JSON files in a directory.
//!
//! Parts live in `part-<pk>.json`, transcriptions in
//! `transcriptions-<part>-<layer>.json`. Writes are applied in memory and
//! written back by [`FileStore::save`]. Used by the headless binary and as a
//! test double for the async driver.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use folium_core::{Error, PartId, RemoteError, RemoteId, Result};
use folium_editor::{
    DocumentPart, ImageRef, LayerId, LinePayload, RegionPayload, TranscriptionPayload,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::{Fields, PartApi, RemoteOperation, RemoteRequest, RemoteResponse};
use crate::upload::{UploadApi, UploadFile, UploadReceipt};

#[derive(Debug, Default)]
struct StoreState {
    parts: HashMap<PartId, DocumentPart>,
    /// Page order of the document.
    order: Vec<PartId>,
    transcriptions: HashMap<(PartId, LayerId), Vec<TranscriptionPayload>>,
    next_pk: RemoteId,
    log: Vec<RemoteRequest>,
}

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    state: Mutex<StoreState>,
}

impl FileStore {
    /// Loads every part and transcription file under `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let mut state = StoreState::default();
        let mut max_pk = 0;

        for entry in fs::read_dir(&root)? {
            let path = entry?.path();
            let Some(stem) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
            else {
                continue;
            };
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if stem.starts_with("part-") {
                let part: DocumentPart = read_json(&path)?;
                max_pk = max_pk.max(part.pk);
                for line in &part.lines {
                    max_pk = max_pk.max(line.pk);
                }
                for region in &part.regions {
                    max_pk = max_pk.max(region.pk);
                }
                state.order.push(part.pk);
                state.parts.insert(part.pk, part);
            } else if let Some(rest) = stem.strip_prefix("transcriptions-") {
                let Some((part, layer)) = rest
                    .split_once('-')
                    .and_then(|(p, l)| Some((p.parse().ok()?, l.parse().ok()?)))
                else {
                    tracing::warn!("Ignoring {}", path.display());
                    continue;
                };
                let items: Vec<TranscriptionPayload> = read_json(&path)?;
                for t in &items {
                    max_pk = max_pk.max(t.pk);
                }
                state.transcriptions.insert((part, layer), items);
            }
        }
        state.order.sort_unstable();
        state.next_pk = max_pk + 1;
        tracing::info!("Opened store {} with {} parts", root.display(), state.parts.len());
        Ok(Self {
            root,
            state: Mutex::new(state),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes every part and transcription back to disk.
    pub fn save(&self) -> Result<()> {
        let state = self.state.lock();
        for part in state.parts.values() {
            let path = self.root.join(format!("part-{}.json", part.pk));
            fs::write(path, serde_json::to_string_pretty(part)?)?;
        }
        for ((part, layer), items) in &state.transcriptions {
            let path = self
                .root
                .join(format!("transcriptions-{}-{}.json", part, layer));
            fs::write(path, serde_json::to_string_pretty(items)?)?;
        }
        tracing::debug!("Saved store {}", self.root.display());
        Ok(())
    }

    pub fn part_order(&self) -> Vec<PartId> {
        self.state.lock().order.clone()
    }

    pub fn part(&self, pk: PartId) -> Option<DocumentPart> {
        self.state.lock().parts.get(&pk).cloned()
    }

    /// Every write received so far, oldest first.
    pub fn requests(&self) -> Vec<RemoteRequest> {
        self.state.lock().log.clone()
    }

    fn apply(&self, request: &RemoteRequest) -> std::result::Result<RemoteResponse, RemoteError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.log.push(request.clone());
        match &request.operation {
            RemoteOperation::CreateLine { part, fields } => {
                let pk = state.allocate();
                let mut line = LinePayload {
                    pk,
                    baseline: None,
                    mask: None,
                    region: None,
                    order: 0,
                    typology: None,
                };
                apply_line_fields(&mut line, fields)?;
                state.part_mut(*part)?.lines.push(line);
                Ok(RemoteResponse::created(pk))
            }
            RemoteOperation::UpdateLine { pk, fields } => {
                apply_line_fields(state.line_mut(*pk)?, fields)?;
                Ok(RemoteResponse::ok())
            }
            RemoteOperation::BulkUpdateLines { lines } => {
                for patch in lines {
                    apply_line_fields(state.line_mut(patch.pk)?, &patch.fields)?;
                }
                Ok(RemoteResponse::ok())
            }
            RemoteOperation::DeleteLine { pk } => {
                let part = state.part_of_line(*pk)?;
                state.part_mut(part)?.lines.retain(|l| l.pk != *pk);
                Ok(RemoteResponse::ok())
            }
            RemoteOperation::CreateRegion { part, fields } => {
                let pk = state.allocate();
                let mut region = RegionPayload {
                    pk,
                    outline: Vec::new(),
                    typology: None,
                };
                apply_region_fields(&mut region, fields)?;
                state.part_mut(*part)?.regions.push(region);
                Ok(RemoteResponse::created(pk))
            }
            RemoteOperation::UpdateRegion { pk, fields } => {
                apply_region_fields(state.region_mut(*pk)?, fields)?;
                Ok(RemoteResponse::ok())
            }
            RemoteOperation::DeleteRegion { pk } => {
                let part = state.part_of_region(*pk)?;
                let doc = state.part_mut(part)?;
                doc.regions.retain(|r| r.pk != *pk);
                for line in doc.lines.iter_mut().filter(|l| l.region == Some(*pk)) {
                    line.region = None;
                }
                Ok(RemoteResponse::ok())
            }
            RemoteOperation::MoveLine { pk, index } => {
                let part = state.part_of_line(*pk)?;
                let doc = state.part_mut(part)?;
                let mut ordered: Vec<RemoteId> = {
                    let mut lines: Vec<&LinePayload> = doc.lines.iter().collect();
                    lines.sort_by_key(|l| l.order);
                    lines.iter().map(|l| l.pk).collect()
                };
                ordered.retain(|p| p != pk);
                ordered.insert((*index).min(ordered.len()), *pk);
                for line in doc.lines.iter_mut() {
                    if let Some(position) = ordered.iter().position(|p| *p == line.pk) {
                        line.order = position;
                    }
                }
                Ok(RemoteResponse::ok())
            }
            RemoteOperation::MovePart { pk, index } => {
                let from = state
                    .order
                    .iter()
                    .position(|p| p == pk)
                    .ok_or(RemoteError::NotFound)?;
                let part = state.order.remove(from);
                let to = (*index).min(state.order.len());
                state.order.insert(to, part);
                Ok(RemoteResponse::ok())
            }
            RemoteOperation::SaveTranscription {
                pk,
                line,
                layer,
                content,
            } => {
                let part = state.part_of_line(*line)?;
                let next = state.next_pk;
                let items = state.transcriptions.entry((part, *layer)).or_default();
                match items
                    .iter_mut()
                    .find(|t| Some(t.pk) == *pk || t.line == *line)
                {
                    Some(existing) => {
                        existing.content = content.clone();
                        Ok(RemoteResponse::created(existing.pk))
                    }
                    None => {
                        items.push(TranscriptionPayload {
                            pk: next,
                            line: *line,
                            content: content.clone(),
                            versions: Vec::new(),
                        });
                        state.next_pk += 1;
                        Ok(RemoteResponse::created(next))
                    }
                }
            }
        }
    }
}

impl StoreState {
    fn allocate(&mut self) -> RemoteId {
        let pk = self.next_pk;
        self.next_pk += 1;
        pk
    }

    fn part_mut(&mut self, pk: PartId) -> std::result::Result<&mut DocumentPart, RemoteError> {
        self.parts.get_mut(&pk).ok_or(RemoteError::NotFound)
    }

    fn part_of_line(&self, pk: RemoteId) -> std::result::Result<PartId, RemoteError> {
        self.parts
            .values()
            .find(|p| p.lines.iter().any(|l| l.pk == pk))
            .map(|p| p.pk)
            .ok_or(RemoteError::NotFound)
    }

    fn part_of_region(&self, pk: RemoteId) -> std::result::Result<PartId, RemoteError> {
        self.parts
            .values()
            .find(|p| p.regions.iter().any(|r| r.pk == pk))
            .map(|p| p.pk)
            .ok_or(RemoteError::NotFound)
    }

    fn line_mut(&mut self, pk: RemoteId) -> std::result::Result<&mut LinePayload, RemoteError> {
        self.parts
            .values_mut()
            .flat_map(|p| p.lines.iter_mut())
            .find(|l| l.pk == pk)
            .ok_or(RemoteError::NotFound)
    }

    fn region_mut(&mut self, pk: RemoteId) -> std::result::Result<&mut RegionPayload, RemoteError> {
        self.parts
            .values_mut()
            .flat_map(|p| p.regions.iter_mut())
            .find(|r| r.pk == pk)
            .ok_or(RemoteError::NotFound)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(Error::from)
}

fn field<T: DeserializeOwned>(value: &Value) -> std::result::Result<T, RemoteError> {
    serde_json::from_value(value.clone()).map_err(|e| RemoteError::Status {
        status: 400,
        message: e.to_string(),
    })
}

fn unknown_field(name: &str) -> RemoteError {
    RemoteError::Status {
        status: 400,
        message: format!("unknown field {name}"),
    }
}

fn apply_line_fields(line: &mut LinePayload, fields: &Fields) -> std::result::Result<(), RemoteError> {
    for (name, value) in fields {
        match name.as_str() {
            "baseline" => line.baseline = field(value)?,
            "mask" => line.mask = field(value)?,
            "region" => line.region = field(value)?,
            "order" => line.order = field(value)?,
            "typology" => line.typology = field(value)?,
            other => return Err(unknown_field(other)),
        }
    }
    Ok(())
}

fn apply_region_fields(
    region: &mut RegionPayload,
    fields: &Fields,
) -> std::result::Result<(), RemoteError> {
    for (name, value) in fields {
        match name.as_str() {
            "box" => region.outline = field(value)?,
            "typology" => region.typology = field(value)?,
            other => return Err(unknown_field(other)),
        }
    }
    Ok(())
}

#[async_trait]
impl PartApi for FileStore {
    async fn send(&self, request: &RemoteRequest) -> std::result::Result<RemoteResponse, RemoteError> {
        self.apply(request)
    }

    async fn fetch_part(&self, part: PartId) -> std::result::Result<DocumentPart, RemoteError> {
        let state = self.state.lock();
        let mut doc = state.parts.get(&part).cloned().ok_or(RemoteError::NotFound)?;
        let position = state.order.iter().position(|p| *p == part);
        doc.previous = position
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| state.order.get(i).copied());
        doc.next = position.and_then(|i| state.order.get(i + 1).copied());
        Ok(doc)
    }

    async fn fetch_transcriptions(
        &self,
        part: PartId,
        layer: LayerId,
    ) -> std::result::Result<Vec<TranscriptionPayload>, RemoteError> {
        Ok(self
            .state
            .lock()
            .transcriptions
            .get(&(part, layer))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl UploadApi for FileStore {
    async fn upload(&self, file: &UploadFile, order: u32) -> std::result::Result<UploadReceipt, RemoteError> {
        let images = self.root.join("images");
        let path = images.join(&file.name);
        let bytes = file.bytes.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            fs::create_dir_all(&images)?;
            fs::write(&path, bytes)
        })
        .await
        .map_err(|e| e.to_string())
        .and_then(|written| written.map_err(|e| e.to_string()))
        .map_err(|reason| RemoteError::Network { reason })?;

        let mut state = self.state.lock();
        let pk = state.allocate();
        let uri = format!("images/{}", file.name);
        state.parts.insert(
            pk,
            DocumentPart {
                pk,
                title: file.name.clone(),
                image: ImageRef {
                    uri: uri.clone(),
                    thumbnail_uri: None,
                    width: 0,
                    height: 0,
                },
                regions: Vec::new(),
                lines: Vec::new(),
                previous: None,
                next: None,
            },
        );
        let at = (order as usize).min(state.order.len());
        state.order.insert(at, pk);
        Ok(UploadReceipt {
            pk,
            title: file.name.clone(),
            thumbnail_uri: Some(uri),
            update_uri: format!("parts/{pk}"),
            delete_uri: format!("parts/{pk}/delete"),
        })
    }
}
