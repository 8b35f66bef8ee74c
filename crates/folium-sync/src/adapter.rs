//! Synchronization adapter.
//!
//! Turns editor commands into remote requests and applies their outcomes
//! back to the model. The adapter performs no I/O itself: [`SyncAdapter::handle`]
//! returns the requests to send and [`SyncAdapter::complete`] consumes their
//! results, so the ordering rules can be exercised without a runtime.
//!
//! Rules:
//! - a command touching a primitive whose create is still in flight, or
//!   itself parked, is parked and replayed once the create resolves;
//! - one update per primitive is in flight at a time; later edits wait in a
//!   queued slot, merged per field, and supersede the in-flight one;
//! - one reorder per line or page is in flight at a time; only the latest
//!   target waits behind it;
//! - a failed update restores only the fields it changed;
//! - a failed create removes the primitive, a failed delete restores the
//!   removed snapshot, a failed reorder moves the item back;
//! - responses for primitives that left the model are discarded.

use std::collections::HashMap;

use folium_core::{Alert, LocalId, PartId, PrimitiveKey, RemoteError, RemoteId, SyncEvent};
use folium_editor::{
    EditorCommand, Field, FieldChange, FieldValue, LayerId, PartCards, PartModel,
    Polygon, PrimitiveUpdate, Removed,
};
use serde_json::{json, Value};

use crate::api::{Fields, LinePatch, RemoteOperation, RemoteRequest, RemoteResponse, RequestId};

/// State the adapter reconciles with the service.
pub trait SyncTarget {
    fn model(&mut self) -> &mut PartModel;
    fn cards(&mut self) -> &mut PartCards;
}

/// Borrowed model and card list of a session.
pub struct SyncScope<'a> {
    pub model: &'a mut PartModel,
    pub cards: &'a mut PartCards,
}

impl SyncTarget for SyncScope<'_> {
    fn model(&mut self) -> &mut PartModel {
        self.model
    }

    fn cards(&mut self) -> &mut PartCards {
        self.cards
    }
}

/// Result of applying one response.
#[derive(Debug, Default)]
pub struct Completion {
    /// Requests released by this response (replayed or queued edits).
    pub requests: Vec<RemoteRequest>,
    pub events: Vec<SyncEvent>,
    /// Single user-facing message for a failure.
    pub alert: Option<Alert>,
}

#[derive(Debug, Clone)]
enum Pending {
    Create {
        key: PrimitiveKey,
    },
    Update {
        updates: Vec<(PrimitiveKey, Vec<FieldChange>)>,
    },
    Delete {
        removed: Removed,
    },
    MoveLine {
        key: LocalId,
        from: usize,
        to: usize,
    },
    MovePart {
        part: PartId,
        from: usize,
        to: usize,
    },
    Transcription {
        line: LocalId,
        layer: LayerId,
        previous: String,
        content: String,
    },
}

/// Item whose position a reorder request changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Reorder {
    Line(LocalId),
    Part(PartId),
}

#[derive(Debug, Default)]
pub struct SyncAdapter {
    next_request: RequestId,
    in_flight: HashMap<RequestId, Pending>,
    /// Primitives whose create is in flight.
    creating: HashMap<PrimitiveKey, RequestId>,
    /// Commands waiting for a create to resolve.
    parked: HashMap<PrimitiveKey, Vec<EditorCommand>>,
    /// Primitives whose own create is parked, with the key it waits for.
    waiting: HashMap<PrimitiveKey, PrimitiveKey>,
    /// Primitives with an update in flight.
    updating: HashMap<PrimitiveKey, RequestId>,
    /// Edits waiting for the in-flight update of their primitive.
    queued: HashMap<PrimitiveKey, Vec<FieldChange>>,
    /// Items with a reorder in flight.
    moving: HashMap<Reorder, RequestId>,
    /// Latest target of a reorder waiting behind the one in flight.
    queued_moves: HashMap<Reorder, usize>,
    /// Last value the service acknowledged, per field.
    confirmed: HashMap<(PrimitiveKey, Field), FieldValue>,
    /// Ids assigned to primitives, kept after they leave the model so
    /// parked deletes can still be sent.
    resolved: HashMap<PrimitiveKey, RemoteId>,
}

impl SyncAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
            && self.parked.is_empty()
            && self.queued.is_empty()
            && self.queued_moves.is_empty()
    }

    /// Whether the primitive has no remote id yet because its create is in
    /// flight or parked.
    pub fn is_creating(&self, key: PrimitiveKey) -> bool {
        self.creating.contains_key(&key) || self.waiting.contains_key(&key)
    }

    /// Primitive an in-flight request is about, if it concerns a single one.
    pub fn request_key(&self, request: RequestId) -> Option<PrimitiveKey> {
        match self.in_flight.get(&request)? {
            Pending::Create { key } => Some(*key),
            Pending::Update { updates } => match updates.as_slice() {
                [(key, _)] => Some(*key),
                _ => None,
            },
            Pending::Delete { removed } => Some(removed_key(removed)),
            Pending::MoveLine { key, .. } | Pending::Transcription { line: key, .. } => {
                Some(PrimitiveKey::Line(*key))
            }
            Pending::MovePart { .. } => None,
        }
    }

    /// Translates a command into the requests to send now. Commands that
    /// depend on an unresolved create are held back.
    pub fn handle(
        &mut self,
        command: EditorCommand,
        target: &mut dyn SyncTarget,
    ) -> Vec<RemoteRequest> {
        let command = match command {
            EditorCommand::BulkUpdateLines(updates) => return self.handle_bulk(updates, target),
            other => other,
        };
        if matches!(
            command,
            EditorCommand::DeleteLine { .. } | EditorCommand::DeleteRegion { .. }
        ) {
            if let Some(key) = command.key() {
                if self.cancel_parked_create(key) {
                    return Vec::new();
                }
            }
        }
        if let Some(blocker) = self.blocker(&command) {
            tracing::debug!("Parking {} until {} is persisted", command.name(), blocker);
            if is_create(&command) {
                if let Some(key) = command.key() {
                    self.waiting.insert(key, blocker);
                }
            }
            self.parked.entry(blocker).or_default().push(command);
            return Vec::new();
        }

        let model = target.model();
        match command {
            EditorCommand::CreateLine {
                key,
                baseline,
                mask,
                region,
                order,
            } => {
                let mut fields = Fields::new();
                fields.insert("baseline".into(), json!(baseline));
                fields.insert("mask".into(), json!(mask));
                fields.insert("region".into(), self.region_pk(region, model));
                fields.insert("order".into(), json!(order));
                self.create(PrimitiveKey::Line(key), fields, model)
            }
            EditorCommand::CreateRegion {
                key,
                outline,
                typology,
            } => {
                let mut fields = Fields::new();
                fields.insert("box".into(), json!(outline));
                fields.insert("typology".into(), json!(typology));
                self.create(PrimitiveKey::Region(key), fields, model)
            }
            EditorCommand::UpdateLine(update) => {
                self.update(vec![(PrimitiveKey::Line(update.key), update.changes)], model)
            }
            EditorCommand::UpdateRegion(update) => {
                self.update(vec![(PrimitiveKey::Region(update.key), update.changes)], model)
            }
            EditorCommand::BulkUpdateLines(_) => Vec::new(),
            EditorCommand::DeleteLine { key, pk, snapshot } => {
                let key = PrimitiveKey::Line(key);
                self.delete(key, pk, Removed::Line(snapshot), model)
            }
            EditorCommand::DeleteRegion {
                key,
                pk,
                snapshot,
                detached,
            } => {
                let key = PrimitiveKey::Region(key);
                let removed = Removed::Region {
                    region: snapshot,
                    detached,
                };
                self.delete(key, pk, removed, model)
            }
            EditorCommand::MoveLine { key, pk, from, to } => {
                let Some(pk) = pk.or_else(|| self.pk_of(PrimitiveKey::Line(key), model)) else {
                    tracing::debug!("Line {} has no remote id, order stays local", key.0);
                    return Vec::new();
                };
                self.reorder(
                    Reorder::Line(key),
                    to,
                    RemoteOperation::MoveLine { pk, index: to },
                    Pending::MoveLine { key, from, to },
                )
            }
            EditorCommand::MovePart { part, from, to } => self.reorder(
                Reorder::Part(part),
                to,
                RemoteOperation::MovePart {
                    pk: part,
                    index: to,
                },
                Pending::MovePart { part, from, to },
            ),
            EditorCommand::SaveTranscription {
                line,
                layer,
                previous,
                content,
            } => {
                let Some(line_pk) = self.pk_of(PrimitiveKey::Line(line), model) else {
                    tracing::debug!("Line {} has no remote id, transcription dropped", line.0);
                    return Vec::new();
                };
                let pk = model
                    .line(line)
                    .and_then(|l| l.transcriptions.get(&layer))
                    .and_then(|t| t.pk);
                vec![self.issue(
                    RemoteOperation::SaveTranscription {
                        pk,
                        line: line_pk,
                        layer,
                        content: content.clone(),
                    },
                    Pending::Transcription {
                        line,
                        layer,
                        previous,
                        content,
                    },
                )]
            }
        }
    }

    /// Applies the outcome of a request.
    pub fn complete(
        &mut self,
        request: RequestId,
        result: Result<RemoteResponse, RemoteError>,
        target: &mut dyn SyncTarget,
    ) -> Completion {
        let Some(pending) = self.in_flight.remove(&request) else {
            tracing::warn!("Response for unknown request {}", request);
            return Completion::default();
        };
        match result {
            Ok(response) => self.succeeded(request, pending, response, target),
            Err(error) => self.failed(request, pending, error, target),
        }
    }

    fn succeeded(
        &mut self,
        request: RequestId,
        pending: Pending,
        response: RemoteResponse,
        target: &mut dyn SyncTarget,
    ) -> Completion {
        let mut done = Completion::default();
        match pending {
            Pending::Create { key } => {
                let Some(pk) = response.pk else {
                    let error = RemoteError::MalformedResponse {
                        reason: "create answered without an id".to_string(),
                    };
                    return self.failed(request, Pending::Create { key }, error, target);
                };
                done.events.push(SyncEvent::RequestSucceeded { request });
                self.creating.remove(&key);
                self.resolved.insert(key, pk);
                if target.model().set_remote_id(key, pk) {
                    tracing::info!("{} persisted as {}", key, pk);
                    done.events.push(SyncEvent::Persisted { key, remote_id: pk });
                } else {
                    done.events.push(SyncEvent::StaleResponseDiscarded { request });
                }
                for command in self.parked.remove(&key).unwrap_or_default() {
                    let requests = self.handle(command, target);
                    done.requests.extend(requests);
                }
            }
            Pending::Update { updates } => {
                done.events.push(SyncEvent::RequestSucceeded { request });
                for (key, changes) in updates {
                    self.release_update(key, request);
                    if !target.model().contains(key) {
                        done.events.push(SyncEvent::StaleResponseDiscarded { request });
                    }
                    for change in changes {
                        self.confirmed.insert((key, change.field()), change.current);
                    }
                    let requests = self.flush_queued(key, target.model());
                    done.requests.extend(requests);
                }
            }
            Pending::Delete { removed } => {
                done.events.push(SyncEvent::RequestSucceeded { request });
                self.forget(removed_key(&removed));
            }
            Pending::MoveLine { key, to, .. } => {
                done.events.push(SyncEvent::RequestSucceeded { request });
                let requests = self.flush_move(Reorder::Line(key), request, to, target.model());
                done.requests.extend(requests);
            }
            Pending::MovePart { part, to, .. } => {
                done.events.push(SyncEvent::RequestSucceeded { request });
                let requests = self.flush_move(Reorder::Part(part), request, to, target.model());
                done.requests.extend(requests);
            }
            Pending::Transcription { line, layer, .. } => {
                done.events.push(SyncEvent::RequestSucceeded { request });
                match target.model().line_mut(line) {
                    Some(l) => {
                        if let Some(pk) = response.pk {
                            l.transcriptions.entry(layer).or_default().pk = Some(pk);
                        }
                    }
                    None => done.events.push(SyncEvent::StaleResponseDiscarded { request }),
                }
            }
        }
        done
    }

    fn failed(
        &mut self,
        request: RequestId,
        pending: Pending,
        error: RemoteError,
        target: &mut dyn SyncTarget,
    ) -> Completion {
        tracing::warn!("Request {} failed: {}", request, error);
        let mut done = Completion::default();
        done.events.push(SyncEvent::RequestFailed {
            request,
            reason: error.to_string(),
        });

        match pending {
            Pending::Create { key } => {
                self.creating.remove(&key);
                if target.model().remove(key).is_some() {
                    done.events.push(SyncEvent::RolledBack {
                        key,
                        fields: vec!["created".to_string()],
                    });
                    done.alert = Some(failure_alert(&format!("create {}", kind_of(key)), &error));
                } else {
                    done.events.push(SyncEvent::StaleResponseDiscarded { request });
                }
                for command in self.parked.remove(&key).unwrap_or_default() {
                    if command_key(&command) == Some(key) {
                        tracing::debug!("Dropping {} for unsaved {}", command.name(), key);
                        continue;
                    }
                    let requests = self.handle(command, target);
                    done.requests.extend(requests);
                }
                self.queued.remove(&key);
            }
            Pending::Update { updates } => {
                let mut any_live = false;
                for (key, changes) in updates {
                    self.release_update(key, request);
                    let model = target.model();
                    if !model.contains(key) {
                        done.events.push(SyncEvent::StaleResponseDiscarded { request });
                        continue;
                    }
                    any_live = true;
                    let mut restored = Vec::new();
                    for change in changes {
                        let field = change.field();
                        let good = self
                            .confirmed
                            .get(&(key, field))
                            .cloned()
                            .unwrap_or(change.previous);
                        match self
                            .queued
                            .get_mut(&key)
                            .and_then(|q| q.iter_mut().find(|c| c.field() == field))
                        {
                            // A newer edit of this field supersedes the failed one.
                            Some(newer) => newer.previous = good,
                            None => {
                                if good.apply(model, key) {
                                    restored.push(field.to_string());
                                }
                            }
                        }
                    }
                    if !restored.is_empty() {
                        tracing::info!("Rolled back {} [{}]", key, restored.join(", "));
                        done.events.push(SyncEvent::RolledBack {
                            key,
                            fields: restored,
                        });
                    }
                    let requests = self.flush_queued(key, target.model());
                    done.requests.extend(requests);
                }
                if any_live {
                    done.alert = Some(failure_alert("save your changes", &error));
                }
            }
            Pending::Delete { removed } => {
                let key = removed_key(&removed);
                let model = target.model();
                match removed {
                    Removed::Line(line) => model.restore_line(line),
                    Removed::Region { region, detached } => model.restore_region(region, &detached),
                }
                tracing::info!("Restored {} after failed delete", key);
                done.events.push(SyncEvent::RolledBack {
                    key,
                    fields: vec!["deleted".to_string()],
                });
                done.alert = Some(failure_alert(&format!("delete {}", kind_of(key)), &error));
            }
            Pending::MoveLine { key, from, .. } => {
                let item = Reorder::Line(key);
                if !target.model().contains(PrimitiveKey::Line(key)) {
                    self.release_move(item, request);
                    self.queued_moves.remove(&item);
                    done.events.push(SyncEvent::StaleResponseDiscarded { request });
                } else {
                    // A newer move of the same line supersedes the failed one.
                    if !self.queued_moves.contains_key(&item)
                        && target.model().move_line(key, from).is_some()
                    {
                        done.events.push(SyncEvent::RolledBack {
                            key: PrimitiveKey::Line(key),
                            fields: vec![Field::Order.to_string()],
                        });
                    }
                    done.alert = Some(failure_alert("reorder the line", &error));
                    let requests = self.flush_move(item, request, from, target.model());
                    done.requests.extend(requests);
                }
            }
            Pending::MovePart { part, from, .. } => {
                let item = Reorder::Part(part);
                if !self.queued_moves.contains_key(&item)
                    && target.cards().move_card(part, from).is_some()
                {
                    tracing::info!("Moved part {} back to {}", part, from);
                }
                done.alert = Some(failure_alert("reorder the pages", &error));
                let requests = self.flush_move(item, request, from, target.model());
                done.requests.extend(requests);
            }
            Pending::Transcription {
                line,
                layer,
                previous,
                content,
            } => {
                let key = PrimitiveKey::Line(line);
                let model = target.model();
                let current = model.line(line).map(|l| l.content(layer).unwrap_or_default().to_string());
                match current {
                    None => done.events.push(SyncEvent::StaleResponseDiscarded { request }),
                    Some(current) => {
                        if current == content {
                            FieldValue::Content {
                                layer,
                                content: previous,
                            }
                            .apply(model, key);
                            done.events.push(SyncEvent::RolledBack {
                                key,
                                fields: vec![Field::Content(layer).to_string()],
                            });
                        }
                        done.alert = Some(failure_alert("save the transcription", &error));
                    }
                }
            }
        }
        done
    }

    fn handle_bulk(
        &mut self,
        updates: Vec<PrimitiveUpdate>,
        target: &mut dyn SyncTarget,
    ) -> Vec<RemoteRequest> {
        let mut ready = Vec::new();
        for update in updates {
            let key = PrimitiveKey::Line(update.key);
            if self.is_creating(key) {
                self.parked
                    .entry(key)
                    .or_default()
                    .push(EditorCommand::UpdateLine(update));
            } else {
                ready.push((key, update.changes));
            }
        }
        self.update(ready, target.model())
    }

    /// Key of an unresolved create the command must wait for.
    fn blocker(&self, command: &EditorCommand) -> Option<PrimitiveKey> {
        let mut needed: Vec<PrimitiveKey> = Vec::new();
        match command {
            EditorCommand::CreateLine { region, .. } => {
                needed.extend(region.map(PrimitiveKey::Region));
            }
            EditorCommand::UpdateLine(update) | EditorCommand::UpdateRegion(update) => {
                needed.extend(command.key());
                for change in &update.changes {
                    if let FieldValue::Region(Some(region)) = change.current {
                        needed.push(PrimitiveKey::Region(region));
                    }
                }
            }
            EditorCommand::DeleteLine { .. }
            | EditorCommand::DeleteRegion { .. }
            | EditorCommand::MoveLine { .. } => needed.extend(command.key()),
            EditorCommand::SaveTranscription { line, .. } => {
                needed.push(PrimitiveKey::Line(*line));
            }
            EditorCommand::CreateRegion { .. }
            | EditorCommand::BulkUpdateLines(_)
            | EditorCommand::MovePart { .. } => {}
        }
        needed.into_iter().find(|k| self.is_creating(*k))
    }

    /// Drops the parked create of a primitive deleted before it was sent,
    /// with everything parked behind it. Returns false if its create is not
    /// parked.
    fn cancel_parked_create(&mut self, key: PrimitiveKey) -> bool {
        let Some(blocker) = self.waiting.remove(&key) else {
            return false;
        };
        if let Some(commands) = self.parked.get_mut(&blocker) {
            commands.retain(|c| !(is_create(c) && c.key() == Some(key)));
            if commands.is_empty() {
                self.parked.remove(&blocker);
            }
        }
        let dropped = self.parked.remove(&key).map_or(0, |c| c.len());
        tracing::debug!(
            "{} deleted before its create was sent, dropped {} parked commands",
            key,
            dropped
        );
        self.forget(key);
        true
    }

    fn create(
        &mut self,
        key: PrimitiveKey,
        fields: Fields,
        model: &PartModel,
    ) -> Vec<RemoteRequest> {
        self.waiting.remove(&key);
        let Some(part) = model.part() else {
            tracing::warn!("No part loaded, {} stays local", key);
            return Vec::new();
        };
        let operation = match key {
            PrimitiveKey::Line(_) => RemoteOperation::CreateLine { part, fields },
            PrimitiveKey::Region(_) => RemoteOperation::CreateRegion { part, fields },
        };
        let request = self.issue(operation, Pending::Create { key });
        self.creating.insert(key, request.id);
        vec![request]
    }

    fn update(
        &mut self,
        items: Vec<(PrimitiveKey, Vec<FieldChange>)>,
        model: &PartModel,
    ) -> Vec<RemoteRequest> {
        let mut ready: Vec<(PrimitiveKey, RemoteId, Vec<FieldChange>)> = Vec::new();
        for (key, changes) in items {
            if changes.is_empty() {
                continue;
            }
            if self.updating.contains_key(&key) {
                tracing::debug!("Update of {} queued behind the one in flight", key);
                merge_changes(self.queued.entry(key).or_default(), changes);
                continue;
            }
            match self.pk_of(key, model) {
                Some(pk) => ready.push((key, pk, changes)),
                None => tracing::debug!("{} has no remote id, update dropped", key),
            }
        }
        if ready.is_empty() {
            return Vec::new();
        }

        let operation = match ready.as_slice() {
            [(key, pk, changes)] => {
                let fields = self.encode(changes, model);
                match key {
                    PrimitiveKey::Line(_) => RemoteOperation::UpdateLine { pk: *pk, fields },
                    PrimitiveKey::Region(_) => RemoteOperation::UpdateRegion { pk: *pk, fields },
                }
            }
            _ => RemoteOperation::BulkUpdateLines {
                lines: ready
                    .iter()
                    .map(|(_, pk, changes)| LinePatch {
                        pk: *pk,
                        fields: self.encode(changes, model),
                    })
                    .collect(),
            },
        };
        let updates: Vec<(PrimitiveKey, Vec<FieldChange>)> = ready
            .into_iter()
            .map(|(key, _, changes)| (key, changes))
            .collect();
        let keys: Vec<PrimitiveKey> = updates.iter().map(|(key, _)| *key).collect();
        let request = self.issue(operation, Pending::Update { updates });
        for key in keys {
            self.updating.insert(key, request.id);
        }
        vec![request]
    }

    fn delete(
        &mut self,
        key: PrimitiveKey,
        pk: Option<RemoteId>,
        removed: Removed,
        model: &PartModel,
    ) -> Vec<RemoteRequest> {
        self.queued.remove(&key);
        let Some(pk) = pk.or_else(|| self.pk_of(key, model)) else {
            tracing::debug!("{} was never persisted, nothing to delete", key);
            self.forget(key);
            return Vec::new();
        };
        let operation = match key {
            PrimitiveKey::Line(_) => RemoteOperation::DeleteLine { pk },
            PrimitiveKey::Region(_) => RemoteOperation::DeleteRegion { pk },
        };
        vec![self.issue(operation, Pending::Delete { removed })]
    }

    fn reorder(
        &mut self,
        item: Reorder,
        to: usize,
        operation: RemoteOperation,
        pending: Pending,
    ) -> Vec<RemoteRequest> {
        if self.moving.contains_key(&item) {
            tracing::debug!("Move of {:?} to {} queued behind the one in flight", item, to);
            self.queued_moves.insert(item, to);
            return Vec::new();
        }
        let request = self.issue(operation, pending);
        self.moving.insert(item, request.id);
        vec![request]
    }

    fn release_move(&mut self, item: Reorder, request: RequestId) {
        if self.moving.get(&item) == Some(&request) {
            self.moving.remove(&item);
        }
    }

    /// Releases a finished reorder and sends the move waiting behind it.
    /// `good` is the position the service last acknowledged.
    fn flush_move(
        &mut self,
        item: Reorder,
        request: RequestId,
        good: usize,
        model: &PartModel,
    ) -> Vec<RemoteRequest> {
        self.release_move(item, request);
        let Some(to) = self.queued_moves.remove(&item) else {
            return Vec::new();
        };
        match item {
            Reorder::Line(key) => {
                let line = PrimitiveKey::Line(key);
                let Some(pk) = self.pk_of(line, model).filter(|_| model.contains(line)) else {
                    return Vec::new();
                };
                self.reorder(
                    item,
                    to,
                    RemoteOperation::MoveLine { pk, index: to },
                    Pending::MoveLine {
                        key,
                        from: good,
                        to,
                    },
                )
            }
            Reorder::Part(part) => self.reorder(
                item,
                to,
                RemoteOperation::MovePart {
                    pk: part,
                    index: to,
                },
                Pending::MovePart {
                    part,
                    from: good,
                    to,
                },
            ),
        }
    }

    fn issue(&mut self, operation: RemoteOperation, pending: Pending) -> RemoteRequest {
        self.next_request += 1;
        let id = self.next_request;
        tracing::debug!("Request {} {}", id, operation.name());
        self.in_flight.insert(id, pending);
        RemoteRequest { id, operation }
    }

    fn release_update(&mut self, key: PrimitiveKey, request: RequestId) {
        if self.updating.get(&key) == Some(&request) {
            self.updating.remove(&key);
        }
    }

    fn flush_queued(&mut self, key: PrimitiveKey, model: &PartModel) -> Vec<RemoteRequest> {
        if self.updating.contains_key(&key) || !model.contains(key) {
            return Vec::new();
        }
        match self.queued.remove(&key) {
            Some(changes) => self.update(vec![(key, changes)], model),
            None => Vec::new(),
        }
    }

    fn forget(&mut self, key: PrimitiveKey) {
        self.confirmed.retain(|(k, _), _| *k != key);
        self.queued.remove(&key);
        self.resolved.remove(&key);
        if let PrimitiveKey::Line(line) = key {
            self.queued_moves.remove(&Reorder::Line(line));
        }
    }

    fn pk_of(&self, key: PrimitiveKey, model: &PartModel) -> Option<RemoteId> {
        model
            .remote_id(key)
            .or_else(|| self.resolved.get(&key).copied())
    }

    fn region_pk(&self, region: Option<LocalId>, model: &PartModel) -> Value {
        region
            .and_then(|r| self.pk_of(PrimitiveKey::Region(r), model))
            .map_or(Value::Null, Value::from)
    }

    fn encode(&self, changes: &[FieldChange], model: &PartModel) -> Fields {
        let mut fields = Fields::new();
        for change in changes {
            let value = match &change.current {
                FieldValue::Baseline(p) | FieldValue::Mask(p) => polygon_value(p.as_ref()),
                FieldValue::Outline(p) => polygon_value(Some(p)),
                FieldValue::Region(r) => self.region_pk(*r, model),
                FieldValue::Order(o) => json!(o),
                FieldValue::Typology(t) => json!(t),
                FieldValue::Content { content, .. } => json!(content),
            };
            fields.insert(change.field().to_string(), value);
        }
        fields
    }
}

fn polygon_value(polygon: Option<&Polygon>) -> Value {
    match polygon {
        Some(p) => Value::Array(p.points().iter().map(|pt| json!([pt.x, pt.y])).collect()),
        None => Value::Null,
    }
}

/// Folds newer changes into a queued edit: a field keeps its oldest
/// `previous` and takes the newest `current`.
fn merge_changes(queued: &mut Vec<FieldChange>, changes: Vec<FieldChange>) {
    for change in changes {
        match queued.iter_mut().find(|c| c.field() == change.field()) {
            Some(existing) => existing.current = change.current,
            None => queued.push(change),
        }
    }
}

fn is_create(command: &EditorCommand) -> bool {
    matches!(
        command,
        EditorCommand::CreateLine { .. } | EditorCommand::CreateRegion { .. }
    )
}

fn command_key(command: &EditorCommand) -> Option<PrimitiveKey> {
    match command {
        EditorCommand::CreateLine { key, .. } => Some(PrimitiveKey::Line(*key)),
        EditorCommand::CreateRegion { key, .. } => Some(PrimitiveKey::Region(*key)),
        EditorCommand::SaveTranscription { line, .. } => Some(PrimitiveKey::Line(*line)),
        other => other.key(),
    }
}

fn removed_key(removed: &Removed) -> PrimitiveKey {
    match removed {
        Removed::Line(line) => PrimitiveKey::Line(line.key),
        Removed::Region { region, .. } => PrimitiveKey::Region(region.key),
    }
}

fn kind_of(key: PrimitiveKey) -> &'static str {
    match key {
        PrimitiveKey::Line(_) => "the line",
        PrimitiveKey::Region(_) => "the region",
    }
}

fn failure_alert(action: &str, error: &RemoteError) -> Alert {
    let hint = if error.is_transient() {
        " Please try again."
    } else {
        ""
    };
    Alert::error(format!("Could not {action}: {error}.{hint}"))
}
