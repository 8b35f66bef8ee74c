//! Segmentation editor: the state machine wiring pointer and keyboard input
//! to tool state and the primitive model.
//!
//! The editor performs no I/O. Every change to persisted data is sent as an
//! [`EditorCommand`] on the host channel, and every state change is
//! published on the session [`EventBus`].

mod operations;
mod types;

pub use types::{
    DeletePointControl, Interaction, Key, KeyEvent, Modifiers, PointerEvent, ViewMapping,
};

use std::sync::Arc;

use folium_core::{AppEvent, EventBus, LocalId, Point, PrimitiveKey, SegmentationEvent};
use folium_settings::EditorSettings;

use crate::commands::{
    CommandSender, EditorCommand, Field, FieldChange, FieldValue, PrimitiveUpdate,
};
use crate::model::{PartModel, Polygon, PolygonRef, Removed};
use crate::tools::{ShortcutSuppression, ToolMode, ToolState};

/// Editor for the lines and regions of one part.
pub struct SegmentationEditor {
    model: PartModel,
    tools: ToolState,
    interaction: Interaction,
    delete_control: Option<DeletePointControl>,
    view: ViewMapping,
    settings: EditorSettings,
    commands: CommandSender,
    bus: Arc<EventBus>,
}

impl SegmentationEditor {
    pub fn new(
        model: PartModel,
        settings: EditorSettings,
        view: ViewMapping,
        commands: CommandSender,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            model,
            tools: ToolState::new(),
            interaction: Interaction::Idle,
            delete_control: None,
            view,
            settings,
            commands,
            bus,
        }
    }

    pub fn model(&self) -> &PartModel {
        &self.model
    }

    /// Mutable model access for confirmed or failed sync responses.
    pub fn model_mut(&mut self) -> &mut PartModel {
        &mut self.model
    }

    /// Replaces the model (e.g. after loading another part). Any interaction
    /// in progress is dropped.
    pub fn load(&mut self, model: PartModel) {
        self.interaction = Interaction::Idle;
        self.delete_control = None;
        self.model = model;
        tracing::info!(
            "Loaded {} lines and {} regions",
            self.model.line_count(),
            self.model.region_count()
        );
    }

    pub fn tool(&self) -> ToolMode {
        self.tools.active()
    }

    pub fn shortcuts(&self) -> ShortcutSuppression {
        self.tools.suppression()
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn delete_control(&self) -> Option<&DeletePointControl> {
        self.delete_control.as_ref()
    }

    pub fn view(&self) -> &ViewMapping {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewMapping {
        &mut self.view
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Activates a tool. A drawing in progress is committed; a drag in
    /// progress is reverted.
    pub fn set_tool(&mut self, mode: ToolMode) -> bool {
        if self.tools.active() == mode {
            return false;
        }
        self.finish_interaction();
        self.tools.set(mode);
        self.tool_changed(mode);
        true
    }

    /// Activates `mode`, or returns to select if it is already active.
    pub fn toggle_tool(&mut self, mode: ToolMode) -> ToolMode {
        self.finish_interaction();
        let active = self.tools.toggle(mode);
        self.tool_changed(active);
        active
    }

    /// Abandons the current interaction: drawings are discarded and drags
    /// restored. Issued commands are not affected.
    pub fn cancel(&mut self) {
        let previous = self.replace_interaction(Interaction::Idle);
        self.revert(previous);
        self.delete_control = None;
    }

    pub fn select(&mut self, key: PrimitiveKey, additive: bool) -> bool {
        if !self.model.contains(key) {
            return false;
        }
        let changed = self.model.selection_mut().select(key, additive);
        if changed {
            self.selection_changed();
        }
        changed
    }

    pub fn unselect(&mut self, key: PrimitiveKey) -> bool {
        let changed = self.model.selection_mut().unselect(key);
        if changed {
            self.selection_changed();
        }
        changed
    }

    pub fn clear_selection(&mut self) -> bool {
        let changed = self.model.selection_mut().clear();
        if changed {
            self.selection_changed();
        }
        changed
    }

    pub fn select_all(&mut self) -> usize {
        let mut changed = false;
        for key in self.model.keys() {
            changed |= self.model.selection_mut().select(key, true);
        }
        if changed {
            self.selection_changed();
        }
        self.model.selection().len()
    }

    /// Screen position of the contextual delete button of a primitive: the
    /// top-right corner of its bounding box.
    pub fn delete_button_anchor(&self, key: PrimitiveKey) -> Option<Point> {
        let bounds = self.model.bounds_of(key)?;
        Some(self.view.image_to_screen(&Point::new(bounds.max_x, bounds.min_y)))
    }

    /// Unselects and removes a primitive, then asks the host to delete it.
    pub fn delete_primitive(&mut self, key: PrimitiveKey) -> bool {
        if !self.model.contains(key) {
            return false;
        }
        if !self.interaction.is_idle() {
            self.cancel();
        }
        if self
            .delete_control
            .is_some_and(|control| control.target.key == key)
        {
            self.delete_control = None;
        }
        self.unselect(key);

        let pk = self.model.remote_id(key);
        let command = match self.model.remove(key) {
            Some(Removed::Line(snapshot)) => EditorCommand::DeleteLine {
                key: snapshot.key,
                pk,
                snapshot,
            },
            Some(Removed::Region { region, detached }) => EditorCommand::DeleteRegion {
                key: region.key,
                pk,
                snapshot: region,
                detached,
            },
            None => return false,
        };
        self.emit(command);
        self.publish(SegmentationEvent::Deleted { key });
        true
    }

    /// Deletes every selected primitive. Returns how many were removed.
    pub fn delete_selection(&mut self) -> usize {
        let keys = self.model.selection().keys().to_vec();
        keys.into_iter()
            .filter(|key| self.delete_primitive(*key))
            .count()
    }

    /// Changes which region a line belongs to.
    pub fn assign_region(&mut self, line: LocalId, region: Option<LocalId>) -> bool {
        match self.model.assign_region(line, region) {
            Some(previous) if previous != region => {
                self.emit_update(
                    PrimitiveKey::Line(line),
                    vec![FieldChange::new(
                        FieldValue::Region(previous),
                        FieldValue::Region(region),
                    )],
                );
                true
            }
            _ => false,
        }
    }

    /// Moves a line to another position in reading order.
    pub fn move_line(&mut self, line: LocalId, to: usize) -> bool {
        match self.model.move_line(line, to) {
            Some(from) if Some(from) != self.model.line_index(line) => {
                let to = self.model.line_index(line).unwrap_or(to);
                let pk = self.model.remote_id(PrimitiveKey::Line(line));
                self.emit(EditorCommand::MoveLine {
                    key: line,
                    pk,
                    from,
                    to,
                });
                self.publish(SegmentationEvent::Updated {
                    key: PrimitiveKey::Line(line),
                });
                true
            }
            _ => false,
        }
    }

    fn tool_changed(&mut self, mode: ToolMode) {
        tracing::debug!("Tool changed to {}", mode);
        self.publish(SegmentationEvent::ToolChanged {
            tool: mode.to_string(),
        });
    }

    fn selection_changed(&self) {
        self.publish(SegmentationEvent::SelectionChanged {
            selected: self.model.selection().keys().to_vec(),
        });
    }

    fn replace_interaction(&mut self, next: Interaction) -> Interaction {
        let previous = std::mem::replace(&mut self.interaction, next);
        if previous.name() != self.interaction.name() {
            tracing::debug!("Interaction {} -> {}", previous.name(), self.interaction.name());
            self.publish(SegmentationEvent::InteractionChanged {
                from: previous.name().to_string(),
                to: self.interaction.name().to_string(),
            });
        }
        previous
    }

    /// Ends the current interaction for a tool switch.
    fn finish_interaction(&mut self) {
        match self.replace_interaction(Interaction::Idle) {
            Interaction::Drawing { key, .. } => self.commit_drawing(key),
            other => self.revert(other),
        }
        self.delete_control = None;
    }

    fn revert(&mut self, interaction: Interaction) {
        match interaction {
            Interaction::Drawing { key, .. } => {
                self.model.remove(key);
            }
            Interaction::DraggingPoint {
                target, previous, ..
            } => {
                self.model.set_polygon(&target, Some(previous));
            }
            Interaction::DraggingSelection { previous, .. } => {
                for (key, values) in previous {
                    for value in values {
                        value.apply(&mut self.model, key);
                    }
                }
            }
            Interaction::Idle
            | Interaction::BoxSelecting { .. }
            | Interaction::Cutting { .. } => {}
        }
    }

    fn emit(&self, command: EditorCommand) {
        tracing::debug!("Emitting {}", command.name());
        if self.commands.send(command).is_err() {
            tracing::warn!("Command channel closed, change will not be persisted");
        }
    }

    fn publish(&self, event: SegmentationEvent) {
        self.bus.publish(AppEvent::Segmentation(event));
    }

    fn emit_update(&self, key: PrimitiveKey, changes: Vec<FieldChange>) {
        if changes.is_empty() {
            return;
        }
        let update = PrimitiveUpdate {
            key: key.local_id(),
            pk: self.model.remote_id(key),
            changes,
        };
        self.emit(match key {
            PrimitiveKey::Line(_) => EditorCommand::UpdateLine(update),
            PrimitiveKey::Region(_) => EditorCommand::UpdateRegion(update),
        });
        self.publish(SegmentationEvent::Updated { key });
    }

    fn emit_polygon_change(&self, target: &PolygonRef, previous: Option<Polygon>) {
        let current = self.model.polygon(target).cloned();
        if let Some(change) = FieldChange::polygon(target.kind, previous, current) {
            self.emit_update(target.key, vec![change]);
        }
    }

    /// Geometry fields of the selected primitives, for restoring or diffing
    /// after a multi-drag.
    fn snapshot_selection(&self) -> Vec<(PrimitiveKey, Vec<FieldValue>)> {
        self.model
            .selection()
            .keys()
            .iter()
            .map(|key| {
                let fields: &[Field] = match key {
                    PrimitiveKey::Line(_) => &[Field::Baseline, Field::Mask],
                    PrimitiveKey::Region(_) => &[Field::Outline],
                };
                let values = fields
                    .iter()
                    .filter_map(|field| FieldValue::read(&self.model, *key, *field))
                    .collect();
                (*key, values)
            })
            .collect()
    }
}

impl std::fmt::Debug for SegmentationEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentationEditor")
            .field("tool", &self.tools.active())
            .field("interaction", &self.interaction.name())
            .field("lines", &self.model.line_count())
            .field("regions", &self.model.region_count())
            .field("selected", &self.model.selection().len())
            .finish()
    }
}
