//! Pointer and keyboard handling for SegmentationEditor.

use folium_core::{Bounds, LocalId, Point, PrimitiveKey, SegmentationEvent};

use super::types::{DeletePointControl, Interaction, Key, KeyEvent, PointerEvent};
use super::SegmentationEditor;
use crate::commands::{EditorCommand, FieldChange, FieldValue, PrimitiveUpdate};
use crate::model::{HitKind, Polygon, PolygonRef};
use crate::tools::ToolMode;

/// Cut segments shorter than this (in image pixels) are ignored.
const MIN_CUT_LENGTH: f64 = 1.0;

impl SegmentationEditor {
    /// Handles a button press. Returns false when the event is left to the
    /// viewport (pan tool) or ignored.
    pub fn pointer_down(&mut self, event: &PointerEvent) -> bool {
        let tool = self.tools.active();
        if tool == ToolMode::Pan || !self.interaction.is_idle() {
            return false;
        }
        self.delete_control = None;
        let p = self.view.screen_to_image(&event.position);

        if tool == ToolMode::Cut {
            self.replace_interaction(Interaction::Cutting { start: p, end: p });
            return true;
        }

        let tolerance = self.view.length_to_image(self.settings.hit_tolerance_px);
        let modifiers = event.modifiers;
        match self.model.hit_test(&p, tolerance) {
            Some(hit) if modifiers.ctrl => {
                self.select(hit.key(), true);
                let previous = self.snapshot_selection();
                self.replace_interaction(Interaction::DraggingSelection {
                    last: p,
                    previous,
                    moved: false,
                });
            }
            Some(hit) if modifiers.shift => {
                self.model.selection_mut().toggle(hit.key());
                self.selection_changed();
            }
            Some(hit) => {
                self.select(hit.key(), false);
                if let HitKind::Vertex { index } = hit.kind {
                    let Some(previous) = self.model.polygon(&hit.target).cloned() else {
                        return true;
                    };
                    if self.model.can_delete_point(&hit.target, index) {
                        let vertex = previous.points()[index];
                        let anchor = self.view.image_to_screen(&vertex)
                            - Point::new(0.0, self.settings.delete_control_offset_px);
                        self.delete_control = Some(DeletePointControl {
                            target: hit.target,
                            index,
                            anchor,
                        });
                    }
                    self.replace_interaction(Interaction::DraggingPoint {
                        target: hit.target,
                        index,
                        previous,
                        moved: false,
                    });
                }
            }
            None if modifiers.shift => {
                self.replace_interaction(Interaction::BoxSelecting {
                    origin: p,
                    current: p,
                });
            }
            None => match tool {
                ToolMode::AddLines => {
                    self.clear_selection();
                    let id = self.model.create_line(p);
                    self.replace_interaction(Interaction::Drawing {
                        key: PrimitiveKey::Line(id),
                        origin: p,
                    });
                }
                ToolMode::AddRegions => {
                    self.clear_selection();
                    let id = self.model.create_region(Polygon::rectangle(p, p));
                    self.replace_interaction(Interaction::Drawing {
                        key: PrimitiveKey::Region(id),
                        origin: p,
                    });
                }
                _ => {
                    self.clear_selection();
                }
            },
        }
        true
    }

    pub fn pointer_move(&mut self, event: &PointerEvent) -> bool {
        let p = self.view.screen_to_image(&event.position);
        let mut marquee = None;
        match &mut self.interaction {
            Interaction::Idle => return false,
            Interaction::Drawing {
                key: PrimitiveKey::Line(id),
                ..
            } => {
                let target = PolygonRef::baseline(*id);
                if self.model.polygon(&target).and_then(Polygon::last) != Some(&p) {
                    self.model.append_point(*id, p);
                }
            }
            Interaction::Drawing {
                key: PrimitiveKey::Region(id),
                origin,
            } => {
                self.model.set_polygon(
                    &PolygonRef::outline(*id),
                    Some(Polygon::rectangle(*origin, p)),
                );
            }
            Interaction::DraggingPoint {
                target,
                index,
                moved,
                ..
            } => {
                let current = self
                    .model
                    .polygon(target)
                    .and_then(|poly| poly.points().get(*index).copied());
                if current != Some(p) && self.model.move_point(target, *index, p) {
                    *moved = true;
                    self.delete_control = None;
                }
            }
            Interaction::DraggingSelection { last, moved, .. } => {
                let delta = p - *last;
                let keys = self.model.selection().keys().to_vec();
                self.model.translate(&keys, delta);
                *last = p;
                *moved = true;
            }
            Interaction::BoxSelecting { origin, current } => {
                *current = p;
                marquee = Some(Bounds::from_corners(*origin, p));
            }
            Interaction::Cutting { end, .. } => {
                *end = p;
            }
        }

        if let Some(rect) = marquee {
            let mut changed = false;
            for key in self.model.intersecting(&rect) {
                changed |= self.model.selection_mut().select(key, true);
            }
            if changed {
                self.selection_changed();
            }
        }
        true
    }

    /// Completes the current gesture and returns to idle.
    pub fn pointer_up(&mut self, event: &PointerEvent) -> bool {
        if self.interaction.is_idle() {
            return false;
        }
        self.pointer_move(event);

        match self.replace_interaction(Interaction::Idle) {
            Interaction::Drawing { key, .. } => self.commit_drawing(key),
            Interaction::DraggingPoint {
                target,
                previous,
                moved: true,
                ..
            } => self.emit_polygon_change(&target, Some(previous)),
            Interaction::DraggingSelection {
                previous,
                moved: true,
                ..
            } => self.emit_translation(previous),
            Interaction::Cutting { start, end } => self.apply_cut(start, end),
            _ => {}
        }
        true
    }

    /// Inserts a point where a stroke was double-clicked.
    pub fn double_click(&mut self, event: &PointerEvent) -> bool {
        if self.tools.active() == ToolMode::Pan {
            return false;
        }
        let p = self.view.screen_to_image(&event.position);
        let tolerance = self.view.length_to_image(self.settings.hit_tolerance_px);
        let Some(hit) = self.model.hit_test(&p, tolerance) else {
            return false;
        };
        let HitKind::Stroke { segment, point } = hit.kind else {
            return false;
        };
        let previous = self.model.polygon(&hit.target).cloned();
        if !self.model.insert_point(&hit.target, segment + 1, point) {
            return false;
        }
        self.emit_polygon_change(&hit.target, previous);
        true
    }

    /// Deletes the vertex under the visible delete-point control.
    pub fn click_delete_point(&mut self) -> bool {
        let Some(control) = self.delete_control.take() else {
            return false;
        };
        let previous = self.model.polygon(&control.target).cloned();
        if !self.model.delete_point(&control.target, control.index) {
            return false;
        }
        if matches!(self.interaction, Interaction::DraggingPoint { .. }) {
            self.replace_interaction(Interaction::Idle);
        }
        self.emit_polygon_change(&control.target, previous);
        true
    }

    /// Applies a keyboard shortcut unless shortcuts are suppressed.
    pub fn key_down(&mut self, event: &KeyEvent) -> bool {
        if !self.tools.shortcuts_enabled() {
            return false;
        }
        match (event.key, event.modifiers.ctrl) {
            (Key::Delete | Key::Backspace, _) => self.delete_selection() > 0,
            (Key::Escape, _) => {
                self.cancel();
                self.clear_selection();
                true
            }
            (Key::Char(c), true) if c.eq_ignore_ascii_case(&'a') => {
                self.select_all();
                true
            }
            (Key::Char(c), false) => {
                let mode = match c.to_ascii_lowercase() {
                    'l' => ToolMode::AddLines,
                    'r' => ToolMode::AddRegions,
                    'c' => ToolMode::Cut,
                    'p' => ToolMode::Pan,
                    _ => return false,
                };
                self.toggle_tool(mode);
                true
            }
            _ => false,
        }
    }

    /// Finalizes a drawn primitive: simplifies it, drops it if degenerate,
    /// and emits its creation.
    pub(super) fn commit_drawing(&mut self, key: PrimitiveKey) {
        match key {
            PrimitiveKey::Line(id) => self.commit_line(id),
            PrimitiveKey::Region(id) => self.commit_region(id),
        }
    }

    fn commit_line(&mut self, id: LocalId) {
        let tolerance = self.view.length_to_image(self.settings.simplify_tolerance_px);
        self.model.simplify_line(id, tolerance);

        let first = self
            .model
            .polygon(&PolygonRef::baseline(id))
            .filter(|b| b.len() >= 2)
            .and_then(|b| b.first().copied());
        let Some(first) = first else {
            tracing::debug!("Discarding line#{} drawn without a drag", id.0);
            self.model.remove(PrimitiveKey::Line(id));
            return;
        };
        if let Some(region) = self.model.region_at(&first) {
            self.model.assign_region(id, Some(region));
        }
        self.emit_line_created(id);
    }

    fn commit_region(&mut self, id: LocalId) {
        let min_size = self.view.length_to_image(self.settings.min_region_size_px);
        let Some(region) = self.model.region(id) else {
            return;
        };
        let big_enough = region
            .outline
            .bounds()
            .is_some_and(|b| b.width() >= min_size && b.height() >= min_size);
        if !big_enough {
            tracing::debug!("Discarding region#{} smaller than {:.1}px", id.0, min_size);
            self.model.remove(PrimitiveKey::Region(id));
            return;
        }
        let command = EditorCommand::CreateRegion {
            key: id,
            outline: region.outline.clone(),
            typology: region.typology.clone(),
        };
        self.emit(command);
        self.publish(SegmentationEvent::Created {
            key: PrimitiveKey::Region(id),
        });
    }

    fn emit_line_created(&self, id: LocalId) {
        let Some(line) = self.model.line(id) else {
            return;
        };
        self.emit(EditorCommand::CreateLine {
            key: id,
            baseline: line.baseline.clone(),
            mask: line.mask.clone(),
            region: line.region,
            order: line.order,
        });
        self.publish(SegmentationEvent::Created {
            key: PrimitiveKey::Line(id),
        });
    }

    /// Emits the geometry changes of a finished multi-drag: lines as one
    /// bulk update when several moved, regions one by one.
    fn emit_translation(&self, previous: Vec<(PrimitiveKey, Vec<FieldValue>)>) {
        let mut line_updates = Vec::new();
        for (key, values) in previous {
            let changes: Vec<FieldChange> = values
                .into_iter()
                .filter_map(|before| {
                    let after = FieldValue::read(&self.model, key, before.field())?;
                    (after != before).then(|| FieldChange::new(before, after))
                })
                .collect();
            if changes.is_empty() {
                continue;
            }
            match key {
                PrimitiveKey::Line(id) => line_updates.push(PrimitiveUpdate {
                    key: id,
                    pk: self.model.remote_id(key),
                    changes,
                }),
                PrimitiveKey::Region(_) => self.emit_update(key, changes),
            }
        }

        match line_updates.len() {
            0 => {}
            1 => {
                let update = line_updates.remove(0);
                let key = PrimitiveKey::Line(update.key);
                self.emit(EditorCommand::UpdateLine(update));
                self.publish(SegmentationEvent::Updated { key });
            }
            _ => {
                let keys: Vec<PrimitiveKey> = line_updates
                    .iter()
                    .map(|u| PrimitiveKey::Line(u.key))
                    .collect();
                self.emit(EditorCommand::BulkUpdateLines(line_updates));
                for key in keys {
                    self.publish(SegmentationEvent::Updated { key });
                }
            }
        }
    }

    /// Splits every baseline crossing the cut segment. The original line
    /// keeps the head and loses its mask; a new line takes the tail.
    fn apply_cut(&mut self, start: Point, end: Point) {
        if start.distance_to(&end) < MIN_CUT_LENGTH {
            return;
        }
        let ids: Vec<LocalId> = self.model.lines().map(|l| l.key).collect();
        let mut cuts = 0;
        for id in ids {
            let Some(line) = self.model.line(id) else {
                continue;
            };
            let Some(baseline) = line.baseline.clone() else {
                continue;
            };
            let Some((head, tail)) = baseline.split_at_crossing(&start, &end) else {
                continue;
            };
            let region = line.region;
            let mask = line.mask.clone();

            let mut changes = vec![FieldChange::new(
                FieldValue::Baseline(Some(baseline)),
                FieldValue::Baseline(Some(head.clone())),
            )];
            if mask.is_some() {
                changes.push(FieldChange::new(FieldValue::Mask(mask), FieldValue::Mask(None)));
            }
            self.model.set_polygon(&PolygonRef::baseline(id), Some(head));
            self.model.set_polygon(&PolygonRef::mask(id), None);
            self.emit_update(PrimitiveKey::Line(id), changes);

            let new_line = self.model.new_line();
            new_line.baseline = Some(tail);
            new_line.region = region;
            let new_id = new_line.key;
            self.emit_line_created(new_id);
            // The tail is read right after its head.
            if let Some(index) = self.model.line_index(id) {
                self.move_line(new_id, index + 1);
            }
            cuts += 1;
        }
        tracing::debug!("Cut split {} lines", cuts);
    }
}
