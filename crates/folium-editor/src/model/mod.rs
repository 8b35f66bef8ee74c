//! Primitive model of the open document part.
//!
//! Lines and regions live in an arena keyed by [`LocalId`]; ids come from a
//! single generator so key order is creation order across both kinds. The
//! model owns the selection so that removing a primitive always unselects
//! it. Invalid geometric edits (deleting an endpoint, inserting past the end)
//! are rejected by returning `false` and leave the model unchanged.

mod line;
mod polygon;
mod region;

pub use hit_test::{Hit, HitKind};
pub use line::Line;
pub use polygon::Polygon;
pub use region::Region;

use std::collections::BTreeMap;
use std::fmt;

use folium_core::geometry::path_intersects_rect;
use folium_core::{Bounds, IdGenerator, LocalId, ModelError, PartId, Point, PrimitiveKey, RemoteId};

use crate::selection_manager::Selection;

/// Which polygon of a primitive is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolygonKind {
    Baseline,
    Mask,
    Outline,
}

impl PolygonKind {
    /// Masks and region outlines are closed; baselines are open paths.
    pub fn is_closed(&self) -> bool {
        !matches!(self, PolygonKind::Baseline)
    }

    fn min_len(&self) -> usize {
        if self.is_closed() {
            3
        } else {
            2
        }
    }
}

impl fmt::Display for PolygonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolygonKind::Baseline => write!(f, "baseline"),
            PolygonKind::Mask => write!(f, "mask"),
            PolygonKind::Outline => write!(f, "outline"),
        }
    }
}

/// Address of one polygon in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolygonRef {
    pub key: PrimitiveKey,
    pub kind: PolygonKind,
}

impl PolygonRef {
    pub fn new(key: PrimitiveKey, kind: PolygonKind) -> Self {
        Self { key, kind }
    }

    pub fn baseline(line: LocalId) -> Self {
        Self::new(PrimitiveKey::Line(line), PolygonKind::Baseline)
    }

    pub fn mask(line: LocalId) -> Self {
        Self::new(PrimitiveKey::Line(line), PolygonKind::Mask)
    }

    pub fn outline(region: LocalId) -> Self {
        Self::new(PrimitiveKey::Region(region), PolygonKind::Outline)
    }
}

/// A primitive detached from the model, kept so the removal can be undone.
#[derive(Debug, Clone, PartialEq)]
pub enum Removed {
    Line(Line),
    /// The region and the lines that were unlinked from it.
    Region { region: Region, detached: Vec<LocalId> },
}

impl Removed {
    pub fn key(&self) -> PrimitiveKey {
        match self {
            Removed::Line(line) => PrimitiveKey::Line(line.key),
            Removed::Region { region, .. } => PrimitiveKey::Region(region.key),
        }
    }
}

/// Lines and regions of one part, plus the current selection.
#[derive(Debug, Clone, Default)]
pub struct PartModel {
    part: Option<PartId>,
    ids: IdGenerator,
    lines: BTreeMap<LocalId, Line>,
    regions: BTreeMap<LocalId, Region>,
    selection: Selection,
}

impl PartModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_part(part: PartId) -> Self {
        Self {
            part: Some(part),
            ..Self::default()
        }
    }

    pub fn part(&self) -> Option<PartId> {
        self.part
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.regions.is_empty()
    }

    pub fn line(&self, id: LocalId) -> Option<&Line> {
        self.lines.get(&id)
    }

    pub fn line_mut(&mut self, id: LocalId) -> Option<&mut Line> {
        self.lines.get_mut(&id)
    }

    pub fn region(&self, id: LocalId) -> Option<&Region> {
        self.regions.get(&id)
    }

    pub fn region_mut(&mut self, id: LocalId) -> Option<&mut Region> {
        self.regions.get_mut(&id)
    }

    /// Fallible lookup for callers that treat a missing line as an error.
    pub fn require_line(&self, id: LocalId) -> Result<&Line, ModelError> {
        self.lines.get(&id).ok_or(ModelError::UnknownPrimitive {
            key: PrimitiveKey::Line(id),
        })
    }

    pub fn contains(&self, key: PrimitiveKey) -> bool {
        match key {
            PrimitiveKey::Line(id) => self.lines.contains_key(&id),
            PrimitiveKey::Region(id) => self.regions.contains_key(&id),
        }
    }

    /// Lines in creation order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.values()
    }

    /// Lines sorted by their reading order.
    pub fn lines_in_order(&self) -> Vec<&Line> {
        let mut lines: Vec<&Line> = self.lines.values().collect();
        lines.sort_by_key(|l| (l.order, l.key));
        lines
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    /// Every primitive key in creation order.
    pub fn keys(&self) -> Vec<PrimitiveKey> {
        let mut keys: Vec<PrimitiveKey> = self
            .lines
            .keys()
            .map(|id| PrimitiveKey::Line(*id))
            .chain(self.regions.keys().map(|id| PrimitiveKey::Region(*id)))
            .collect();
        keys.sort_by_key(|k| k.local_id());
        keys
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// Allocates a new unsaved line placed after every existing line.
    pub fn new_line(&mut self) -> &mut Line {
        let key = self.ids.next_id();
        let order = self.lines.values().map(|l| l.order + 1).max().unwrap_or(0);
        self.lines.entry(key).or_insert_with(|| Line::new(key, order))
    }

    /// Starts a new line whose baseline holds only `origin`.
    pub fn create_line(&mut self, origin: Point) -> LocalId {
        let line = self.new_line();
        line.baseline = Some(Polygon::new(vec![origin]));
        tracing::debug!("Created line#{} at ({:.1}, {:.1})", line.key.0, origin.x, origin.y);
        line.key
    }

    pub fn create_region(&mut self, outline: Polygon) -> LocalId {
        let key = self.ids.next_id();
        self.regions.insert(key, Region::new(key, outline));
        tracing::debug!("Created region#{}", key.0);
        key
    }

    /// Puts a previously removed line back under its original key.
    ///
    /// The region link is dropped when that region no longer exists.
    pub fn restore_line(&mut self, mut line: Line) {
        if line.region.is_some_and(|r| !self.regions.contains_key(&r)) {
            line.region = None;
        }
        self.lines.insert(line.key, line);
    }

    /// Puts a removed region back and relinks the lines it lost.
    pub fn restore_region(&mut self, region: Region, detached: &[LocalId]) {
        let key = region.key;
        self.regions.insert(key, region);
        for id in detached {
            if let Some(line) = self.lines.get_mut(id) {
                if line.region.is_none() {
                    line.region = Some(key);
                }
            }
        }
    }

    pub fn polygon(&self, target: &PolygonRef) -> Option<&Polygon> {
        match (target.key, target.kind) {
            (PrimitiveKey::Line(id), PolygonKind::Baseline) => self.lines.get(&id)?.baseline.as_ref(),
            (PrimitiveKey::Line(id), PolygonKind::Mask) => self.lines.get(&id)?.mask.as_ref(),
            (PrimitiveKey::Region(id), PolygonKind::Outline) => Some(&self.regions.get(&id)?.outline),
            _ => None,
        }
    }

    pub fn polygon_mut(&mut self, target: &PolygonRef) -> Option<&mut Polygon> {
        match (target.key, target.kind) {
            (PrimitiveKey::Line(id), PolygonKind::Baseline) => {
                self.lines.get_mut(&id)?.baseline.as_mut()
            }
            (PrimitiveKey::Line(id), PolygonKind::Mask) => self.lines.get_mut(&id)?.mask.as_mut(),
            (PrimitiveKey::Region(id), PolygonKind::Outline) => {
                Some(&mut self.regions.get_mut(&id)?.outline)
            }
            _ => None,
        }
    }

    /// Replaces (or clears) a polygon wholesale. Region outlines cannot be
    /// cleared.
    pub fn set_polygon(&mut self, target: &PolygonRef, polygon: Option<Polygon>) -> bool {
        match (target.key, target.kind) {
            (PrimitiveKey::Line(id), PolygonKind::Baseline) => match self.lines.get_mut(&id) {
                Some(line) => {
                    line.baseline = polygon;
                    true
                }
                None => false,
            },
            (PrimitiveKey::Line(id), PolygonKind::Mask) => match self.lines.get_mut(&id) {
                Some(line) => {
                    line.mask = polygon;
                    true
                }
                None => false,
            },
            (PrimitiveKey::Region(id), PolygonKind::Outline) => {
                match (self.regions.get_mut(&id), polygon) {
                    (Some(region), Some(outline)) => {
                        region.outline = outline;
                        true
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }

    pub fn append_point(&mut self, line: LocalId, point: Point) -> bool {
        match self.polygon_mut(&PolygonRef::baseline(line)) {
            Some(baseline) => {
                baseline.push(point);
                true
            }
            None => false,
        }
    }

    pub fn insert_point(&mut self, target: &PolygonRef, index: usize, point: Point) -> bool {
        self.polygon_mut(target)
            .is_some_and(|poly| poly.insert_point(index, point))
    }

    /// Deletes an interior point. Endpoints and points whose removal would
    /// leave a closed polygon with fewer than three vertices are kept.
    pub fn delete_point(&mut self, target: &PolygonRef, index: usize) -> bool {
        if !self.can_delete_point(target, index) {
            return false;
        }
        self.polygon_mut(target)
            .is_some_and(|poly| poly.delete_point(index))
    }

    pub fn can_delete_point(&self, target: &PolygonRef, index: usize) -> bool {
        self.polygon(target).is_some_and(|poly| {
            index > 0 && index + 1 < poly.len() && poly.len() > target.kind.min_len()
        })
    }

    pub fn move_point(&mut self, target: &PolygonRef, index: usize, point: Point) -> bool {
        self.polygon_mut(target)
            .is_some_and(|poly| poly.move_point(index, point))
    }

    /// Moves every polygon of the given primitives. Returns how many
    /// primitives were found.
    pub fn translate(&mut self, keys: &[PrimitiveKey], delta: Point) -> usize {
        let mut moved = 0;
        for key in keys {
            match key {
                PrimitiveKey::Line(id) => {
                    if let Some(line) = self.lines.get_mut(id) {
                        line.baseline.iter_mut().for_each(|b| b.translate(delta));
                        line.mask.iter_mut().for_each(|m| m.translate(delta));
                        moved += 1;
                    }
                }
                PrimitiveKey::Region(id) => {
                    if let Some(region) = self.regions.get_mut(id) {
                        region.outline.translate(delta);
                        moved += 1;
                    }
                }
            }
        }
        moved
    }

    /// Detaches a primitive from the model and the selection.
    ///
    /// Removing a region unlinks its lines; the lines themselves stay.
    pub fn remove(&mut self, key: PrimitiveKey) -> Option<Removed> {
        let removed = match key {
            PrimitiveKey::Line(id) => Removed::Line(self.lines.remove(&id)?),
            PrimitiveKey::Region(id) => {
                let region = self.regions.remove(&id)?;
                let mut detached = Vec::new();
                for line in self.lines.values_mut() {
                    if line.region == Some(id) {
                        line.region = None;
                        detached.push(line.key);
                    }
                }
                Removed::Region { region, detached }
            }
        };
        self.selection.unselect(key);
        tracing::debug!("Removed {}", key);
        Some(removed)
    }

    pub fn simplify_line(&mut self, line: LocalId, tolerance: f64) -> bool {
        self.polygon_mut(&PolygonRef::baseline(line))
            .is_some_and(|b| b.simplify(tolerance))
    }

    /// Changes a line's region. Returns the previous assignment, or `None`
    /// when the line or the target region does not exist.
    pub fn assign_region(
        &mut self,
        line: LocalId,
        region: Option<LocalId>,
    ) -> Option<Option<LocalId>> {
        if region.is_some_and(|r| !self.regions.contains_key(&r)) {
            return None;
        }
        let line = self.lines.get_mut(&line)?;
        Some(std::mem::replace(&mut line.region, region))
    }

    /// First region (in creation order) whose outline contains `point`.
    pub fn region_at(&self, point: &Point) -> Option<LocalId> {
        self.regions
            .values()
            .find(|r| r.contains(point))
            .map(|r| r.key)
    }

    /// Position of a line in reading order.
    pub fn line_index(&self, line: LocalId) -> Option<usize> {
        self.lines_in_order().iter().position(|l| l.key == line)
    }

    /// Moves a line to `to` in reading order and renumbers every line.
    /// Returns its previous index.
    pub fn move_line(&mut self, line: LocalId, to: usize) -> Option<usize> {
        let mut ordered: Vec<LocalId> = self.lines_in_order().iter().map(|l| l.key).collect();
        let from = ordered.iter().position(|k| *k == line)?;
        let to = to.min(ordered.len() - 1);
        ordered.remove(from);
        ordered.insert(to, line);
        for (index, key) in ordered.iter().enumerate() {
            if let Some(l) = self.lines.get_mut(key) {
                l.order = index;
            }
        }
        Some(from)
    }

    /// Line following `line` in reading order.
    pub fn next_line(&self, line: LocalId) -> Option<LocalId> {
        let ordered = self.lines_in_order();
        let index = ordered.iter().position(|l| l.key == line)?;
        ordered.get(index + 1).map(|l| l.key)
    }

    pub fn bounds_of(&self, key: PrimitiveKey) -> Option<Bounds> {
        match key {
            PrimitiveKey::Line(id) => self.lines.get(&id)?.bounds(),
            PrimitiveKey::Region(id) => self.regions.get(&id)?.outline.bounds(),
        }
    }

    /// Primitives with a polygon crossing or inside `rect`, in creation order.
    pub fn intersecting(&self, rect: &Bounds) -> Vec<PrimitiveKey> {
        self.keys()
            .into_iter()
            .filter(|key| match key {
                PrimitiveKey::Line(id) => self.lines.get(id).is_some_and(|line| {
                    line.polygons()
                        .iter()
                        .any(|(r, p)| path_intersects_rect(p.points(), rect, r.kind.is_closed()))
                }),
                PrimitiveKey::Region(id) => self
                    .regions
                    .get(id)
                    .is_some_and(|r| path_intersects_rect(r.outline.points(), rect, true)),
            })
            .collect()
    }

    pub fn remote_id(&self, key: PrimitiveKey) -> Option<RemoteId> {
        match key {
            PrimitiveKey::Line(id) => self.lines.get(&id)?.pk,
            PrimitiveKey::Region(id) => self.regions.get(&id)?.pk,
        }
    }

    /// Records the service id of a primitive. Geometry is untouched.
    pub fn set_remote_id(&mut self, key: PrimitiveKey, pk: RemoteId) -> bool {
        match key {
            PrimitiveKey::Line(id) => self.lines.get_mut(&id).map(|l| l.pk = Some(pk)).is_some(),
            PrimitiveKey::Region(id) => {
                self.regions.get_mut(&id).map(|r| r.pk = Some(pk)).is_some()
            }
        }
    }

    pub fn line_by_remote(&self, pk: RemoteId) -> Option<LocalId> {
        self.lines.values().find(|l| l.pk == Some(pk)).map(|l| l.key)
    }

    pub fn region_by_remote(&self, pk: RemoteId) -> Option<LocalId> {
        self.regions.values().find(|r| r.pk == Some(pk)).map(|r| r.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(model: &mut PartModel, raw: &[(f64, f64)]) -> LocalId {
        let id = model.create_line(Point::new(raw[0].0, raw[0].1));
        for &(x, y) in &raw[1..] {
            model.append_point(id, Point::new(x, y));
        }
        id
    }

    fn square(model: &mut PartModel, x: f64, y: f64, size: f64) -> LocalId {
        model.create_region(Polygon::rectangle(
            Point::new(x, y),
            Point::new(x + size, y + size),
        ))
    }

    #[test]
    fn test_create_line_starts_unsaved_with_origin() {
        let mut model = PartModel::new();
        let id = model.create_line(Point::new(10.0, 10.0));
        let line = model.line(id).unwrap();
        assert_eq!(line.pk, None);
        assert_eq!(line.baseline.as_ref().unwrap().len(), 1);
        assert_eq!(line.order, 0);
    }

    #[test]
    fn test_delete_point_protects_endpoints() {
        let mut model = PartModel::new();
        let id = baseline(&mut model, &[(0.0, 0.0), (5.0, 5.0), (10.0, 0.0)]);
        let target = PolygonRef::baseline(id);

        assert!(!model.delete_point(&target, 0));
        assert!(!model.delete_point(&target, 2));
        assert_eq!(model.polygon(&target).unwrap().len(), 3);
        assert!(model.delete_point(&target, 1));
        assert_eq!(model.polygon(&target).unwrap().len(), 2);
    }

    #[test]
    fn test_closed_outline_keeps_three_points() {
        let mut model = PartModel::new();
        let region = model.create_region(Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(5.0, 10.0),
        ]));
        assert!(!model.delete_point(&PolygonRef::outline(region), 1));
    }

    #[test]
    fn test_translate_moves_every_polygon() {
        let mut model = PartModel::new();
        let line = baseline(&mut model, &[(0.0, 0.0), (10.0, 0.0)]);
        model.line_mut(line).unwrap().mask = Some(Polygon::rectangle(
            Point::new(0.0, -5.0),
            Point::new(10.0, 5.0),
        ));
        let region = square(&mut model, 0.0, 0.0, 20.0);

        let moved = model.translate(
            &[PrimitiveKey::Line(line), PrimitiveKey::Region(region)],
            Point::new(3.0, 4.0),
        );

        assert_eq!(moved, 2);
        let l = model.line(line).unwrap();
        assert_eq!(l.baseline.as_ref().unwrap().points()[0], Point::new(3.0, 4.0));
        assert_eq!(l.bounds().unwrap().min_y, -1.0);
        assert_eq!(model.region(region).unwrap().outline.bounds().unwrap().min_x, 3.0);
    }

    #[test]
    fn test_removing_region_unlinks_lines() {
        let mut model = PartModel::new();
        let a = square(&mut model, 0.0, 0.0, 100.0);
        let _b = square(&mut model, 200.0, 0.0, 100.0);
        let line = baseline(&mut model, &[(10.0, 10.0), (90.0, 10.0)]);
        model.assign_region(line, Some(a));
        model.selection_mut().select(PrimitiveKey::Region(a), false);

        let removed = model.remove(PrimitiveKey::Region(a)).unwrap();

        assert!(matches!(removed, Removed::Region { ref detached, .. } if detached == &vec![line]));
        assert_eq!(model.line(line).unwrap().region, None);
        assert!(model.selection().is_empty());
        assert!(model.contains(PrimitiveKey::Line(line)));
    }

    #[test]
    fn test_restore_region_relinks_detached_lines() {
        let mut model = PartModel::new();
        let region = square(&mut model, 0.0, 0.0, 100.0);
        let line = baseline(&mut model, &[(10.0, 10.0), (90.0, 10.0)]);
        model.assign_region(line, Some(region));

        let Some(Removed::Region { region: snapshot, detached }) =
            model.remove(PrimitiveKey::Region(region))
        else {
            panic!("expected a region");
        };
        model.restore_region(snapshot, &detached);

        assert_eq!(model.line(line).unwrap().region, Some(region));
    }

    #[test]
    fn test_assign_region_rejects_unknown_region() {
        let mut model = PartModel::new();
        let line = baseline(&mut model, &[(0.0, 0.0), (1.0, 0.0)]);
        assert_eq!(model.assign_region(line, Some(LocalId(99))), None);
        assert_eq!(model.assign_region(line, None), Some(None));
    }

    #[test]
    fn test_move_line_renumbers() {
        let mut model = PartModel::new();
        let ids: Vec<LocalId> = (0..6)
            .map(|i| baseline(&mut model, &[(0.0, i as f64 * 10.0), (50.0, i as f64 * 10.0)]))
            .collect();

        assert_eq!(model.move_line(ids[2], 5), Some(2));
        assert_eq!(model.line_index(ids[2]), Some(5));
        assert_eq!(model.line_index(ids[3]), Some(2));

        assert_eq!(model.move_line(ids[2], 2), Some(5));
        let order: Vec<LocalId> = model.lines_in_order().iter().map(|l| l.key).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn test_intersecting_finds_crossing_primitives() {
        let mut model = PartModel::new();
        let inside = baseline(&mut model, &[(10.0, 10.0), (40.0, 10.0)]);
        let _outside = baseline(&mut model, &[(500.0, 500.0), (600.0, 500.0)]);
        let region = square(&mut model, 30.0, 0.0, 50.0);

        let hits = model.intersecting(&Bounds::new(0.0, 0.0, 35.0, 20.0));
        assert_eq!(
            hits,
            vec![PrimitiveKey::Line(inside), PrimitiveKey::Region(region)]
        );
    }

    #[test]
    fn test_region_at_and_remote_lookup() {
        let mut model = PartModel::new();
        let region = square(&mut model, 0.0, 0.0, 50.0);
        assert_eq!(model.region_at(&Point::new(25.0, 25.0)), Some(region));
        assert_eq!(model.region_at(&Point::new(75.0, 25.0)), None);

        assert!(model.set_remote_id(PrimitiveKey::Region(region), 42));
        assert_eq!(model.region_by_remote(42), Some(region));
        assert!(!model.set_remote_id(PrimitiveKey::Line(LocalId(77)), 1));
    }
}
