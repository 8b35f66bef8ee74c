//! Line rendering capabilities and drawing-surface handle lookup.
//!
//! A [`RenderableLine`] computes where a line is drawn and where it can be
//! hit; the baseline and mask renderers implement it independently. Drawing
//! surfaces never own primitives: [`SurfaceHandles`] maps primitive keys to
//! opaque handles and the model stays the single source of geometry.

use std::collections::HashMap;

use folium_core::{Bounds, LocalId, Point, PrimitiveKey, ScaleTransform};
use folium_settings::ReadDirection;

use crate::model::{Line, PartModel};

/// Parameters shared by every line layout of a panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    pub scale: ScaleTransform,
    pub direction: ReadDirection,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            scale: ScaleTransform::identity(),
            direction: ReadDirection::Ltr,
        }
    }
}

/// Where and how a line is drawn, in unzoomed panel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LineLayout {
    pub key: LocalId,
    pub path: Vec<Point>,
    pub closed: bool,
    /// Start of the text, on the reading-direction side.
    pub text_anchor: Point,
    /// Text rotation in radians.
    pub angle: f64,
}

pub trait RenderableLine {
    fn name(&self) -> &'static str;

    /// `None` when the line lacks the geometry this renderer draws.
    fn compute_layout(&self, line: &Line, ctx: &RenderContext) -> Option<LineLayout>;

    /// Screen-space box that reacts to the pointer.
    fn hit_area(&self, line: &Line, ctx: &RenderContext) -> Option<Bounds> {
        self.compute_layout(line, ctx)
            .and_then(|layout| Bounds::from_points(&layout.path))
    }
}

/// Draws text along the baseline.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineRenderer {
    /// Vertical padding added around the baseline's hit area.
    pub hit_padding: f64,
}

impl RenderableLine for BaselineRenderer {
    fn name(&self) -> &'static str {
        "baseline"
    }

    fn compute_layout(&self, line: &Line, ctx: &RenderContext) -> Option<LineLayout> {
        let baseline = line.baseline.as_ref().filter(|b| b.len() >= 2)?;
        let path = ctx.scale.path_to_screen(baseline.points());
        let (first, last) = (*path.first()?, *path.last()?);
        let (start, end) = match ctx.direction {
            ReadDirection::Ltr => (first, last),
            ReadDirection::Rtl => (last, first),
        };
        let d = end - start;
        Some(LineLayout {
            key: line.key,
            path,
            closed: false,
            text_anchor: start,
            angle: d.y.atan2(d.x),
        })
    }

    fn hit_area(&self, line: &Line, ctx: &RenderContext) -> Option<Bounds> {
        let layout = self.compute_layout(line, ctx)?;
        Bounds::from_points(&layout.path).map(|b| b.expand(self.hit_padding))
    }
}

/// Fills the mask polygon and places text at its leading edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskRenderer;

impl RenderableLine for MaskRenderer {
    fn name(&self) -> &'static str {
        "mask"
    }

    fn compute_layout(&self, line: &Line, ctx: &RenderContext) -> Option<LineLayout> {
        let mask = line.mask.as_ref().filter(|m| m.len() >= 3)?;
        let path = ctx.scale.path_to_screen(mask.points());
        let bounds = Bounds::from_points(&path)?;
        let middle = (bounds.min_y + bounds.max_y) / 2.0;
        let text_anchor = match ctx.direction {
            ReadDirection::Ltr => Point::new(bounds.min_x, middle),
            ReadDirection::Rtl => Point::new(bounds.max_x, middle),
        };
        Some(LineLayout {
            key: line.key,
            path,
            closed: true,
            text_anchor,
            angle: 0.0,
        })
    }
}

/// Opaque drawing-surface object id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

/// Index from primitive key to drawing handle.
#[derive(Debug, Default)]
pub struct SurfaceHandles {
    handles: HashMap<PrimitiveKey, HandleId>,
    next: u64,
}

impl SurfaceHandles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of `key`, allocating one on first use.
    pub fn attach(&mut self, key: PrimitiveKey) -> HandleId {
        let next = &mut self.next;
        *self.handles.entry(key).or_insert_with(|| {
            *next += 1;
            HandleId(*next)
        })
    }

    pub fn get(&self, key: PrimitiveKey) -> Option<HandleId> {
        self.handles.get(&key).copied()
    }

    pub fn key_of(&self, handle: HandleId) -> Option<PrimitiveKey> {
        self.handles
            .iter()
            .find(|(_, h)| **h == handle)
            .map(|(key, _)| *key)
    }

    pub fn detach(&mut self, key: PrimitiveKey) -> Option<HandleId> {
        self.handles.remove(&key)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Attaches handles for new primitives and drops those whose primitive
    /// left the model. Returns the dropped handles.
    pub fn sync(&mut self, model: &PartModel) -> Vec<HandleId> {
        let mut dropped = Vec::new();
        self.handles.retain(|key, handle| {
            let alive = model.contains(*key);
            if !alive {
                dropped.push(*handle);
            }
            alive
        });
        for key in model.keys() {
            self.attach(key);
        }
        dropped
    }
}
