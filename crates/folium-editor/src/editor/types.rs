//! Editor input and state type definitions: Modifiers, PointerEvent, Key,
//! KeyEvent, Interaction, DeletePointControl, ViewMapping.

use folium_core::{shared, Point, PrimitiveKey, ScaleTransform, Shared};

use crate::commands::FieldValue;
use crate::model::{Polygon, PolygonRef};
use crate::viewport::ViewportState;

/// Modifier keys held during an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }
}

/// Pointer input in container (screen) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: Point,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Delete,
    Backspace,
    Escape,
    Enter,
    Tab,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::ctrl(),
        }
    }
}

/// State of the segmentation editor's interaction machine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    /// Building a new line (appending points) or region (stretching a
    /// rectangle from `origin`).
    Drawing { key: PrimitiveKey, origin: Point },
    /// Moving one vertex; `previous` restores it on cancel.
    DraggingPoint {
        target: PolygonRef,
        index: usize,
        previous: Polygon,
        moved: bool,
    },
    /// Moving every selected primitive together.
    DraggingSelection {
        last: Point,
        previous: Vec<(PrimitiveKey, Vec<FieldValue>)>,
        moved: bool,
    },
    /// Shift-drag marquee, in image coordinates.
    BoxSelecting { origin: Point, current: Point },
    /// Cut tool segment, in image coordinates.
    Cutting { start: Point, end: Point },
}

impl Interaction {
    pub fn name(&self) -> &'static str {
        match self {
            Interaction::Idle => "idle",
            Interaction::Drawing { .. } => "drawing",
            Interaction::DraggingPoint { .. } => "dragging-point",
            Interaction::DraggingSelection { .. } => "dragging-selection",
            Interaction::BoxSelecting { .. } => "box-selecting",
            Interaction::Cutting { .. } => "cutting",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Interaction::Idle)
    }
}

/// Transient "delete point" control shown above an interior vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeletePointControl {
    pub target: PolygonRef,
    pub index: usize,
    /// Screen position of the control.
    pub anchor: Point,
}

/// Maps container coordinates to image pixels through the shared viewport
/// transform and the image display ratio.
#[derive(Debug, Clone)]
pub struct ViewMapping {
    viewport: Shared<ViewportState>,
    image: ScaleTransform,
}

impl ViewMapping {
    pub fn new(viewport: Shared<ViewportState>, image: ScaleTransform) -> Self {
        Self { viewport, image }
    }

    /// Unzoomed, unscaled mapping: screen coordinates are image pixels.
    pub fn identity() -> Self {
        Self::new(shared(ViewportState::default()), ScaleTransform::identity())
    }

    pub fn set_image_scale(&mut self, image: ScaleTransform) {
        self.image = image;
    }

    pub fn image_scale(&self) -> ScaleTransform {
        self.image
    }

    pub fn viewport(&self) -> ViewportState {
        *self.viewport.borrow()
    }

    pub fn screen_to_image(&self, p: &Point) -> Point {
        let content = self.viewport.borrow().screen_to_content(p);
        self.image.to_image(&content)
    }

    pub fn image_to_screen(&self, p: &Point) -> Point {
        let content = self.image.to_screen(p);
        self.viewport.borrow().content_to_screen(&content)
    }

    /// Converts a screen distance to image pixels at the current zoom.
    pub fn length_to_image(&self, length: f64) -> f64 {
        self.image.length_to_image(length) / self.viewport.borrow().scale
    }
}

impl Default for ViewMapping {
    fn default() -> Self {
        Self::identity()
    }
}
