//! Viewport transform engine shared by the display panels of one session.
//!
//! A single [`ViewportState`] (scale, offset, rotation) drives every
//! registered surface. Wheel and drag gestures arrive from an originating
//! surface, update the state, clamp it so the content never leaves a gap
//! inside its container, and push the same transform to every surface
//! before the call returns.
//!
//! Content coordinates map to container coordinates as
//!
//! ```text
//! screen = offset + scale * rotate(content, center, angle)
//! ```
//!
//! so zooming around a cursor `P` keeps the content under `P` fixed with
//! `offset' = P - (P - offset) * scale' / scale`.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use folium_core::{AppEvent, EventBus, Point, Shared, ViewportEvent};
use folium_settings::ViewportSettings;

const SCALE_EPSILON: f64 = 1e-9;

/// Transform shared by all surfaces of a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub scale: f64,
    pub offset: Point,
    /// Rotation in radians around the content center.
    pub angle: f64,
    /// Untransformed width of the displayed content.
    pub width: f64,
    /// Untransformed height of the displayed content.
    pub height: f64,
}

impl ViewportState {
    pub fn new(scale: f64, width: f64, height: f64) -> Self {
        Self {
            scale,
            offset: Point::new(0.0, 0.0),
            angle: 0.0,
            width,
            height,
        }
    }

    /// Center of the untransformed content.
    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// Converts content coordinates to container coordinates.
    pub fn content_to_screen(&self, p: &Point) -> Point {
        let rotated = if self.angle == 0.0 {
            *p
        } else {
            p.rotate_around(&self.center(), self.angle)
        };
        self.offset + rotated * self.scale
    }

    /// Converts container coordinates to content coordinates.
    pub fn screen_to_content(&self, p: &Point) -> Point {
        let unscaled = (*p - self.offset) * (1.0 / self.scale);
        if self.angle == 0.0 {
            unscaled
        } else {
            unscaled.rotate_around(&self.center(), -self.angle)
        }
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }
}

/// A display surface that follows the shared transform.
pub trait TransformTarget {
    /// Applies the transform. Called synchronously on every update.
    fn apply_transform(&mut self, state: &ViewportState);

    /// Shows or hides the overview indicator of a `map` surface.
    fn set_overview_visible(&mut self, _visible: bool) {}
}

/// Target that copies the transform into shared state, letting the
/// segmentation editor read the current mapping without owning the viewport.
#[derive(Debug, Clone)]
pub struct ViewportMirror {
    state: Shared<ViewportState>,
}

impl ViewportMirror {
    pub fn new(state: Shared<ViewportState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> ViewportState {
        *self.state.borrow()
    }
}

impl TransformTarget for ViewportMirror {
    fn apply_transform(&mut self, state: &ViewportState) {
        *self.state.borrow_mut() = *state;
    }
}

/// Registration options of a surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceOptions {
    /// Follows updates but never originates gestures.
    pub mirror: bool,
    /// Carries an overview indicator that fades in while zooming.
    pub map: bool,
}

impl SurfaceOptions {
    pub fn mirror() -> Self {
        Self {
            mirror: true,
            map: false,
        }
    }
}

/// Handle of a registered surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Wheel input at a container position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub position: Point,
    /// Wheel notches; positive zooms in.
    pub delta: f64,
}

/// Pointer position during a drag gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragEvent {
    pub position: Point,
    /// Modifier held: rotate instead of translating.
    pub rotate: bool,
}

struct Surface {
    id: SurfaceId,
    options: SurfaceOptions,
    target: Box<dyn TransformTarget>,
}

#[derive(Debug, Clone, Copy)]
struct DragAnchor {
    last: Point,
}

/// Shared zoom/pan/rotate engine.
pub struct Viewport {
    settings: ViewportSettings,
    state: ViewportState,
    surfaces: Vec<Surface>,
    next_surface: u64,
    enabled: bool,
    drag: Option<DragAnchor>,
    overview_visible: bool,
    last_activity: Option<Instant>,
    bus: Arc<EventBus>,
}

impl Viewport {
    /// Creates a viewport for content of the given untransformed size.
    pub fn new(settings: ViewportSettings, width: f64, height: f64, bus: Arc<EventBus>) -> Self {
        let state = ViewportState::new(settings.initial_scale, width, height);
        Self {
            settings,
            state,
            surfaces: Vec::new(),
            next_surface: 1,
            enabled: true,
            drag: None,
            overview_visible: false,
            last_activity: None,
            bus,
        }
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn settings(&self) -> &ViewportSettings {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn overview_visible(&self) -> bool {
        self.overview_visible
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Attaches a surface; it immediately receives the current transform.
    pub fn register(
        &mut self,
        mut target: Box<dyn TransformTarget>,
        options: SurfaceOptions,
    ) -> SurfaceId {
        let id = SurfaceId(self.next_surface);
        self.next_surface += 1;
        target.apply_transform(&self.state);
        if options.map {
            target.set_overview_visible(self.overview_visible);
        }
        tracing::debug!("Registered {} (mirror: {}, map: {})", id, options.mirror, options.map);
        self.surfaces.push(Surface {
            id,
            options,
            target,
        });
        id
    }

    pub fn unregister(&mut self, id: SurfaceId) -> bool {
        let before = self.surfaces.len();
        self.surfaces.retain(|s| s.id != id);
        before != self.surfaces.len()
    }

    /// Updates the untransformed content size (e.g. after the image loads).
    pub fn set_content_size(&mut self, width: f64, height: f64) {
        self.state.width = width;
        self.state.height = height;
        self.clamp();
        self.broadcast();
    }

    /// Zooms by the configured factor per wheel notch, keeping the content
    /// under the cursor fixed. Returns false when the gesture was ignored.
    pub fn scroll(&mut self, origin: SurfaceId, event: &WheelEvent) -> bool {
        if !self.accepts_input(origin) {
            return false;
        }
        let factor = self.settings.wheel_factor.powf(event.delta);
        let changed = self.zoom_around(self.state.scale * factor, event.position);
        self.touch_overview();
        changed
    }

    /// Sets the scale programmatically around a container point.
    pub fn zoom_to(&mut self, scale: f64, anchor: Point) -> bool {
        self.zoom_around(scale, anchor)
    }

    pub fn begin_drag(&mut self, origin: SurfaceId, event: &DragEvent) -> bool {
        if !self.accepts_input(origin) {
            return false;
        }
        self.drag = Some(DragAnchor {
            last: event.position,
        });
        true
    }

    /// Translates by the pointer delta, or rotates around the container
    /// center when the modifier is held.
    pub fn drag(&mut self, event: &DragEvent) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(anchor) = self.drag else {
            return false;
        };
        self.drag = Some(DragAnchor {
            last: event.position,
        });

        let before = self.state;
        if event.rotate {
            let center = self.state.center();
            let from = anchor.last - center;
            let to = event.position - center;
            self.state.angle += to.y.atan2(to.x) - from.y.atan2(from.x);
        } else {
            self.state.offset = self.state.offset + (event.position - anchor.last);
        }
        self.clamp();
        if self.state == before {
            return false;
        }
        self.broadcast();
        true
    }

    pub fn end_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    /// Restores the initial scale and a zero offset and angle.
    pub fn reset(&mut self) {
        self.state.scale = self.settings.initial_scale;
        self.state.offset = Point::new(0.0, 0.0);
        self.state.angle = 0.0;
        self.drag = None;
        self.clamp();
        self.bus.publish(AppEvent::Viewport(ViewportEvent::Reset));
        self.broadcast();
    }

    /// Suppresses every gesture until [`enable`](Self::enable).
    pub fn disable(&mut self) {
        self.enabled = false;
        self.drag = None;
        tracing::debug!("Viewport gestures disabled");
    }

    pub fn enable(&mut self) {
        self.enabled = true;
        tracing::debug!("Viewport gestures enabled");
    }

    /// Hides the overview indicator once the fade delay elapsed since the
    /// last zoom. Returns true when visibility changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(last) = self.last_activity else {
            return false;
        };
        if !self.overview_visible {
            return false;
        }
        if now.saturating_duration_since(last) < Duration::from_millis(self.settings.map_fade_ms)
        {
            return false;
        }
        self.last_activity = None;
        self.set_overview(false);
        true
    }

    fn accepts_input(&self, origin: SurfaceId) -> bool {
        if !self.enabled {
            return false;
        }
        match self.surfaces.iter().find(|s| s.id == origin) {
            Some(surface) if !surface.options.mirror => true,
            Some(_) => {
                tracing::trace!("Ignoring gesture from mirror {}", origin);
                false
            }
            None => {
                tracing::warn!("Gesture from unregistered {}", origin);
                false
            }
        }
    }

    fn zoom_around(&mut self, scale: f64, anchor: Point) -> bool {
        let old = self.state.scale;
        let new = scale.clamp(self.settings.min_scale, self.settings.max_scale);
        if (new - old).abs() < SCALE_EPSILON {
            return false;
        }
        self.state.offset = anchor - (anchor - self.state.offset) * (new / old);
        self.state.scale = new;
        self.clamp();
        self.broadcast();
        true
    }

    fn clamp(&mut self) {
        let s = self.state.scale;
        self.state.offset.x = clamp_axis(self.state.offset.x, self.state.width, s);
        self.state.offset.y = clamp_axis(self.state.offset.y, self.state.height, s);
    }

    fn touch_overview(&mut self) {
        if !self.surfaces.iter().any(|s| s.options.map) {
            return;
        }
        self.last_activity = Some(Instant::now());
        if !self.overview_visible {
            self.set_overview(true);
        }
    }

    fn set_overview(&mut self, visible: bool) {
        self.overview_visible = visible;
        for surface in self.surfaces.iter_mut().filter(|s| s.options.map) {
            surface.target.set_overview_visible(visible);
        }
        self.bus
            .publish(AppEvent::Viewport(ViewportEvent::OverviewVisibility { visible }));
    }

    fn broadcast(&mut self) {
        for surface in &mut self.surfaces {
            surface.target.apply_transform(&self.state);
        }
        self.bus.publish(AppEvent::Viewport(ViewportEvent::Updated {
            scale: self.state.scale,
            offset_x: self.state.offset.x,
            offset_y: self.state.offset.y,
            angle: self.state.angle,
        }));
    }
}

impl fmt::Debug for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewport")
            .field("state", &self.state)
            .field("surfaces", &self.surfaces.len())
            .field("enabled", &self.enabled)
            .field("dragging", &self.drag.is_some())
            .finish()
    }
}

/// Keeps the scaled content covering `[0, size]` when zoomed in, and inside
/// it when zoomed out.
fn clamp_axis(offset: f64, size: f64, scale: f64) -> f64 {
    let span = size * (scale - 1.0);
    if scale >= 1.0 {
        offset.clamp(-span, 0.0)
    } else {
        offset.clamp(0.0, -span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folium_core::{shared, EventBusConfig, EventCategory};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder {
        states: Rc<RefCell<Vec<ViewportState>>>,
        overview: Rc<RefCell<Vec<bool>>>,
    }

    impl TransformTarget for Recorder {
        fn apply_transform(&mut self, state: &ViewportState) {
            self.states.borrow_mut().push(*state);
        }

        fn set_overview_visible(&mut self, visible: bool) {
            self.overview.borrow_mut().push(visible);
        }
    }

    fn viewport() -> (Viewport, SurfaceId) {
        let bus = Arc::new(EventBus::with_config(EventBusConfig {
            history_size: 32,
            ..Default::default()
        }));
        let mut vp = Viewport::new(ViewportSettings::default(), 800.0, 600.0, bus);
        let id = vp.register(Box::new(Recorder::default()), SurfaceOptions::default());
        (vp, id)
    }

    #[test]
    fn test_scroll_keeps_cursor_point_fixed() {
        let (mut vp, id) = viewport();
        let cursor = Point::new(200.0, 150.0);
        let before = vp.state().screen_to_content(&cursor);

        assert!(vp.scroll(
            id,
            &WheelEvent {
                position: cursor,
                delta: 3.0
            }
        ));

        let after = vp.state().content_to_screen(&before);
        assert!(after.distance_to(&cursor) < 1e-6);
        assert!((vp.state().scale - 1.1f64.powi(3)).abs() < 1e-9);
    }

    #[test]
    fn test_scroll_is_clamped_to_scale_bounds() {
        let (mut vp, id) = viewport();
        let at = Point::new(10.0, 10.0);
        vp.scroll(id, &WheelEvent { position: at, delta: 100.0 });
        assert_eq!(vp.state().scale, 10.0);

        vp.scroll(id, &WheelEvent { position: at, delta: -200.0 });
        assert_eq!(vp.state().scale, 1.0);
        assert_eq!(vp.state().offset, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_drag_at_min_scale_is_absorbed() {
        let (mut vp, id) = viewport();
        let start = Point::new(100.0, 100.0);
        assert!(vp.begin_drag(id, &DragEvent { position: start, rotate: false }));
        let moved = vp.drag(&DragEvent {
            position: Point::new(150.0, 150.0),
            rotate: false,
        });
        vp.end_drag();

        assert!(!moved);
        assert_eq!(vp.state().offset, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_drag_translates_when_zoomed() {
        let (mut vp, id) = viewport();
        vp.zoom_to(2.0, Point::new(400.0, 300.0));
        let offset = vp.state().offset;

        vp.begin_drag(id, &DragEvent { position: Point::new(0.0, 0.0), rotate: false });
        vp.drag(&DragEvent { position: Point::new(-30.0, 20.0), rotate: false });

        assert_eq!(vp.state().offset, offset + Point::new(-30.0, 20.0));
    }

    #[test]
    fn test_drag_with_modifier_rotates() {
        let (mut vp, id) = viewport();
        let center = vp.state().center();
        vp.begin_drag(id, &DragEvent { position: center + Point::new(100.0, 0.0), rotate: true });
        vp.drag(&DragEvent { position: center + Point::new(0.0, 100.0), rotate: true });

        assert!((vp.state().angle - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert_eq!(vp.state().offset, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_mirror_follows_but_does_not_originate() {
        let (mut vp, _) = viewport();
        let mirror = Recorder::default();
        let mirror_id = vp.register(Box::new(mirror.clone()), SurfaceOptions::mirror());

        assert!(!vp.scroll(
            mirror_id,
            &WheelEvent { position: Point::new(0.0, 0.0), delta: 1.0 }
        ));
        vp.zoom_to(3.0, Point::new(10.0, 10.0));

        let last = *mirror.states.borrow().last().unwrap();
        assert_eq!(last, *vp.state());
    }

    #[test]
    fn test_shared_mirror_sees_current_state() {
        let (mut vp, _) = viewport();
        let cell = shared(ViewportState::default());
        vp.register(Box::new(ViewportMirror::new(cell.clone())), SurfaceOptions::mirror());
        vp.zoom_to(4.0, Point::new(0.0, 0.0));
        assert_eq!(cell.borrow().scale, 4.0);
    }

    #[test]
    fn test_disable_suppresses_gestures() {
        let (mut vp, id) = viewport();
        vp.disable();
        assert!(!vp.scroll(id, &WheelEvent { position: Point::new(0.0, 0.0), delta: 1.0 }));
        assert!(!vp.begin_drag(id, &DragEvent { position: Point::new(0.0, 0.0), rotate: false }));
        assert_eq!(vp.state().scale, 1.0);

        vp.enable();
        assert!(vp.scroll(id, &WheelEvent { position: Point::new(0.0, 0.0), delta: 1.0 }));
    }

    #[test]
    fn test_reset_restores_initial_transform() {
        let (mut vp, _) = viewport();
        vp.zoom_to(5.0, Point::new(300.0, 300.0));
        vp.reset();
        assert_eq!(vp.state().scale, 1.0);
        assert_eq!(vp.state().offset, Point::new(0.0, 0.0));
        assert_eq!(vp.state().angle, 0.0);
    }

    #[test]
    fn test_overview_fades_after_inactivity() {
        let (mut vp, id) = viewport();
        let map = Recorder::default();
        vp.register(
            Box::new(map.clone()),
            SurfaceOptions { mirror: true, map: true },
        );

        vp.scroll(id, &WheelEvent { position: Point::new(0.0, 0.0), delta: 1.0 });
        assert!(vp.overview_visible());
        assert!(!vp.tick(Instant::now()));

        let later = Instant::now() + Duration::from_millis(1600);
        assert!(vp.tick(later));
        assert!(!vp.overview_visible());
        assert_eq!(*map.overview.borrow(), vec![false, true, false]);
    }

    #[test]
    fn test_updates_are_published() {
        let (mut vp, _) = viewport();
        vp.zoom_to(2.0, Point::new(0.0, 0.0));
        let events = vp.bus.history_of(EventCategory::Viewport);
        assert!(matches!(
            events.last(),
            Some(AppEvent::Viewport(ViewportEvent::Updated { scale, .. })) if *scale == 2.0
        ));
    }

    #[test]
    fn test_clamp_axis_bounds() {
        assert_eq!(clamp_axis(10.0, 100.0, 2.0), 0.0);
        assert_eq!(clamp_axis(-150.0, 100.0, 2.0), -100.0);
        assert_eq!(clamp_axis(-10.0, 100.0, 0.5), 0.0);
        assert_eq!(clamp_axis(80.0, 100.0, 0.5), 50.0);
    }
}
