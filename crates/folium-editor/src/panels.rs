//! Display panels of the part view.
//!
//! Each panel implements [`Panel`] on its own; [`PanelLayout`] holds them,
//! restores their open state from the preference store and writes it back
//! when the user toggles one.

use folium_core::{Bounds, LocalId, PartId, Point, ScaleTransform};
use folium_settings::{PreferenceStore, UiSettings};

use crate::model::PartModel;
use crate::part::ImageRef;
use crate::render::{LineLayout, RenderContext, RenderableLine, SurfaceHandles};
use crate::transcription::LayerId;

pub trait Panel {
    fn name(&self) -> &'static str;
    fn is_open(&self) -> bool;
    fn set_open(&mut self, open: bool);

    /// Recomputes what the panel shows from the model.
    fn refresh(&mut self, model: &PartModel);

    fn open(&mut self) {
        self.set_open(true);
    }

    fn close(&mut self) {
        self.set_open(false);
    }

    /// Flips the open state and returns the new one.
    fn toggle(&mut self) -> bool {
        let open = !self.is_open();
        self.set_open(open);
        open
    }
}

/// Plain view of the page image.
#[derive(Debug, Default)]
pub struct SourcePanel {
    open: bool,
    part: Option<PartId>,
    image: Option<ImageRef>,
    display_width: f64,
}

impl SourcePanel {
    pub fn new(display_width: f64) -> Self {
        Self {
            display_width,
            ..Self::default()
        }
    }

    pub fn set_image(&mut self, image: ImageRef) {
        self.image = Some(image);
    }

    pub fn image(&self) -> Option<&ImageRef> {
        self.image.as_ref()
    }

    pub fn part(&self) -> Option<PartId> {
        self.part
    }

    pub fn set_display_width(&mut self, width: f64) {
        self.display_width = width;
    }

    /// Ratio from image pixels to panel units, fitting the image width.
    pub fn image_scale(&self) -> ScaleTransform {
        match &self.image {
            Some(image) => ScaleTransform::fit_width(f64::from(image.width), self.display_width),
            None => ScaleTransform::identity(),
        }
    }
}

impl Panel for SourcePanel {
    fn name(&self) -> &'static str {
        "source"
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    fn refresh(&mut self, model: &PartModel) {
        self.part = model.part();
    }
}

/// Overlay on which lines and regions are drawn and edited.
#[derive(Debug, Default)]
pub struct SegmentationPanel {
    open: bool,
    handles: SurfaceHandles,
    lines: usize,
    regions: usize,
}

impl SegmentationPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handles(&self) -> &SurfaceHandles {
        &self.handles
    }

    pub fn counts(&self) -> (usize, usize) {
        (self.lines, self.regions)
    }
}

impl Panel for SegmentationPanel {
    fn name(&self) -> &'static str {
        "segmentation"
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    fn refresh(&mut self, model: &PartModel) {
        let dropped = self.handles.sync(model);
        if !dropped.is_empty() {
            tracing::trace!("Dropped {} surface handles", dropped.len());
        }
        self.lines = model.line_count();
        self.regions = model.region_count();
    }
}

/// Transcribed text laid out over the page, one entry per line.
pub struct TranscriptionPanel {
    open: bool,
    layer: LayerId,
    renderer: Box<dyn RenderableLine>,
    context: RenderContext,
    layouts: Vec<(LineLayout, String)>,
}

impl TranscriptionPanel {
    pub fn new(layer: LayerId, renderer: Box<dyn RenderableLine>, context: RenderContext) -> Self {
        Self {
            open: false,
            layer,
            renderer,
            context,
            layouts: Vec::new(),
        }
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    pub fn set_layer(&mut self, layer: LayerId) {
        self.layer = layer;
    }

    /// Switches between baseline and mask display. Takes effect on the next
    /// refresh.
    pub fn set_renderer(&mut self, renderer: Box<dyn RenderableLine>) {
        tracing::debug!("Transcription panel renders by {}", renderer.name());
        self.renderer = renderer;
    }

    pub fn set_context(&mut self, context: RenderContext) {
        self.context = context;
    }

    /// Layouts and texts in reading order.
    pub fn layouts(&self) -> &[(LineLayout, String)] {
        &self.layouts
    }

    /// Line whose hit area contains `p`, preferring the first in order.
    pub fn line_at(&self, model: &PartModel, p: &Point) -> Option<LocalId> {
        self.layouts.iter().find_map(|(layout, _)| {
            let line = model.line(layout.key)?;
            let area: Bounds = self.renderer.hit_area(line, &self.context)?;
            area.contains(p).then_some(layout.key)
        })
    }
}

impl Panel for TranscriptionPanel {
    fn name(&self) -> &'static str {
        "transcription"
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    fn refresh(&mut self, model: &PartModel) {
        self.layouts = model
            .lines_in_order()
            .into_iter()
            .filter_map(|line| {
                let layout = self.renderer.compute_layout(line, &self.context)?;
                let text = line.content(self.layer).unwrap_or_default().to_string();
                Some((layout, text))
            })
            .collect();
    }
}

impl std::fmt::Debug for TranscriptionPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionPanel")
            .field("open", &self.open)
            .field("layer", &self.layer)
            .field("renderer", &self.renderer.name())
            .field("layouts", &self.layouts.len())
            .finish()
    }
}

/// The panels of a part view, in display order.
#[derive(Default)]
pub struct PanelLayout {
    panels: Vec<Box<dyn Panel>>,
}

impl PanelLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a panel, opened as the user last left it, or per the configured
    /// default, or open when neither says otherwise.
    pub fn add(&mut self, mut panel: Box<dyn Panel>, defaults: &UiSettings, prefs: &PreferenceStore) {
        let name = panel.name();
        let open = prefs
            .panel_open(name)
            .or_else(|| defaults.panel_visibility.get(name).copied())
            .unwrap_or(true);
        panel.set_open(open);
        self.panels.push(panel);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Panel> {
        self.panels
            .iter()
            .find(|p| p.name() == name)
            .map(|p| &**p)
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.get(name).is_some_and(|p| p.is_open())
    }

    pub fn open_panels(&self) -> Vec<&'static str> {
        self.panels
            .iter()
            .filter(|p| p.is_open())
            .map(|p| p.name())
            .collect()
    }

    /// Toggles a panel and records the new state. Returns it, or `None` for
    /// an unknown panel.
    pub fn toggle(&mut self, name: &str, prefs: &mut PreferenceStore) -> Option<bool> {
        let panel = self.panels.iter_mut().find(|p| p.name() == name)?;
        let open = panel.toggle();
        prefs.set_panel_open(name, open);
        if let Err(e) = prefs.save() {
            tracing::warn!("Failed to save panel state: {}", e);
        }
        tracing::debug!("Panel {} {}", name, if open { "opened" } else { "closed" });
        Some(open)
    }

    /// Refreshes the open panels. Closed panels refresh when reopened.
    pub fn refresh_all(&mut self, model: &PartModel) {
        for panel in self.panels.iter_mut().filter(|p| p.is_open()) {
            panel.refresh(model);
        }
    }

    pub fn refresh(&mut self, name: &str, model: &PartModel) -> bool {
        match self.panels.iter_mut().find(|p| p.name() == name) {
            Some(panel) => {
                panel.refresh(model);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for PanelLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.panels.iter().map(|p| (p.name(), p.is_open())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Polygon;
    use crate::render::{BaselineRenderer, MaskRenderer};
    use crate::transcription::LineTranscription;

    fn model() -> PartModel {
        let mut model = PartModel::for_part(3);
        for (i, y) in [100.0, 200.0].into_iter().enumerate() {
            let line = model.new_line();
            line.baseline = Some(Polygon::new(vec![Point::new(0.0, y), Point::new(400.0, y)]));
            line.order = i;
            line.transcriptions.insert(
                1,
                LineTranscription {
                    content: format!("line {i}"),
                    ..LineTranscription::default()
                },
            );
        }
        model
    }

    fn build_layout(prefs: &PreferenceStore) -> PanelLayout {
        let mut layout = PanelLayout::new();
        let ui = UiSettings::default();
        layout.add(Box::new(SourcePanel::new(800.0)), &ui, prefs);
        layout.add(Box::new(SegmentationPanel::new()), &ui, prefs);
        layout.add(
            Box::new(TranscriptionPanel::new(
                1,
                Box::new(BaselineRenderer::default()),
                RenderContext::default(),
            )),
            &ui,
            prefs,
        );
        layout
    }

    #[test]
    fn test_defaults_and_preferences() {
        let mut prefs = PreferenceStore::in_memory();
        let layout = build_layout(&prefs);
        assert_eq!(layout.open_panels(), vec!["segmentation", "transcription"]);

        prefs.set_panel_open("source", true);
        prefs.set_panel_open("transcription", false);
        let layout = build_layout(&prefs);
        assert_eq!(layout.open_panels(), vec!["source", "segmentation"]);
    }

    #[test]
    fn test_toggle_persists() {
        let mut prefs = PreferenceStore::in_memory();
        let mut layout = build_layout(&prefs);
        assert_eq!(layout.toggle("segmentation", &mut prefs), Some(false));
        assert_eq!(prefs.panel_open("segmentation"), Some(false));
        assert!(!layout.is_open("segmentation"));
        assert_eq!(layout.toggle("nope", &mut prefs), None);
    }

    #[test]
    fn test_transcription_panel_layouts() {
        let model = model();
        let mut panel = TranscriptionPanel::new(
            1,
            Box::new(BaselineRenderer { hit_padding: 10.0 }),
            RenderContext::default(),
        );
        panel.refresh(&model);
        let texts: Vec<&str> = panel.layouts().iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["line 0", "line 1"]);

        let second = panel.layouts()[1].0.key;
        assert_eq!(panel.line_at(&model, &Point::new(50.0, 205.0)), Some(second));
        assert_eq!(panel.line_at(&model, &Point::new(50.0, 150.0)), None);

        panel.set_renderer(Box::new(MaskRenderer));
        panel.refresh(&model);
        assert!(panel.layouts().is_empty());
    }

    #[test]
    fn test_segmentation_panel_tracks_model() {
        let mut model = model();
        let mut panel = SegmentationPanel::new();
        panel.refresh(&model);
        assert_eq!(panel.counts(), (2, 0));
        assert_eq!(panel.handles().len(), 2);

        model.create_region(Polygon::rectangle(Point::new(0.0, 0.0), Point::new(10.0, 10.0)));
        panel.refresh(&model);
        assert_eq!(panel.counts(), (2, 1));
        assert_eq!(panel.handles().len(), 3);
    }

    #[test]
    fn test_source_panel_scale() {
        let mut panel = SourcePanel::new(1000.0);
        assert_eq!(panel.image_scale(), ScaleTransform::identity());
        panel.set_image(ImageRef {
            uri: "/media/p.jpg".to_string(),
            thumbnail_uri: None,
            width: 2000,
            height: 3000,
        });
        assert_eq!(panel.image_scale(), ScaleTransform::new(0.5));
        panel.refresh(&model());
        assert_eq!(panel.part(), Some(3));
    }
}
