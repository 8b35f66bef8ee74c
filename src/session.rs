//! One editing session: the viewport, the segmentation editor and its
//! panels, the part cards, and the sync driver that persists every command
//! the editor emits.
//!
//! The session is single-threaded. Display surfaces and the editor share
//! the viewport transform through `Rc`, so the session itself is not `Send`;
//! only the remote calls run as tokio tasks.

use std::sync::Arc;
use std::time::Duration;

use folium_core::{shared, Alert, AppEvent, EventBus, PartId, PrimitiveKey, ScaleTransform};
use folium_editor::{
    command_channel, BaselineRenderer, CommandReceiver, CommandSender, LayerId, PanelLayout,
    PartCard, PartCards, PartModel, RenderContext, RichTextInput, SegmentationEditor,
    SegmentationPanel, SourcePanel, SurfaceOptions, TranscriptionEditor, TranscriptionPanel,
    ViewMapping, Viewport, ViewportMirror, ViewportState,
};
use folium_settings::{Config, PreferenceStore};
use folium_sync::{
    AlertCenter, PartApi, SyncDriver, SyncScope, UploadApi, UploadFile, UploadOutcome,
    UploadQueue,
};
use tokio::sync::broadcast::{self, error::TryRecvError};

pub struct Session<A: PartApi + UploadApi + 'static> {
    config: Config,
    bus: Arc<EventBus>,
    viewport: Viewport,
    editor: SegmentationEditor,
    cards: PartCards,
    panels: PanelLayout,
    alerts: AlertCenter,
    prefs: PreferenceStore,
    commands: CommandSender,
    inbox: CommandReceiver,
    driver: SyncDriver<A>,
    feed: broadcast::Receiver<AppEvent>,
    display_width: f64,
    layer: LayerId,
}

impl<A: PartApi + UploadApi + 'static> Session<A> {
    /// `display_width` is the width the page image is fitted to.
    pub fn new(config: Config, prefs: PreferenceStore, api: Arc<A>, display_width: f64) -> Self {
        let bus = Arc::new(EventBus::new());
        let feed = bus.receiver();

        let mut viewport = Viewport::new(
            config.viewport.clone(),
            display_width,
            display_width,
            bus.clone(),
        );
        let mirror = shared(ViewportState::default());
        viewport.register(
            Box::new(ViewportMirror::new(mirror.clone())),
            SurfaceOptions::mirror(),
        );

        let (commands, inbox) = command_channel();
        let editor = SegmentationEditor::new(
            PartModel::new(),
            config.editor.clone(),
            ViewMapping::new(mirror, ScaleTransform::identity()),
            commands.clone(),
            bus.clone(),
        );

        let layer = prefs.get::<LayerId>("transcription.layer").ok().flatten().unwrap_or(1);
        let mut panels = PanelLayout::new();
        panels.add(Box::new(SourcePanel::new(display_width)), &config.ui, &prefs);
        panels.add(Box::new(SegmentationPanel::new()), &config.ui, &prefs);
        panels.add(
            Box::new(TranscriptionPanel::new(
                layer,
                Box::new(BaselineRenderer::default()),
                RenderContext {
                    scale: ScaleTransform::identity(),
                    direction: config.ui.read_direction,
                },
            )),
            &config.ui,
            &prefs,
        );

        let driver = SyncDriver::new(
            api,
            Duration::from_millis(config.sync.request_timeout_ms),
            bus.clone(),
        );

        Self {
            alerts: AlertCenter::new(bus.clone()),
            config,
            bus,
            viewport,
            editor,
            cards: PartCards::default(),
            panels,
            prefs,
            commands,
            inbox,
            driver,
            feed,
            display_width,
            layer,
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn editor(&self) -> &SegmentationEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut SegmentationEditor {
        &mut self.editor
    }

    pub fn cards(&self) -> &PartCards {
        &self.cards
    }

    pub fn panels(&self) -> &PanelLayout {
        &self.panels
    }

    pub fn alerts(&self) -> &AlertCenter {
        &self.alerts
    }

    pub fn alerts_mut(&mut self) -> &mut AlertCenter {
        &mut self.alerts
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.prefs
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Number of sync requests still running.
    pub fn pending(&self) -> usize {
        self.driver.pending()
    }

    /// Whether the primitive still waits for its create to resolve.
    pub fn is_unsaved(&self, key: PrimitiveKey) -> bool {
        self.driver.adapter().is_creating(key)
    }

    pub fn set_cards(&mut self, cards: Vec<PartCard>) {
        self.cards = PartCards::new(cards);
    }

    /// Fetches a part and its transcriptions in the current layer and
    /// replaces the editor's model. The viewport is reset to fit the image.
    pub async fn load_part(&mut self, part: PartId) -> folium_core::Result<()> {
        let api = Arc::clone(self.driver.api());
        let document = api.fetch_part(part).await?;
        let transcriptions = api.fetch_transcriptions(part, self.layer).await?;

        let mut model = document.to_model();
        let matched = model.apply_transcriptions(self.layer, &transcriptions);
        tracing::info!(
            "Part {} ({}): {} transcriptions in layer {}",
            part,
            document.title,
            matched,
            self.layer
        );

        let scale = ScaleTransform::fit_width(f64::from(document.image.width), self.display_width);
        self.editor.view_mut().set_image_scale(scale);
        self.viewport.set_content_size(
            self.display_width,
            f64::from(document.image.height) * scale.ratio,
        );
        self.viewport.reset();
        self.editor.load(model);
        self.panels.refresh_all(self.editor.model());
        Ok(())
    }

    /// Hands every queued editor command to the sync driver. Returns how
    /// many were dispatched.
    pub fn pump(&mut self) -> usize {
        let mut dispatched = 0;
        while let Ok(command) = self.inbox.try_recv() {
            let mut scope = SyncScope {
                model: self.editor.model_mut(),
                cards: &mut self.cards,
            };
            self.driver.dispatch(command, &mut scope);
            dispatched += 1;
        }
        dispatched
    }

    /// Waits for the next sync response and applies it.
    pub async fn next_completion(&mut self) -> bool {
        self.pump();
        let mut scope = SyncScope {
            model: self.editor.model_mut(),
            cards: &mut self.cards,
        };
        let done = self.driver.next_completion(&mut scope).await.is_some();
        self.after_sync();
        done
    }

    /// Dispatches pending commands and applies responses until no request
    /// is running. Returns how many responses were applied.
    pub async fn settle(&mut self) -> usize {
        let mut completed = 0;
        loop {
            self.pump();
            if self.driver.pending() == 0 {
                break;
            }
            let mut scope = SyncScope {
                model: self.editor.model_mut(),
                cards: &mut self.cards,
            };
            completed += self.driver.settle(&mut scope).await;
        }
        self.after_sync();
        completed
    }

    /// Starts a drag of a part card and drops it at `target`.
    pub fn move_card(&mut self, part: PartId, target: usize) -> bool {
        match self.cards.begin_drag(part) {
            Some(session) => self.cards.drop(session, target, &self.commands),
            None => false,
        }
    }

    /// Shows or hides a panel and remembers the choice.
    pub fn toggle_panel(&mut self, name: &str) -> Option<bool> {
        let open = self.panels.toggle(name, &mut self.prefs)?;
        if open {
            self.panels.refresh(name, self.editor.model());
        }
        Some(open)
    }

    /// Builds a transcription editor bound to this session's command channel.
    /// It suppresses segmentation shortcuts while open.
    pub fn transcription_editor<I: RichTextInput>(&self, input: I) -> TranscriptionEditor<I> {
        TranscriptionEditor::new(
            input,
            self.layer,
            self.editor.shortcuts(),
            self.commands.clone(),
        )
    }

    /// Switches the transcription layer and reloads the current part.
    pub async fn set_layer(&mut self, layer: LayerId) -> folium_core::Result<()> {
        self.layer = layer;
        let stored = self
            .prefs
            .set("transcription.layer", layer)
            .and_then(|()| self.prefs.save());
        if let Err(e) = stored {
            tracing::warn!("Could not remember layer {}: {}", layer, e);
        }
        match self.editor.model().part() {
            Some(part) => self.load_part(part).await,
            None => Ok(()),
        }
    }

    /// Feeds a server notification to the alert center. Malformed messages
    /// are logged and ignored.
    pub fn notify(&mut self, json: &str) {
        if let Err(e) = self.alerts.receive(json) {
            tracing::warn!("Ignoring server message: {}", e);
        }
    }

    /// Uploads page images one at a time and adds a card for each page
    /// stored. Rejected and failed files raise an alert.
    pub async fn upload(&mut self, files: Vec<UploadFile>) -> Vec<UploadOutcome> {
        let mut queue = UploadQueue::new(
            Arc::clone(self.driver.api()),
            self.cards.len() as u32,
            self.config.sync.max_upload_size_bytes,
            self.bus.clone(),
        );
        for file in files {
            if let Err(e) = queue.enqueue(file) {
                self.alerts.push(Alert::error(e.to_string()));
            }
        }
        let outcomes = queue.run().await;
        for outcome in &outcomes {
            match &outcome.result {
                Ok(receipt) => self.cards.push(receipt.card()),
                Err(e) => {
                    self.alerts
                        .push(Alert::error(format!("Could not upload {}: {}", outcome.name, e)));
                }
            }
        }
        outcomes
    }

    fn after_sync(&mut self) {
        self.drain_feed();
        self.panels.refresh_all(self.editor.model());
    }

    /// Collects alerts published on the bus since the last call.
    fn drain_feed(&mut self) {
        loop {
            match self.feed.try_recv() {
                Ok(AppEvent::Alert(alert)) => self.alerts.track(alert),
                Ok(_) => {}
                Err(TryRecvError::Lagged(missed)) => {
                    tracing::warn!("Alert feed lagged, {} events missed", missed);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }
}
