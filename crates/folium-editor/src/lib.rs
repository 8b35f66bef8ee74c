//! # Folium Editor
//!
//! Interactive editing core for one document part: the viewport transform
//! engine shared by the display panels, the primitive model of lines and
//! regions, selection and tool state, and the segmentation editor state
//! machine that turns pointer and keyboard input into model mutations and
//! [`EditorCommand`]s for the synchronization layer.
//!
//! Also provides transcription editing, panel and line-rendering
//! capabilities, and the part card list used for page reordering.

pub mod cards;
pub mod commands;
pub mod editor;
pub mod model;
pub mod panels;
pub mod part;
pub mod render;
pub mod selection_manager;
pub mod tools;
pub mod transcription;
pub mod viewport;

pub use cards::{DragSession, PartCard, PartCards};
pub use commands::{
    command_channel, CommandReceiver, CommandSender, EditorCommand, Field, FieldChange,
    FieldValue, PrimitiveUpdate,
};
pub use editor::{
    DeletePointControl, Interaction, Key, KeyEvent, Modifiers, PointerEvent, SegmentationEditor,
    ViewMapping,
};
pub use model::{Hit, HitKind, Line, PartModel, Polygon, PolygonKind, PolygonRef, Region, Removed};
pub use panels::{Panel, PanelLayout, SegmentationPanel, SourcePanel, TranscriptionPanel};
pub use part::{DocumentPart, ImageRef, LinePayload, RegionPayload, TranscriptionPayload};
pub use render::{
    BaselineRenderer, HandleId, LineLayout, MaskRenderer, RenderContext, RenderableLine,
    SurfaceHandles,
};
pub use selection_manager::Selection;
pub use tools::{ShortcutSuppression, ToolMode, ToolState};
pub use transcription::{
    LayerId, LineTranscription, RichTextInput, TranscriptionEditor, TranscriptionVersion,
};
pub use viewport::{
    DragEvent, SurfaceId, SurfaceOptions, TransformTarget, Viewport, ViewportMirror,
    ViewportState, WheelEvent,
};
