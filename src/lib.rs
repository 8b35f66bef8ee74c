//! # Folium
//!
//! Editing core for manuscript page segmentation and transcription:
//! - Shared zoom/pan/rotate viewport driving every display panel
//! - Baseline, mask and region editing with per-field sync rollback
//! - Line-by-line transcription editing in selectable layers
//! - Page reordering and serialized image uploads
//!
//! ## Architecture
//!
//! Folium is organized as a workspace with multiple crates:
//!
//! 1. **folium-core** - Geometry, identifiers, errors, event bus
//! 2. **folium-settings** - Configuration files and the preference store
//! 3. **folium-editor** - Viewport, primitive model, segmentation and transcription editors, panels
//! 4. **folium-sync** - Sync adapter and driver, uploads, server notifications
//! 5. **folium** - [`Session`] wiring and the headless binary

pub mod session;

pub use session::Session;

pub use folium_core::{
    Alert, AlertLevel, AppEvent, Error, EventBus, EventCategory, EventFilter, LocalId, PartId,
    Point, PrimitiveKey, RemoteError, Result,
};
pub use folium_editor::{EditorCommand, PartCard, PartModel, SegmentationEditor, Viewport};
pub use folium_settings::{Config, PreferenceStore};
pub use folium_sync::{FileStore, PartApi, SyncDriver, UploadApi, UploadFile};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing::Level::INFO.to_string()));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
