//! Event type definitions for the event bus.
//!
//! Events are cloneable and serializable so they can be logged or replayed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{PrimitiveKey, RemoteId};

/// Root event enum for all session events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppEvent {
    /// Shared viewport transform changes
    Viewport(ViewportEvent),
    /// Segmentation editor activity
    Segmentation(SegmentationEvent),
    /// Remote synchronization activity
    Sync(SyncEvent),
    /// User-visible alerts
    Alert(Alert),
    /// Image upload progress
    Upload(UploadEvent),
}

impl AppEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            AppEvent::Viewport(_) => EventCategory::Viewport,
            AppEvent::Segmentation(_) => EventCategory::Segmentation,
            AppEvent::Sync(_) => EventCategory::Sync,
            AppEvent::Alert(_) => EventCategory::Alert,
            AppEvent::Upload(_) => EventCategory::Upload,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            AppEvent::Viewport(e) => e.description(),
            AppEvent::Segmentation(e) => e.description(),
            AppEvent::Sync(e) => e.description(),
            AppEvent::Alert(a) => format!("{:?}: {}", a.level, a.message),
            AppEvent::Upload(e) => e.description(),
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    Viewport,
    Segmentation,
    Sync,
    Alert,
    Upload,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Viewport => write!(f, "Viewport"),
            EventCategory::Segmentation => write!(f, "Segmentation"),
            EventCategory::Sync => write!(f, "Sync"),
            EventCategory::Alert => write!(f, "Alert"),
            EventCategory::Upload => write!(f, "Upload"),
        }
    }
}

/// Viewport transform events, broadcast after every surface has been updated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewportEvent {
    /// The shared transform changed.
    Updated {
        scale: f64,
        offset_x: f64,
        offset_y: f64,
        angle: f64,
    },
    /// The transform was restored to its initial state.
    Reset,
    /// The overview indicator of map surfaces was shown or hidden.
    OverviewVisibility { visible: bool },
}

impl ViewportEvent {
    pub fn description(&self) -> String {
        match self {
            ViewportEvent::Updated {
                scale,
                offset_x,
                offset_y,
                angle,
            } => format!(
                "scale {:.3} offset ({:.1}, {:.1}) angle {:.3}",
                scale, offset_x, offset_y, angle
            ),
            ViewportEvent::Reset => "viewport reset".to_string(),
            ViewportEvent::OverviewVisibility { visible } => {
                format!("overview visible: {}", visible)
            }
        }
    }
}

/// Segmentation editor events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SegmentationEvent {
    /// Active tool changed.
    ToolChanged { tool: String },
    /// Interaction state machine moved to another state.
    InteractionChanged { from: String, to: String },
    /// Selection contents changed.
    SelectionChanged { selected: Vec<PrimitiveKey> },
    /// A primitive was created locally.
    Created { key: PrimitiveKey },
    /// A primitive's persisted fields changed locally.
    Updated { key: PrimitiveKey },
    /// A primitive was removed locally.
    Deleted { key: PrimitiveKey },
}

impl SegmentationEvent {
    pub fn description(&self) -> String {
        match self {
            SegmentationEvent::ToolChanged { tool } => format!("tool -> {}", tool),
            SegmentationEvent::InteractionChanged { from, to } => format!("{} -> {}", from, to),
            SegmentationEvent::SelectionChanged { selected } => {
                format!("{} selected", selected.len())
            }
            SegmentationEvent::Created { key } => format!("created {}", key),
            SegmentationEvent::Updated { key } => format!("updated {}", key),
            SegmentationEvent::Deleted { key } => format!("deleted {}", key),
        }
    }
}

/// Synchronization events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncEvent {
    /// A remote call was issued.
    RequestIssued {
        request: u64,
        key: Option<PrimitiveKey>,
        operation: String,
    },
    /// A primitive received its persistent identifier.
    Persisted { key: PrimitiveKey, remote_id: RemoteId },
    /// A remote call succeeded.
    RequestSucceeded { request: u64 },
    /// A remote call failed.
    RequestFailed { request: u64, reason: String },
    /// Local state was restored after a failure.
    RolledBack { key: PrimitiveKey, fields: Vec<String> },
    /// A response arrived for a primitive that no longer exists.
    StaleResponseDiscarded { request: u64 },
}

impl SyncEvent {
    pub fn description(&self) -> String {
        match self {
            SyncEvent::RequestIssued {
                request, operation, ..
            } => format!("request {} issued ({})", request, operation),
            SyncEvent::Persisted { key, remote_id } => {
                format!("{} persisted as {}", key, remote_id)
            }
            SyncEvent::RequestSucceeded { request } => format!("request {} succeeded", request),
            SyncEvent::RequestFailed { request, reason } => {
                format!("request {} failed: {}", request, reason)
            }
            SyncEvent::RolledBack { key, fields } => {
                format!("{} rolled back [{}]", key, fields.join(", "))
            }
            SyncEvent::StaleResponseDiscarded { request } => {
                format!("stale response {} discarded", request)
            }
        }
    }
}

/// Upload progress events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UploadEvent {
    Started { name: String, order: u32 },
    Succeeded { name: String, remote_id: RemoteId },
    Failed { name: String, reason: String },
}

impl UploadEvent {
    pub fn description(&self) -> String {
        match self {
            UploadEvent::Started { name, order } => format!("uploading {} as #{}", name, order),
            UploadEvent::Succeeded { name, remote_id } => {
                format!("uploaded {} ({})", name, remote_id)
            }
            UploadEvent::Failed { name, reason } => format!("upload of {} failed: {}", name, reason),
        }
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A dismissible user-visible message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub level: AlertLevel,
    pub message: String,
    pub dismissible: bool,
}

impl Alert {
    pub fn new(level: AlertLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            dismissible: true,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Info, message)
    }
}
