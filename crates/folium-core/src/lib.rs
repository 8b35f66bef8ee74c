//! # Folium Core
//!
//! Core types, geometry and utilities shared by every Folium crate.
//! Provides the fundamental abstractions for image-space geometry,
//! primitive identifiers, the error taxonomy and the session event bus.

pub mod error;
pub mod event_bus;
pub mod geometry;
pub mod ids;
pub mod types;

pub use error::{Error, ModelError, RemoteError, Result};

pub use event_bus::{
    Alert, AlertLevel, AppEvent, EventBus, EventBusConfig, EventCategory, EventFilter,
    SegmentationEvent, SubscriptionId, SyncEvent, UploadEvent, ViewportEvent,
};

pub use geometry::{Bounds, Point, ScaleTransform};

pub use ids::{IdGenerator, LocalId, PartId, PrimitiveKey, RemoteId};

pub use types::{shared, Shared, SharedVec};
