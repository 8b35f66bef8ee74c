//! # Folium Sync
//!
//! Keeps the editor's model consistent with the document service. The
//! [`SyncAdapter`] maps editor commands to remote writes and applies their
//! outcomes (persisted ids, per-field rollbacks, restored deletions); the
//! [`SyncDriver`] runs those writes concurrently on tokio. Also provides the
//! serialized [`UploadQueue`] for page images and the [`AlertCenter`] for
//! server notifications.

pub mod adapter;
pub mod api;
pub mod driver;
pub mod error;
pub mod notifications;
pub mod store;
pub mod upload;

pub use adapter::{Completion, SyncAdapter, SyncScope, SyncTarget};
pub use api::{
    Fields, LinePatch, PartApi, RemoteOperation, RemoteRequest, RemoteResponse, RequestId,
};
pub use driver::SyncDriver;
pub use error::{NotificationError, UploadError};
pub use notifications::{AlertCenter, ServerMessage, TaskStatus};
pub use store::FileStore;
pub use upload::{UploadApi, UploadFile, UploadOutcome, UploadQueue, UploadReceipt};
