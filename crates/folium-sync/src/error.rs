//! Error types for the sync crate.

use folium_core::RemoteError;
use thiserror::Error;

/// Upload error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    /// The file exceeds the configured size limit
    #[error("{name} is {size} bytes, the limit is {max}")]
    TooLarge {
        /// File name.
        name: String,
        /// File size in bytes.
        size: u64,
        /// Configured limit in bytes.
        max: u64,
    },

    /// The file is not an image the service accepts
    #[error("{name} is not a supported image")]
    UnsupportedType {
        /// File name.
        name: String,
    },

    /// The service rejected or lost the upload
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Notification error type
#[derive(Error, Debug)]
pub enum NotificationError {
    /// The message is not valid JSON or has an unknown shape
    #[error("Malformed notification: {0}")]
    Malformed(#[from] serde_json::Error),
}
