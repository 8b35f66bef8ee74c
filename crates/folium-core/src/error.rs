//! Error handling for Folium
//!
//! Provides the error types shared across the workspace:
//! - Remote errors (create/update/delete/reorder calls against the document service)
//! - Model errors (lookups of primitives that no longer exist)
//!
//! Invalid geometric edits are not errors: they are rejected as no-ops by the
//! model and never reach these types.

use thiserror::Error;

use crate::ids::PrimitiveKey;

/// Remote call error type
///
/// Represents failures of the asynchronous calls issued by the
/// synchronization layer against the document-part service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// Transport-level failure (connection refused, reset, DNS, ...)
    #[error("Network failure: {reason}")]
    Network {
        /// The reason reported by the transport.
        reason: String,
    },

    /// The service answered with a non-success status
    #[error("Service returned HTTP {status}: {message}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body or reason phrase.
        message: String,
    },

    /// The call did not complete in time
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// The service answered with a payload that could not be decoded
    #[error("Malformed response: {reason}")]
    MalformedResponse {
        /// What was wrong with the payload.
        reason: String,
    },

    /// The remote object does not exist (anymore)
    #[error("Remote object not found")]
    NotFound,
}

impl RemoteError {
    /// Whether repeating the same gesture may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Network { .. } | RemoteError::Timeout { .. } => true,
            RemoteError::Status { status, .. } => *status >= 500 || *status == 429,
            RemoteError::MalformedResponse { .. } | RemoteError::NotFound => false,
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::MalformedResponse {
            reason: err.to_string(),
        }
    }
}

/// Model error type
///
/// Raised by fallible lookups into the primitive model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// The primitive is not (or no longer) part of the model
    #[error("Unknown primitive {key}")]
    UnknownPrimitive {
        /// The key that was looked up.
        key: PrimitiveKey,
    },

    /// The payload describes geometry the model cannot hold
    #[error("Invalid geometry for {what}: {reason}")]
    InvalidGeometry {
        /// Which object carried the geometry.
        what: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Main error type for Folium
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Remote call error
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Model error
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a remote error
    pub fn is_remote_error(&self) -> bool {
        matches!(self, Error::Remote(_))
    }

    /// Check if this is a transient failure worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Remote(err) if err.is_transient())
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
