//! Shared Error Types
//!
//! Error types used across the offline report subsystem.
//!
//! # Error Categories
//!
//! - `SharedError` - validation and serialization of shared data
//! - `StoreError` - the on-device durable store
//! - `BackendError` - calls to the hosted backend
//! - `CaptureError` - photo capture input
//!
//! Only `StoreError` and `CaptureError` are meant to reach callers of the
//! offline manager. Backend failures are absorbed at component boundaries
//! and turned into status transitions or fallbacks.
//!
//! # Usage
//!
//! ```rust
//! use straywatch::shared::error::SharedError;
//!
//! let error = SharedError::validation("category", "unknown report category");
//! assert!(error.to_string().contains("category"));
//! ```
use std::time::Duration;
use thiserror::Error;

/// Validation and serialization errors on shared data
#[derive(Debug, Error, Clone)]
pub enum SharedError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },
}

impl SharedError {
    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

/// Errors raised by the local durable store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure
    #[error("Storage error: {0}")]
    Database(#[from] sqlx::Error),

    /// Could not create the store directory
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted record could not be encoded or decoded
    #[error("Corrupt record under '{key}': {source}")]
    Corrupt {
        /// Storage key of the record
        key: String,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// The persisted queue was written by a newer schema
    #[error("Unsupported queue schema version {found} (max supported {supported})")]
    UnsupportedVersion {
        /// Version found on disk
        found: u32,
        /// Highest version this build understands
        supported: u32,
    },

    /// No queue entry with this id
    #[error("Queue entry not found: {0}")]
    EntryNotFound(String),
}

impl StoreError {
    /// Wrap a JSON error with the key it happened under
    pub fn corrupt(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Corrupt {
            key: key.into(),
            source,
        }
    }
}

/// Errors from the hosted backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network or TLS failure
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("Backend returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Response body did not have the expected shape
    #[error("Malformed backend response: {0}")]
    Malformed(String),

    /// Call did not finish in time
    #[error("Backend call timed out after {0:?}")]
    Timeout(Duration),

    /// A request was refused before leaving the device
    #[error("Rejected: {0}")]
    Rejected(String),
}

/// Errors from photo capture
///
/// Connectivity never causes a capture error; only bad input does.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Input is not image data
    #[error("Please choose an image (got '{mime_type}')")]
    NotAnImage {
        /// MIME type that was supplied
        mime_type: String,
    },

    /// Input was empty
    #[error("Image is empty")]
    Empty,

    /// Compressor could not decode or re-encode the image
    #[error("Could not process image: {0}")]
    Compression(String),
}
