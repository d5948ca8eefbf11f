//! Shared Module
//!
//! Types used by every component: the report data model, error enums and
//! application configuration. All of them serialize with serde so they can
//! be persisted in the local store or sent to the backend.

/// Report drafts, queue entries and cached reports
pub mod report;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::{BackendError, CaptureError, SharedError, StoreError};
pub use report::{CachedReport, EntryStatus, Photo, QueueEntry, ReportCategory, ReportDraft};
