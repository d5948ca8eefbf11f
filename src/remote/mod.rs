//! # Remote Collaborators
//!
//! The offline subsystem talks to two external collaborators:
//!
//! - [`ReportBackend`]: relational select/insert plus an object store
//! - [`IdentityProvider`]: who is signed in right now
//!
//! [`rest::RestBackend`] implements the backend over HTTP. Tests use
//! in-memory fakes.

pub mod rest;

use async_trait::async_trait;
use std::sync::RwLock;

use crate::shared::error::BackendError;
use crate::shared::report::{NewReportRow, ReportRow};

pub use rest::RestBackend;

/// Select with equality filters and newest-first ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    /// Table or view to read
    pub source: String,
    /// `column = value` filters, all of which must hold
    pub equals: Vec<(String, String)>,
    /// Column to order by, descending
    pub order_desc: Option<String>,
}

impl ReportQuery {
    /// Publicly visible reports, newest first
    pub fn approved(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            equals: vec![("is_approved".to_string(), "true".to_string())],
            order_desc: Some("created_at".to_string()),
        }
    }
}

/// Backend capabilities the offline subsystem depends on
#[async_trait]
pub trait ReportBackend: Send + Sync {
    /// Run a select
    async fn select_reports(&self, query: &ReportQuery) -> Result<Vec<ReportRow>, BackendError>;

    /// Insert one report, returning the created row
    async fn insert_report(&self, table: &str, report: &NewReportRow) -> Result<ReportRow, BackendError>;

    /// Store binary data and return its public URL
    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError>;
}

/// Source of the current user's identifier
pub trait IdentityProvider: Send + Sync {
    /// Signed-in user id, or `None` when nobody is signed in
    fn current_user_id(&self) -> Option<String>;
}

/// Identity held in memory and updated by the auth layer
#[derive(Debug, Default)]
pub struct SessionIdentity {
    user_id: RwLock<Option<String>>,
}

impl SessionIdentity {
    pub fn new(user_id: Option<String>) -> Self {
        Self {
            user_id: RwLock::new(user_id),
        }
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        *self.user_id.write().unwrap_or_else(|e| e.into_inner()) = Some(user_id.into());
    }

    pub fn sign_out(&self) {
        *self.user_id.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.user_id
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .filter(|id| !id.trim().is_empty())
    }
}
