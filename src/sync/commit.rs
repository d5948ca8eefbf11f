//! Turning a draft into a backend row
//!
//! Shared by the queue drain and by direct online submission, so both
//! paths resolve photos and apply the approval rule the same way.

use std::sync::Arc;

use crate::config::Config;
use crate::offline::photo;
use crate::offline::retry::RetryPolicy;
use crate::remote::ReportBackend;
use crate::shared::error::BackendError;
use crate::shared::report::{NewReportRow, Photo, ReportCategory, ReportDraft, ReportRow};

/// Where and how reports are committed
#[derive(Debug, Clone, PartialEq)]
pub struct CommitSettings {
    pub reports_table: String,
    pub photo_bucket: String,
    /// Categories published without moderation
    pub auto_approved: Vec<ReportCategory>,
    pub retry: RetryPolicy,
}

impl CommitSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            reports_table: config.reports_table().to_string(),
            photo_bucket: config.photo_bucket().to_string(),
            auto_approved: config.app().auto_approved_categories.clone(),
            retry: RetryPolicy::from_config(config),
        }
    }
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct ReportCommitter {
    backend: Arc<dyn ReportBackend>,
    settings: CommitSettings,
}

impl ReportCommitter {
    pub fn new(backend: Arc<dyn ReportBackend>, settings: CommitSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &CommitSettings {
        &self.settings
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.settings.retry
    }

    /// Approval is decided now, not when the draft was captured
    pub fn is_auto_approved(&self, category: ReportCategory) -> bool {
        self.settings.auto_approved.contains(&category)
    }

    /// Create the report on the backend
    ///
    /// A photo that cannot be uploaded is dropped; the report still goes
    /// through without it.
    pub async fn commit(&self, draft: &ReportDraft) -> Result<ReportRow, BackendError> {
        if !draft.has_identity() {
            return Err(BackendError::Rejected("report has no submitting user".to_string()));
        }

        let photo_url = self.resolve_photo(draft).await;
        let row = NewReportRow::from_draft(draft, photo_url, self.is_auto_approved(draft.category));
        self.settings
            .retry
            .bounded(self.backend.insert_report(&self.settings.reports_table, &row))
            .await
    }

    async fn resolve_photo(&self, draft: &ReportDraft) -> Option<String> {
        let data_url = match &draft.photo {
            None => return None,
            Some(Photo::Remote { url }) => return Some(url.clone()),
            Some(Photo::Inline { data_url }) => data_url,
        };

        let (mime_type, bytes) = match photo::decode_data_url(data_url) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(error = %e, "embedded photo unreadable, committing without photo");
                return None;
            }
        };

        let path = photo::object_path(
            &draft.reported_by,
            chrono::Utc::now().timestamp_millis(),
            &mime_type,
        );
        let upload = self
            .backend
            .upload_object(&self.settings.photo_bucket, &path, bytes, &mime_type);
        match self.settings.retry.bounded(upload).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, %path, "photo upload failed, committing without photo");
                None
            }
        }
    }
}
