//! # Report Data Model
//!
//! Types shared by the durable store, the synchronization engine and the
//! REST backend client.
//!
//! ## Overview
//!
//! - [`ReportDraft`]: what a volunteer captured in the field, not yet committed
//! - [`QueueEntry`]: a draft wrapped with queue bookkeeping (id, status, retries)
//! - [`CachedReport`]: flat read-model of one server-approved report
//! - [`ReportRow`] / [`NewReportRow`]: the backend's wire shapes
//!
//! The photo attached to a draft is either a remote reference (uploaded at
//! capture time) or an inline data URL (captured offline). See [`Photo`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shared::error::SharedError;

/// Shown by the UI when a report has no photo
pub const PLACEHOLDER_PHOTO: &str = "/placeholder.svg";

/// Report category, keyed by the backend's `report_type` column
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    /// Dog is already vaccinated, neutered and ear-tagged
    Save,
    /// Injured animal, needs help now
    Sos,
    /// Untagged dog sighting
    Stray,
    /// Request to vaccinate and neuter
    VaccinationWish,
}

impl ReportCategory {
    /// Wire name used by the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportCategory::Save => "save",
            ReportCategory::Sos => "sos",
            ReportCategory::Stray => "stray",
            ReportCategory::VaccinationWish => "vaccination_wish",
        }
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportCategory {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "save" => Ok(ReportCategory::Save),
            "sos" => Ok(ReportCategory::Sos),
            "stray" => Ok(ReportCategory::Stray),
            "vaccination_wish" => Ok(ReportCategory::VaccinationWish),
            other => Err(SharedError::validation(
                "category",
                format!("unknown report category '{}'", other),
            )),
        }
    }
}

/// Photo attached to a draft
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Photo {
    /// Already in the backend's object store
    Remote {
        /// Public URL returned by the upload
        url: String,
    },
    /// Captured offline, embedded as a `data:image/...;base64,` URL
    Inline {
        /// The full data URL
        data_url: String,
    },
}

impl Photo {
    /// Whether this photo still needs to be uploaded
    pub fn is_inline(&self) -> bool {
        matches!(self, Photo::Inline { .. })
    }
}

/// A report as captured by the volunteer
///
/// This is the closed payload carried through the offline queue. Every
/// field the backend needs to create the report is here; nothing is added
/// later except the resolved photo URL and the approval flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportDraft {
    /// Dog's name (or a descriptive label)
    pub name: String,
    /// Identifying ear tag, empty when untagged
    #[serde(default)]
    pub ear_tag: String,
    /// Attached photo, if any
    #[serde(default)]
    pub photo: Option<Photo>,
    /// Latitude of the sighting
    pub latitude: f64,
    /// Longitude of the sighting
    pub longitude: f64,
    /// Free-text location
    #[serde(default)]
    pub location: String,
    /// Whether the dog is known to be vaccinated
    #[serde(default)]
    pub is_vaccinated: bool,
    /// First vaccination date
    #[serde(default)]
    pub vaccination1_date: Option<NaiveDate>,
    /// Second vaccination date
    #[serde(default)]
    pub vaccination2_date: Option<NaiveDate>,
    /// Free-text notes
    #[serde(default)]
    pub additional_info: Option<String>,
    /// Report category
    pub category: ReportCategory,
    /// Urgency, only meaningful for [`ReportCategory::Sos`]
    #[serde(default)]
    pub urgency_level: Option<String>,
    /// Submitting user's identifier; empty when captured without identity
    #[serde(default)]
    pub reported_by: String,
}

impl ReportDraft {
    /// Create a draft with the mandatory fields; everything else defaults
    pub fn new(
        name: impl Into<String>,
        category: ReportCategory,
        latitude: f64,
        longitude: f64,
        reported_by: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ear_tag: String::new(),
            photo: None,
            latitude,
            longitude,
            location: format!("{:.4}, {:.4}", latitude, longitude),
            is_vaccinated: false,
            vaccination1_date: None,
            vaccination2_date: None,
            additional_info: None,
            category,
            urgency_level: None,
            reported_by: reported_by.into(),
        }
    }

    /// Attach a photo
    pub fn with_photo(mut self, photo: Photo) -> Self {
        self.photo = Some(photo);
        self
    }

    /// Whether the draft carries a submitting identity
    pub fn has_identity(&self) -> bool {
        !self.reported_by.trim().is_empty()
    }
}

/// Queue entry status
///
/// Successful commits remove the entry, so there is no `Synced` state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Waiting for a drain
    Pending,
    /// Being committed by the current drain
    Syncing,
    /// Last commit attempt failed
    Failed,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Syncing => "syncing",
            EntryStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A draft waiting in the offline queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEntry {
    /// Device-unique id, minted without a server round-trip
    pub id: String,
    /// What to submit
    pub payload: ReportDraft,
    /// Enqueue time, epoch milliseconds
    pub created_at: i64,
    /// Current status
    pub status: EntryStatus,
    /// Failed commit attempts so far
    pub retry_count: u32,
}

impl QueueEntry {
    /// Wrap a draft as a fresh `pending` entry
    pub fn new(payload: ReportDraft, created_at: i64) -> Self {
        Self {
            id: mint_entry_id(created_at),
            payload,
            created_at,
            status: EntryStatus::Pending,
            retry_count: 0,
        }
    }
}

/// Mint a queue entry id: `offline_<epoch_ms>_<random>`
///
/// The random suffix keeps ids distinct within the same millisecond.
pub fn mint_entry_id(now_ms: i64) -> String {
    format!("offline_{}_{}", now_ms, uuid::Uuid::new_v4().simple())
}

/// A report row as returned by the backend's public view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ear_tag: String,
    pub photo_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub location: Option<String>,
    #[serde(default)]
    pub is_vaccinated: bool,
    pub vaccination1_date: Option<String>,
    pub vaccination2_date: Option<String>,
    #[serde(default)]
    pub vaccination_passport: Option<String>,
    pub additional_info: Option<String>,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub reporter_name: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    pub report_type: ReportCategory,
    pub urgency_level: Option<String>,
    #[serde(default)]
    pub sponsor_name: Option<String>,
}

/// Insert payload for a new report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewReportRow {
    pub name: String,
    pub ear_tag: String,
    pub photo_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub location: String,
    pub is_vaccinated: bool,
    pub vaccination1_date: Option<NaiveDate>,
    pub vaccination2_date: Option<NaiveDate>,
    pub additional_info: Option<String>,
    pub reported_by: String,
    pub is_approved: bool,
    pub report_type: ReportCategory,
    pub urgency_level: Option<String>,
}

impl NewReportRow {
    /// Build the insert payload from a draft whose photo is already resolved
    pub fn from_draft(draft: &ReportDraft, photo_url: Option<String>, is_approved: bool) -> Self {
        Self {
            name: draft.name.clone(),
            ear_tag: draft.ear_tag.clone(),
            photo_url,
            latitude: draft.latitude,
            longitude: draft.longitude,
            location: draft.location.clone(),
            is_vaccinated: draft.is_vaccinated,
            vaccination1_date: draft.vaccination1_date,
            vaccination2_date: draft.vaccination2_date,
            additional_info: draft.additional_info.clone().filter(|s| !s.is_empty()),
            reported_by: draft.reported_by.clone(),
            is_approved,
            report_type: draft.category,
            // urgency only travels with SOS reports
            urgency_level: match draft.category {
                ReportCategory::Sos => draft.urgency_level.clone(),
                _ => None,
            },
        }
    }
}

/// Flat, display-ready copy of an approved report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedReport {
    pub id: String,
    pub name: String,
    pub ear_tag: String,
    pub photo: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location: String,
    pub is_vaccinated: bool,
    pub vaccination1_date: Option<String>,
    pub vaccination2_date: Option<String>,
    pub vaccination_passport: Option<String>,
    pub additional_info: Option<String>,
    pub is_approved: bool,
    pub reporter_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub category: ReportCategory,
    pub urgency_level: Option<String>,
    pub sponsor_name: Option<String>,
}

impl From<ReportRow> for CachedReport {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            ear_tag: row.ear_tag,
            photo: row
                .photo_url
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| PLACEHOLDER_PHOTO.to_string()),
            latitude: row.latitude,
            longitude: row.longitude,
            location: row.location.unwrap_or_default(),
            is_vaccinated: row.is_vaccinated,
            vaccination1_date: row.vaccination1_date,
            vaccination2_date: row.vaccination2_date,
            vaccination_passport: row.vaccination_passport,
            additional_info: row.additional_info.filter(|s| !s.is_empty()),
            is_approved: row.is_approved,
            reporter_name: row.reporter_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
            category: row.report_type,
            urgency_level: row.urgency_level,
            sponsor_name: row.sponsor_name,
        }
    }
}
