//! In-memory stand-in for the hosted backend

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use straywatch::remote::{ReportBackend, ReportQuery};
use straywatch::shared::error::BackendError;
use straywatch::shared::report::{NewReportRow, ReportCategory, ReportRow};

#[derive(Default)]
pub struct FakeBackend {
    rows: Mutex<Vec<ReportRow>>,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    failing_names: Mutex<HashSet<String>>,
    insert_delay: Mutex<Option<Duration>>,
    fail_uploads: AtomicBool,
    fail_selects: AtomicBool,
    insert_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    select_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject inserts of reports with this name
    pub fn fail_inserts_named(&self, name: &str) {
        self.failing_names.lock().unwrap().insert(name.to_string());
    }

    pub fn heal_inserts_named(&self, name: &str) {
        self.failing_names.lock().unwrap().remove(name);
    }

    pub fn delay_inserts(&self, delay: Duration) {
        *self.insert_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_selects(&self, fail: bool) {
        self.fail_selects.store(fail, Ordering::SeqCst);
    }

    /// Add a row as if another volunteer had reported it
    pub fn seed(&self, name: &str, category: ReportCategory, is_approved: bool) {
        let mut rows = self.rows.lock().unwrap();
        let seq = rows.len();
        rows.push(row(format!("seed-{}", seq), name, category, is_approved, None, seq));
    }

    pub fn rows(&self) -> Vec<ReportRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn row_names(&self) -> Vec<String> {
        self.rows().into_iter().map(|r| r.name).collect()
    }

    pub fn objects(&self) -> HashMap<String, Vec<u8>> {
        self.objects.lock().unwrap().clone()
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }
}

fn row(
    id: String,
    name: &str,
    category: ReportCategory,
    is_approved: bool,
    photo_url: Option<String>,
    seq: usize,
) -> ReportRow {
    let created_at = format!("2026-10-18T10:00:{:02}Z", seq % 60);
    ReportRow {
        id,
        name: name.to_string(),
        ear_tag: String::new(),
        photo_url,
        latitude: 41.7151,
        longitude: 44.8271,
        location: None,
        is_vaccinated: false,
        vaccination1_date: None,
        vaccination2_date: None,
        vaccination_passport: None,
        additional_info: None,
        is_approved,
        reporter_name: None,
        created_at: created_at.clone(),
        updated_at: created_at,
        report_type: category,
        urgency_level: None,
        sponsor_name: None,
    }
}

#[async_trait]
impl ReportBackend for FakeBackend {
    async fn select_reports(&self, query: &ReportQuery) -> Result<Vec<ReportRow>, BackendError> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_selects.load(Ordering::SeqCst) {
            return Err(BackendError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        let mut rows: Vec<ReportRow> = self
            .rows()
            .into_iter()
            .filter(|r| {
                query.equals.iter().all(|(column, value)| match column.as_str() {
                    "is_approved" => r.is_approved.to_string() == *value,
                    _ => true,
                })
            })
            .collect();
        if query.order_desc.is_some() {
            rows.reverse();
        }
        Ok(rows)
    }

    async fn insert_report(&self, _table: &str, report: &NewReportRow) -> Result<ReportRow, BackendError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.insert_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_names.lock().unwrap().contains(&report.name) {
            return Err(BackendError::Status {
                status: 500,
                body: "insert failed".to_string(),
            });
        }

        let mut rows = self.rows.lock().unwrap();
        let mut created = row(
            uuid::Uuid::new_v4().to_string(),
            &report.name,
            report.report_type,
            report.is_approved,
            report.photo_url.clone(),
            rows.len(),
        );
        created.latitude = report.latitude;
        created.longitude = report.longitude;
        created.location = Some(report.location.clone());
        created.urgency_level = report.urgency_level.clone();
        rows.push(created.clone());
        Ok(created)
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, BackendError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(BackendError::Status {
                status: 503,
                body: "storage unavailable".to_string(),
            });
        }
        self.objects.lock().unwrap().insert(path.to_string(), bytes);
        Ok(format!("https://cdn.test/{}/{}", bucket, path))
    }
}
