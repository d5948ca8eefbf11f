//! # Report Cache Refresher
//!
//! Replaces the local copy of approved reports with a fresh full fetch.
//! Every refresh is a full re-fetch; there is no delta sync.
//!
//! A refresh never fails loudly. Offline it does nothing; on a backend
//! error it logs and leaves the existing cache untouched so the UI keeps
//! serving the last good copy.

use std::sync::Arc;

use crate::local_db::sync::LocalStore;
use crate::remote::{ReportBackend, ReportQuery};
use crate::shared::report::CachedReport;
use crate::sync::network_monitor::NetworkMonitor;

/// What a refresh did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Offline, nothing attempted
    SkippedOffline,
    /// Cache replaced with `count` reports at `synced_at` (epoch ms)
    Refreshed { count: usize, synced_at: i64 },
    /// Fetch or write failed; previous cache kept
    Failed,
}

pub struct ReportRefresher {
    store: Arc<LocalStore>,
    backend: Arc<dyn ReportBackend>,
    monitor: Arc<NetworkMonitor>,
    source: String,
}

impl ReportRefresher {
    /// `source` is the public view listing approved reports
    pub fn new(
        store: Arc<LocalStore>,
        backend: Arc<dyn ReportBackend>,
        monitor: Arc<NetworkMonitor>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            store,
            backend,
            monitor,
            source: source.into(),
        }
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        if !self.monitor.is_online() {
            tracing::debug!("offline, skipping report refresh");
            return RefreshOutcome::SkippedOffline;
        }

        let rows = match self
            .backend
            .select_reports(&ReportQuery::approved(self.source.as_str()))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, source = %self.source, "failed to fetch reports");
                return RefreshOutcome::Failed;
            }
        };

        let reports: Vec<CachedReport> = rows.into_iter().map(CachedReport::from).collect();
        match self.store.cache_reports(&reports).await {
            Ok(synced_at) => {
                tracing::info!(count = reports.len(), "refreshed report cache");
                RefreshOutcome::Refreshed {
                    count: reports.len(),
                    synced_at,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to write report cache");
                RefreshOutcome::Failed
            }
        }
    }
}
