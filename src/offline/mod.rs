//! # Offline Reporting
//!
//! Lets volunteers file reports with or without connectivity and keeps a
//! readable copy of approved reports on the device.
//!
//! ## Architecture
//!
//! [`OfflineManager`] wires the pieces together:
//! - **Network Monitor**: online/offline transitions
//! - **Local Store**: cached reports and the pending queue
//! - **Refresher**: re-fetches approved reports
//! - **Sync Engine**: drains the queue when online
//! - **Photo Capture**: compress, then upload or embed
//!
//! ## Key Components
//!
//! - `queue.rs`: queue rules as pure functions
//! - `retry.rs`: retry ceiling and commit timeout
//! - `photo.rs`: capture, data URLs, object paths
//!
//! ## Usage
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # async fn run(manager: Arc<straywatch::offline::OfflineManager>) -> Result<(), straywatch::shared::error::StoreError> {
//! use straywatch::shared::report::{ReportCategory, ReportDraft};
//!
//! let _listener = manager.start().await?;
//!
//! let draft = ReportDraft::new("Rex", ReportCategory::Sos, 41.7151, 44.8271, "user-1");
//! manager.submit(draft).await?;
//!
//! let status = manager.status().await?;
//! println!("{} waiting", status.pending_count);
//! # Ok(())
//! # }
//! ```

pub mod photo;
pub mod queue;
pub mod retry;

pub use photo::{CapturedPhoto, CompressOptions, ImageCompressor, PhotoCapture, RawImage};
pub use queue::QueueStats;
pub use retry::RetryPolicy;

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::local_db::sync::LocalStore;
use crate::remote::{IdentityProvider, ReportBackend};
use crate::shared::error::{CaptureError, StoreError};
use crate::shared::report::{CachedReport, QueueEntry, ReportDraft, ReportRow};
use crate::sync::{
    CommitSettings, DrainOutcome, NetworkMonitor, RefreshOutcome, ReportCommitter, ReportRefresher, SyncEngine,
};

/// Snapshot for the UI's offline indicator and list views
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStatus {
    pub is_online: bool,
    /// Pending plus failed entries
    pub pending_count: usize,
    /// A drain is running
    pub is_syncing: bool,
    /// Epoch ms of the last successful refresh
    pub last_sync_time: Option<i64>,
    pub cached_reports: Vec<CachedReport>,
}

impl SyncStatus {
    pub fn last_sync(&self, now_ms: i64) -> LastSync {
        LastSync::from_elapsed(now_ms, self.last_sync_time)
    }
}

/// Coarse "last synced" label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastSync {
    Never,
    JustNow,
    MinutesAgo(i64),
    HoursAgo(i64),
}

impl LastSync {
    pub fn from_elapsed(now_ms: i64, last_sync_time: Option<i64>) -> Self {
        let Some(last) = last_sync_time else {
            return LastSync::Never;
        };
        let minutes = (now_ms - last).max(0) / 60_000;
        if minutes < 1 {
            LastSync::JustNow
        } else if minutes < 60 {
            LastSync::MinutesAgo(minutes)
        } else {
            LastSync::HoursAgo(minutes / 60)
        }
    }
}

impl fmt::Display for LastSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastSync::Never => write!(f, "never"),
            LastSync::JustNow => write!(f, "just now"),
            LastSync::MinutesAgo(n) => write!(f, "{} min ago", n),
            LastSync::HoursAgo(n) => write!(f, "{} h ago", n),
        }
    }
}

/// What happened to a submitted report
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Created on the backend right away
    Submitted(ReportRow),
    /// Stored locally, will sync later
    Queued(QueueEntry),
}

/// Main offline manager coordinating all offline functionality
pub struct OfflineManager {
    store: Arc<LocalStore>,
    monitor: Arc<NetworkMonitor>,
    refresher: Arc<ReportRefresher>,
    engine: Arc<SyncEngine>,
    committer: Arc<ReportCommitter>,
    identity: Arc<dyn IdentityProvider>,
    capture: PhotoCapture,
    status: watch::Sender<SyncStatus>,
}

impl OfflineManager {
    pub fn new(
        config: &Config,
        store: Arc<LocalStore>,
        backend: Arc<dyn ReportBackend>,
        identity: Arc<dyn IdentityProvider>,
        compressor: Arc<dyn ImageCompressor>,
        monitor: Arc<NetworkMonitor>,
    ) -> Self {
        let refresher = Arc::new(ReportRefresher::new(
            store.clone(),
            backend.clone(),
            monitor.clone(),
            config.public_view(),
        ));
        let committer = Arc::new(ReportCommitter::new(backend.clone(), CommitSettings::from_config(config)));
        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            monitor.clone(),
            refresher.clone(),
            committer.clone(),
        ));
        let capture = PhotoCapture::new(
            compressor,
            backend,
            identity.clone(),
            monitor.clone(),
            config.photo_bucket(),
        );
        let (status, _) = watch::channel(SyncStatus {
            is_online: monitor.is_online(),
            ..SyncStatus::default()
        });

        Self {
            store,
            monitor,
            refresher,
            engine,
            committer,
            identity,
            capture,
            status,
        }
    }

    /// Recover from an interrupted run and start reacting to transitions
    ///
    /// Entries left `syncing` by a crash go back to `pending`. If the device
    /// is online the cache is refreshed and the queue drained right away.
    pub async fn start(self: &Arc<Self>) -> Result<JoinHandle<()>, StoreError> {
        self.store.recover_interrupted().await?;
        self.publish().await;

        let mut network = self.monitor.subscribe();
        let mut draining = self.engine.subscribe_draining();
        if self.monitor.is_online() {
            self.spawn_online_sync();
        }

        let manager = Arc::clone(self);
        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = network.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let status = *network.borrow_and_update();
                        if status.is_online() {
                            manager.spawn_online_sync();
                        }
                        manager.publish().await;
                    }
                    changed = draining.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        draining.borrow_and_update();
                        manager.publish().await;
                    }
                }
            }
        }))
    }

    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    /// Feed the platform's online/offline signal
    pub fn set_online(&self, online: bool) {
        self.monitor.set_online(online);
    }

    /// Submit directly when possible, otherwise queue
    ///
    /// Network failures never reach the caller; the report is queued
    /// instead. Only a failing local store is an error.
    pub async fn submit(&self, draft: ReportDraft) -> Result<SubmitOutcome, StoreError> {
        let draft = self.attribute(draft);
        if self.monitor.is_online() && draft.has_identity() {
            match self.committer.commit(&draft).await {
                Ok(row) => {
                    tracing::info!(report_id = %row.id, "submitted report");
                    return Ok(SubmitOutcome::Submitted(row));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "direct submit failed, queueing report");
                }
            }
        }

        let entry = self.store.enqueue(draft).await?;
        tracing::info!(entry_id = %entry.id, "queued report");
        self.publish().await;
        Ok(SubmitOutcome::Queued(entry))
    }

    /// Queue a report without trying the backend first
    ///
    /// Kicks off a drain in the background when online.
    pub async fn enqueue(&self, draft: ReportDraft) -> Result<QueueEntry, StoreError> {
        let entry = self.store.enqueue(self.attribute(draft)).await?;
        tracing::info!(entry_id = %entry.id, "queued report");
        self.publish().await;
        if self.monitor.is_online() {
            self.spawn_drain();
        }
        Ok(entry)
    }

    /// Fill in the signed-in user when the draft carries none
    fn attribute(&self, mut draft: ReportDraft) -> ReportDraft {
        if !draft.has_identity() {
            if let Some(user_id) = self.identity.current_user_id() {
                draft.reported_by = user_id;
            }
        }
        draft
    }

    pub async fn capture_photo(&self, image: RawImage) -> Result<CapturedPhoto, CaptureError> {
        self.capture.capture(image).await
    }

    /// Drain now and wait for it
    pub async fn sync_now(&self) -> Result<DrainOutcome, StoreError> {
        let outcome = self.engine.drain().await?;
        self.publish().await;
        Ok(outcome)
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let outcome = self.refresher.refresh().await;
        self.publish().await;
        outcome
    }

    pub async fn queue_stats(&self) -> Result<QueueStats, StoreError> {
        self.store.stats(self.committer.retry_policy().max_retries).await
    }

    /// Entries stuck at the retry ceiling
    pub async fn exhausted_entries(&self) -> Result<Vec<QueueEntry>, StoreError> {
        self.store
            .exhausted_entries(self.committer.retry_policy().max_retries)
            .await
    }

    /// Give an exhausted entry a fresh set of attempts
    pub async fn retry_entry(&self, id: &str) -> Result<QueueEntry, StoreError> {
        let entry = self.store.retry_entry(id).await?;
        self.publish().await;
        Ok(entry)
    }

    pub async fn discard_entry(&self, id: &str) -> Result<QueueEntry, StoreError> {
        let entry = self.store.discard_entry(id).await?;
        tracing::info!(entry_id = %id, "discarded queued report");
        self.publish().await;
        Ok(entry)
    }

    pub async fn status(&self) -> Result<SyncStatus, StoreError> {
        Ok(SyncStatus {
            is_online: self.monitor.is_online(),
            pending_count: self.store.pending_count().await?,
            is_syncing: self.engine.is_draining(),
            last_sync_time: self.store.last_sync_time().await?,
            cached_reports: self.store.cached_reports().await?,
        })
    }

    /// Receiver updated after transitions, enqueues, drains and refreshes
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    async fn publish(&self) {
        match self.status().await {
            Ok(status) => {
                self.status.send_replace(status);
            }
            Err(e) => tracing::error!(error = %e, "failed to read sync status"),
        }
    }

    fn spawn_drain(&self) {
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            if let Err(e) = engine.drain().await {
                tracing::error!(error = %e, "queue drain failed");
            }
        });
    }

    /// Refresh the cache, then drain if anything is waiting
    fn spawn_online_sync(&self) {
        let store = Arc::clone(&self.store);
        let refresher = Arc::clone(&self.refresher);
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            refresher.refresh().await;
            match store.pending_count().await {
                Ok(0) => {}
                Ok(_) => {
                    if let Err(e) = engine.drain().await {
                        tracing::error!(error = %e, "queue drain failed");
                    }
                }
                Err(e) => tracing::error!(error = %e, "failed to read queue"),
            }
        });
    }
}
