//! # Synchronization Engine
//!
//! Drains the offline queue into the backend once connectivity returns.
//!
//! ## Drain
//!
//! 1. Bail out if the device is offline or nothing needs attention. If a
//!    drain is already running, ask it to go round once more instead
//! 2. Walk the queue oldest first, skipping entries at the retry ceiling
//!    and entries captured without a signed-in user
//! 3. Per entry: mark `syncing`, commit, then remove it on success or mark
//!    it `failed` on error
//! 4. Refresh the report cache
//! 5. Repeat while another trigger arrived during the pass
//!
//! One entry's failure never stops the others. Network errors end up as
//! entry status, never as an error returned to the caller; only a broken
//! local store surfaces as [`StoreError`]. An entry whose outcome could not
//! be recorded is left `failed`, never `syncing`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! # async fn run(engine: &straywatch::sync::SyncEngine) -> Result<(), straywatch::shared::error::StoreError> {
//! use straywatch::sync::DrainOutcome;
//!
//! if let DrainOutcome::Completed(report) = engine.drain().await? {
//!     println!("synced {} of {}", report.synced, report.attempted);
//! }
//! # Ok(())
//! # }
//! ```

pub mod commit;
pub mod network_monitor;
pub mod refresher;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::local_db::sync::LocalStore;
use crate::shared::error::StoreError;
use crate::shared::report::EntryStatus;

pub use commit::{CommitSettings, ReportCommitter};
pub use network_monitor::{NetworkMonitor, NetworkStatus};
pub use refresher::{RefreshOutcome, ReportRefresher};

/// Per-drain tally
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries a commit was attempted for
    pub attempted: usize,
    /// Committed and removed from the queue
    pub synced: usize,
    /// Commit failed, entry marked `failed`
    pub failed: usize,
    /// Left alone because they hit the retry ceiling
    pub skipped_exhausted: usize,
    /// Left alone because no user was attached
    pub unauthenticated: usize,
    /// Outcome of the cache refresh that closes the drain
    pub refresh: Option<RefreshOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain holds the guard and will run again
    AlreadyRunning,
    Offline,
    /// No pending or failed entries
    Empty,
    Completed(DrainReport),
}

pub struct SyncEngine {
    store: Arc<LocalStore>,
    monitor: Arc<NetworkMonitor>,
    refresher: Arc<ReportRefresher>,
    committer: Arc<ReportCommitter>,
    draining: watch::Sender<bool>,
    /// Set by callers turned away while a drain runs
    rerun_requested: AtomicBool,
}

/// Clears the draining flag however the drain ends
struct DrainGuard<'a> {
    draining: &'a watch::Sender<bool>,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.draining.send_replace(false);
    }
}

impl SyncEngine {
    pub fn new(
        store: Arc<LocalStore>,
        monitor: Arc<NetworkMonitor>,
        refresher: Arc<ReportRefresher>,
        committer: Arc<ReportCommitter>,
    ) -> Self {
        let (draining, _) = watch::channel(false);
        Self {
            store,
            monitor,
            refresher,
            committer,
            draining,
            rerun_requested: AtomicBool::new(false),
        }
    }

    pub fn is_draining(&self) -> bool {
        *self.draining.borrow()
    }

    /// Receiver that wakes when a drain starts or ends
    pub fn subscribe_draining(&self) -> watch::Receiver<bool> {
        self.draining.subscribe()
    }

    /// Take the guard if nobody holds it
    fn try_begin(&self) -> Option<DrainGuard<'_>> {
        let acquired = self.draining.send_if_modified(|draining| {
            if *draining {
                return false;
            }
            *draining = true;
            true
        });
        acquired.then(|| DrainGuard {
            draining: &self.draining,
        })
    }

    /// Push queued reports to the backend
    ///
    /// A call that finds a drain in progress flags it for another pass and
    /// returns [`DrainOutcome::AlreadyRunning`]; the running drain picks up
    /// whatever was queued in the meantime before it returns.
    pub async fn drain(&self) -> Result<DrainOutcome, StoreError> {
        let mut completed = None;
        loop {
            if !self.monitor.is_online() {
                return Ok(completed.unwrap_or(DrainOutcome::Offline));
            }
            let Some(guard) = self.try_begin() else {
                self.rerun_requested.store(true, Ordering::SeqCst);
                // the holder may have let go before seeing the flag
                if self.is_draining() {
                    tracing::debug!("drain already running, requested another pass");
                    return Ok(completed.unwrap_or(DrainOutcome::AlreadyRunning));
                }
                continue;
            };
            let outcome = self.drain_once().await;
            drop(guard);
            let outcome = outcome?;

            // a later empty pass does not hide the work done by an earlier one
            if completed.is_none() || matches!(outcome, DrainOutcome::Completed(_)) {
                completed = Some(outcome);
            }
            if !self.rerun_requested.swap(false, Ordering::SeqCst) {
                break;
            }
            tracing::debug!("running another drain pass");
        }
        Ok(completed.unwrap_or(DrainOutcome::Empty))
    }

    async fn drain_once(&self) -> Result<DrainOutcome, StoreError> {
        if self.store.pending_count().await? == 0 {
            return Ok(DrainOutcome::Empty);
        }

        let policy = *self.committer.retry_policy();
        let mut report = DrainReport::default();

        for entry in self.store.entries().await? {
            if entry.status == EntryStatus::Syncing {
                continue;
            }
            if policy.is_exhausted(&entry) {
                tracing::debug!(entry_id = %entry.id, retry_count = entry.retry_count, "retry ceiling reached, skipping");
                report.skipped_exhausted += 1;
                continue;
            }
            if !entry.payload.has_identity() {
                tracing::warn!(entry_id = %entry.id, "queued report has no user, waiting for sign-in");
                report.unauthenticated += 1;
                continue;
            }

            // the entry may have been discarded since the snapshot
            if !self.store.set_status(&entry.id, EntryStatus::Syncing).await? {
                continue;
            }
            report.attempted += 1;

            let recorded = match self.committer.commit(&entry.payload).await {
                Ok(row) => {
                    let removed = self.store.dequeue(&entry.id).await;
                    if removed.is_ok() {
                        report.synced += 1;
                        tracing::info!(entry_id = %entry.id, report_id = %row.id, "synced queued report");
                    }
                    removed
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        entry_id = %entry.id,
                        retry_count = entry.retry_count + 1,
                        error = %e,
                        "failed to sync queued report"
                    );
                    self.store.set_status(&entry.id, EntryStatus::Failed).await
                }
            };
            if let Err(e) = recorded {
                self.demote(&entry.id).await;
                return Err(e);
            }
        }

        report.refresh = Some(self.refresher.refresh().await);
        tracing::info!(
            synced = report.synced,
            failed = report.failed,
            skipped = report.skipped_exhausted,
            unauthenticated = report.unauthenticated,
            "drain finished"
        );
        Ok(DrainOutcome::Completed(report))
    }

    /// Best-effort move out of `syncing` after the store refused a write
    async fn demote(&self, id: &str) {
        if let Err(e) = self.store.set_status(id, EntryStatus::Failed).await {
            tracing::error!(entry_id = %id, error = %e, "entry left in syncing until restart");
        }
    }
}
