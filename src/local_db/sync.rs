//! # Report Cache and Offline Queue
//!
//! The durable half of the offline subsystem: the cache of approved
//! reports, the queue of drafts waiting to be committed, and the
//! last-refresh timestamp.
//!
//! ## Storage layout
//!
//! | Key | Document |
//! |---|---|
//! | `straywatch.cached_reports` | JSON array of [`CachedReport`] |
//! | `straywatch.offline_queue` | `{"version": 1, "entries": [QueueEntry, ...]}` |
//! | `straywatch.last_sync` | epoch milliseconds |
//!
//! Every write replaces a whole document. Queue mutations are serialized
//! through one lock per store, so a draft enqueued while a drain runs is
//! never lost to a concurrent read-modify-write.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::local_db::{Result, Storage};
use crate::offline::queue::{self, QueueStats};
use crate::shared::error::StoreError;
use crate::shared::report::{CachedReport, EntryStatus, QueueEntry, ReportDraft};

pub const CACHE_KEY: &str = "straywatch.cached_reports";
pub const QUEUE_KEY: &str = "straywatch.offline_queue";
pub const LAST_SYNC_KEY: &str = "straywatch.last_sync";

/// Current version of the persisted queue document
pub const QUEUE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct QueueDocument {
    version: u32,
    entries: Vec<QueueEntry>,
}

/// Durable store for the report cache, the offline queue and sync metadata
pub struct LocalStore {
    storage: Arc<dyn Storage>,
    queue_lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            queue_lock: Mutex::new(()),
        }
    }

    /// Replace the cached reports and stamp the refresh time
    ///
    /// Returns the new last-sync timestamp.
    pub async fn cache_reports(&self, reports: &[CachedReport]) -> Result<i64> {
        let data = serde_json::to_string(reports).map_err(|e| StoreError::corrupt(CACHE_KEY, e))?;
        self.storage.put(CACHE_KEY, &data).await?;

        let now = chrono::Utc::now().timestamp_millis();
        self.storage.put(LAST_SYNC_KEY, &now.to_string()).await?;
        tracing::info!(count = reports.len(), "cached reports");
        Ok(now)
    }

    /// Last cached reports, or an empty list if nothing was cached yet
    ///
    /// An unreadable cache is treated as empty; it is derived data and the
    /// next refresh overwrites it.
    pub async fn cached_reports(&self) -> Result<Vec<CachedReport>> {
        let Some(data) = self.storage.get(CACHE_KEY).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&data) {
            Ok(reports) => Ok(reports),
            Err(e) => {
                tracing::error!(error = %e, "failed to read cached reports");
                Ok(Vec::new())
            }
        }
    }

    /// Time of the last successful cache refresh, epoch milliseconds
    pub async fn last_sync_time(&self) -> Result<Option<i64>> {
        let value = self.storage.get(LAST_SYNC_KEY).await?;
        Ok(value.and_then(|v| v.trim().parse().ok()))
    }

    /// Append a draft to the queue as a new `pending` entry
    pub async fn enqueue(&self, payload: ReportDraft) -> Result<QueueEntry> {
        let entry = QueueEntry::new(payload, chrono::Utc::now().timestamp_millis());
        let added = entry.clone();
        self.mutate_queue(move |entries| entries.push(added)).await?;
        tracing::info!(entry_id = %entry.id, "added report to offline queue");
        Ok(entry)
    }

    /// Remove an entry after its report was committed
    pub async fn dequeue(&self, id: &str) -> Result<bool> {
        let removed = self
            .mutate_queue(|entries| queue::remove(entries, id))
            .await?;
        if removed.is_some() {
            tracing::info!(entry_id = %id, "removed report from offline queue");
        }
        Ok(removed.is_some())
    }

    /// Change an entry's status; moving to `failed` bumps its retry count
    pub async fn set_status(&self, id: &str, status: EntryStatus) -> Result<bool> {
        let found = self
            .mutate_queue(|entries| queue::set_status(entries, id, status))
            .await?;
        if !found {
            tracing::debug!(entry_id = %id, %status, "status change for unknown entry");
        }
        Ok(found)
    }

    /// Number of entries that still need attention (`pending` or `failed`)
    pub async fn pending_count(&self) -> Result<usize> {
        Ok(queue::pending_count(&self.entries().await?))
    }

    /// Snapshot of the queue in enqueue order
    pub async fn entries(&self) -> Result<Vec<QueueEntry>> {
        self.load_queue().await
    }

    /// Queue statistics
    pub async fn stats(&self, max_retries: u32) -> Result<QueueStats> {
        Ok(queue::stats(&self.entries().await?, max_retries))
    }

    /// Demote entries left `syncing` by an interrupted process
    pub async fn recover_interrupted(&self) -> Result<usize> {
        let demoted = self.mutate_queue(|entries| queue::demote_syncing(entries)).await?;
        if demoted > 0 {
            tracing::warn!(count = demoted, "recovered interrupted queue entries");
        }
        Ok(demoted)
    }

    /// Entries past the retry ceiling
    pub async fn exhausted_entries(&self, max_retries: u32) -> Result<Vec<QueueEntry>> {
        Ok(queue::exhausted(&self.entries().await?, max_retries))
    }

    /// Give an entry a fresh retry budget
    pub async fn retry_entry(&self, id: &str) -> Result<QueueEntry> {
        self.mutate_queue(|entries| queue::reset_retries(entries, id))
            .await?
            .ok_or_else(|| StoreError::EntryNotFound(id.to_string()))
    }

    /// Drop an entry without committing it
    pub async fn discard_entry(&self, id: &str) -> Result<QueueEntry> {
        let removed = self
            .mutate_queue(|entries| queue::remove(entries, id))
            .await?
            .ok_or_else(|| StoreError::EntryNotFound(id.to_string()))?;
        tracing::warn!(entry_id = %id, "discarded queue entry");
        Ok(removed)
    }

    async fn mutate_queue<T>(&self, f: impl FnOnce(&mut Vec<QueueEntry>) -> T) -> Result<T> {
        let _guard = self.queue_lock.lock().await;
        let mut entries = self.load_queue().await?;
        let result = f(&mut entries);
        self.save_queue(entries).await?;
        Ok(result)
    }

    async fn load_queue(&self) -> Result<Vec<QueueEntry>> {
        match self.storage.get(QUEUE_KEY).await? {
            Some(data) => decode_queue(&data),
            None => Ok(Vec::new()),
        }
    }

    async fn save_queue(&self, entries: Vec<QueueEntry>) -> Result<()> {
        let document = QueueDocument {
            version: QUEUE_SCHEMA_VERSION,
            entries,
        };
        let data =
            serde_json::to_string(&document).map_err(|e| StoreError::corrupt(QUEUE_KEY, e))?;
        self.storage.put(QUEUE_KEY, &data).await
    }
}

/// Decode a persisted queue, migrating the legacy bare-array layout
fn decode_queue(data: &str) -> Result<Vec<QueueEntry>> {
    let value: serde_json::Value =
        serde_json::from_str(data).map_err(|e| StoreError::corrupt(QUEUE_KEY, e))?;

    if value.is_array() {
        tracing::debug!("migrating unversioned offline queue");
        return serde_json::from_value(value).map_err(|e| StoreError::corrupt(QUEUE_KEY, e));
    }

    let document: QueueDocument =
        serde_json::from_value(value).map_err(|e| StoreError::corrupt(QUEUE_KEY, e))?;
    if document.version > QUEUE_SCHEMA_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: document.version,
            supported: QUEUE_SCHEMA_VERSION,
        });
    }
    Ok(document.entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_db::{LocalDatabase, MemoryStorage};
    use crate::shared::report::{ReportCategory, ReportRow};
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn store() -> (Arc<MemoryStorage>, LocalStore) {
        let storage = Arc::new(MemoryStorage::new());
        (storage.clone(), LocalStore::new(storage))
    }

    fn draft(name: &str) -> ReportDraft {
        ReportDraft::new(name, ReportCategory::Stray, 37.98, 23.72, "user-1")
    }

    fn cached(id: &str) -> CachedReport {
        CachedReport::from(ReportRow {
            id: id.to_string(),
            name: id.to_uppercase(),
            ear_tag: String::new(),
            photo_url: None,
            latitude: 0.0,
            longitude: 0.0,
            location: None,
            is_vaccinated: false,
            vaccination1_date: None,
            vaccination2_date: None,
            vaccination_passport: None,
            additional_info: None,
            is_approved: true,
            reporter_name: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            report_type: ReportCategory::Save,
            urgency_level: None,
            sponsor_name: None,
        })
    }

    #[tokio::test]
    async fn test_empty_store() {
        let (_, store) = store();
        assert!(store.cached_reports().await.unwrap().is_empty());
        assert!(store.entries().await.unwrap().is_empty());
        assert_eq!(store.last_sync_time().await.unwrap(), None);
        assert_eq!(store.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cache_is_replaced_not_merged() {
        let (_, store) = store();
        store.cache_reports(&[cached("a"), cached("b")]).await.unwrap();
        let stamp = store.cache_reports(&[cached("c")]).await.unwrap();

        let reports = store.cached_reports().await.unwrap();
        assert_eq!(reports, vec![cached("c")]);
        assert_eq!(store.last_sync_time().await.unwrap(), Some(stamp));
    }

    #[tokio::test]
    async fn test_corrupt_cache_reads_as_empty() {
        let (storage, store) = store();
        storage.put(CACHE_KEY, "not json").await.unwrap();
        assert!(store.cached_reports().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_then_dequeue() {
        let (_, store) = store();
        let entry = store.enqueue(draft("Rex")).await.unwrap();
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(entry.retry_count, 0);
        assert!(entry.id.starts_with("offline_"));

        let entries = store.entries().await.unwrap();
        assert_eq!(entries, vec![entry.clone()]);

        assert!(store.dequeue(&entry.id).await.unwrap());
        assert!(!store.dequeue(&entry.id).await.unwrap());
        assert!(store.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queue_preserves_enqueue_order() {
        let (_, store) = store();
        let ids: Vec<String> = {
            let mut ids = Vec::new();
            for name in ["a", "b", "c"] {
                ids.push(store.enqueue(draft(name)).await.unwrap().id);
            }
            ids
        };
        let stored: Vec<String> = store.entries().await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(stored, ids);
    }

    #[tokio::test]
    async fn test_status_transitions_and_pending_count() {
        let (_, store) = store();
        let a = store.enqueue(draft("a")).await.unwrap();
        let b = store.enqueue(draft("b")).await.unwrap();

        store.set_status(&a.id, EntryStatus::Syncing).await.unwrap();
        assert_eq!(store.pending_count().await.unwrap(), 1);

        store.set_status(&a.id, EntryStatus::Failed).await.unwrap();
        store.set_status(&b.id, EntryStatus::Failed).await.unwrap();
        assert_eq!(store.pending_count().await.unwrap(), 2);

        let entries = store.entries().await.unwrap();
        assert!(entries.iter().all(|e| e.retry_count == 1));
    }

    #[tokio::test]
    async fn test_recover_interrupted() {
        let (_, store) = store();
        let a = store.enqueue(draft("a")).await.unwrap();
        store.set_status(&a.id, EntryStatus::Syncing).await.unwrap();

        assert_eq!(store.recover_interrupted().await.unwrap(), 1);
        assert_eq!(store.recover_interrupted().await.unwrap(), 0);
        assert_eq!(store.entries().await.unwrap()[0].status, EntryStatus::Pending);
    }

    #[tokio::test]
    async fn test_operator_retry_and_discard() {
        let (_, store) = store();
        let a = store.enqueue(draft("a")).await.unwrap();
        for _ in 0..3 {
            store.set_status(&a.id, EntryStatus::Failed).await.unwrap();
        }
        assert_eq!(store.exhausted_entries(3).await.unwrap().len(), 1);

        let retried = store.retry_entry(&a.id).await.unwrap();
        assert_eq!(retried.retry_count, 0);
        assert!(store.exhausted_entries(3).await.unwrap().is_empty());

        store.discard_entry(&a.id).await.unwrap();
        assert_matches!(store.discard_entry(&a.id).await, Err(StoreError::EntryNotFound(_)));
        assert_matches!(store.retry_entry("nope").await, Err(StoreError::EntryNotFound(_)));
    }

    #[tokio::test]
    async fn test_legacy_bare_array_is_migrated() {
        let (storage, store) = store();
        let legacy = vec![QueueEntry::new(draft("old"), 1)];
        storage
            .put(QUEUE_KEY, &serde_json::to_string(&legacy).unwrap())
            .await
            .unwrap();

        assert_eq!(store.entries().await.unwrap(), legacy);

        // the next write upgrades the document
        store.enqueue(draft("new")).await.unwrap();
        let raw = storage.get(QUEUE_KEY).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], QUEUE_SCHEMA_VERSION);
        assert_eq!(value["entries"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_future_queue_version_is_rejected() {
        let (storage, store) = store();
        storage
            .put(QUEUE_KEY, r#"{"version": 99, "entries": []}"#)
            .await
            .unwrap();
        assert_matches!(
            store.entries().await,
            Err(StoreError::UnsupportedVersion { found: 99, supported: 1 })
        );
    }

    #[tokio::test]
    async fn test_concurrent_enqueues_are_not_lost() {
        let storage = Arc::new(MemoryStorage::new());
        let store = Arc::new(LocalStore::new(storage));

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.enqueue(draft(&format!("dog-{}", i))).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.entries().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_sqlite_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offline.db");

        let id = {
            let db = LocalDatabase::open(&path).await.unwrap();
            let store = LocalStore::new(Arc::new(db.clone()));
            let id = store.enqueue(draft("Rex")).await.unwrap().id;
            db.pool().close().await;
            id
        };

        let store = LocalStore::new(Arc::new(LocalDatabase::open(&path).await.unwrap()));
        let entries = store.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);
        assert_eq!(entries[0].payload.name, "Rex");
    }
}
