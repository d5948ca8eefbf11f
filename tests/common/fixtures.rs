//! Store, engine and draft fixtures

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use straywatch::local_db::sync::LocalStore;
use straywatch::local_db::{MemoryStorage, Storage};
use straywatch::offline::photo::{CompressOptions, CompressedImage, ImageCompressor, RawImage};
use straywatch::shared::error::CaptureError;
use straywatch::shared::report::{ReportCategory, ReportDraft};
use straywatch::sync::{CommitSettings, NetworkMonitor, ReportCommitter, ReportRefresher, SyncEngine};

use super::FakeBackend;

pub const USER: &str = "user-1";

pub fn draft(name: &str, category: ReportCategory) -> ReportDraft {
    ReportDraft::new(name, category, 41.7151, 44.8271, USER)
}

pub fn memory_store() -> Arc<LocalStore> {
    Arc::new(LocalStore::new(Arc::new(MemoryStorage::new())))
}

/// Keeps the first half of the bytes and re-labels them as JPEG
pub struct HalvingCompressor;

impl ImageCompressor for HalvingCompressor {
    fn compress(&self, image: &RawImage, options: &CompressOptions) -> Result<CompressedImage, CaptureError> {
        Ok(CompressedImage {
            bytes: image.bytes[..image.bytes.len() / 2].to_vec(),
            mime_type: options.format.mime_type().to_string(),
        })
    }
}

pub fn sample_image() -> RawImage {
    RawImage::new((0u8..=255).cycle().take(4096).collect(), "image/png")
}

/// Engine wired to in-memory collaborators
pub struct Harness {
    pub store: Arc<LocalStore>,
    pub backend: Arc<FakeBackend>,
    pub monitor: Arc<NetworkMonitor>,
    pub engine: Arc<SyncEngine>,
}

impl Harness {
    pub fn new(online: bool) -> Self {
        Self::with_settings(online, CommitSettings::default())
    }

    pub fn with_settings(online: bool, settings: CommitSettings) -> Self {
        Self::build(online, settings, Arc::new(MemoryStorage::new()))
    }

    pub fn with_storage(online: bool, storage: Arc<dyn Storage>) -> Self {
        Self::build(online, CommitSettings::default(), storage)
    }

    fn build(online: bool, settings: CommitSettings, storage: Arc<dyn Storage>) -> Self {
        let store = Arc::new(LocalStore::new(storage));
        let backend = Arc::new(FakeBackend::new());
        let monitor = Arc::new(NetworkMonitor::new(online));
        let refresher = Arc::new(ReportRefresher::new(
            store.clone(),
            backend.clone(),
            monitor.clone(),
            "dogs_public",
        ));
        let committer = Arc::new(ReportCommitter::new(backend.clone(), settings));
        let engine = Arc::new(SyncEngine::new(store.clone(), monitor.clone(), refresher, committer));
        Self {
            store,
            backend,
            monitor,
            engine,
        }
    }
}

/// Poll `check` until it holds or about two seconds pass
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
