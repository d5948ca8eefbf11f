//! Storage that refuses a chosen write

use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use straywatch::local_db::{MemoryStorage, Storage};
use straywatch::shared::error::StoreError;

/// In-memory storage whose n-th `put` after arming fails with an I/O error
#[derive(Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    /// Puts left before the failing one, 0 when disarmed
    countdown: AtomicUsize,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`-th put from now (1 is the next one)
    pub fn fail_put(&self, n: usize) {
        self.countdown.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let hit = self
            .countdown
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .map(|left| left == 1)
            .unwrap_or(false);
        if hit {
            return Err(StoreError::Io(io::Error::other("disk full")));
        }
        self.inner.put(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }
}
