//! # Retry Policy
//!
//! Bounds how often and how long the sync engine works on one entry.
//!
//! - **Retry ceiling**: after `max_retries` failed attempts an entry is
//!   left in the queue untouched until someone resets it
//! - **Commit timeout**: each backend call is cut off after
//!   `commit_timeout`, so a hung connection cannot pin an entry in
//!   `syncing`
//!
//! There is no backoff schedule. Retries happen on the next natural
//! trigger (reconnect, new enqueue, manual sync).

use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::offline::queue;
use crate::shared::error::BackendError;
use crate::shared::report::QueueEntry;

/// Retry ceiling and per-call timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed attempts after which an entry is skipped
    pub max_retries: u32,
    /// Upper bound for one backend call
    pub commit_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            commit_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, commit_timeout: Duration) -> Self {
        Self {
            max_retries,
            commit_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_retries(), config.commit_timeout())
    }

    /// Whether the engine may attempt this entry
    pub fn allows(&self, entry: &QueueEntry) -> bool {
        queue::is_retry_eligible(entry, self.max_retries)
    }

    /// Whether the entry hit the ceiling
    pub fn is_exhausted(&self, entry: &QueueEntry) -> bool {
        queue::needs_attention(entry) && entry.retry_count >= self.max_retries
    }

    /// Run a backend call under the commit timeout
    pub async fn bounded<T, F>(&self, call: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        match tokio::time::timeout(self.commit_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.commit_timeout)),
        }
    }
}
