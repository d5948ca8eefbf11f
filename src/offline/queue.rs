//! # Pending Queue
//!
//! Pure operations over the in-memory queue of report drafts. No I/O
//! happens here; the durable store loads the queue, applies one of these
//! functions and writes the result back.
//!
//! ## Status transitions
//!
//! ```text
//! pending -> syncing -> (removed) | failed -> syncing -> ...
//! ```
//!
//! Moving to `failed` bumps `retry_count`; no other transition touches it.
//! An entry whose `retry_count` reached the retry ceiling is skipped by
//! the drain but still counted as pending.

use crate::shared::report::{EntryStatus, QueueEntry};

/// Whether an entry still needs attention (`pending` or `failed`)
///
/// `syncing` entries are excluded so an active drain is not double counted.
pub fn needs_attention(entry: &QueueEntry) -> bool {
    matches!(entry.status, EntryStatus::Pending | EntryStatus::Failed)
}

/// Number of entries that still need attention
pub fn pending_count(entries: &[QueueEntry]) -> usize {
    entries.iter().filter(|e| needs_attention(e)).count()
}

/// Whether the drain may attempt this entry
pub fn is_retry_eligible(entry: &QueueEntry, max_retries: u32) -> bool {
    needs_attention(entry) && entry.retry_count < max_retries
}

/// Entries the drain may attempt, in enqueue order
pub fn eligible(entries: &[QueueEntry], max_retries: u32) -> Vec<QueueEntry> {
    entries
        .iter()
        .filter(|e| is_retry_eligible(e, max_retries))
        .cloned()
        .collect()
}

/// Entries that hit the retry ceiling and are no longer attempted
pub fn exhausted(entries: &[QueueEntry], max_retries: u32) -> Vec<QueueEntry> {
    entries
        .iter()
        .filter(|e| needs_attention(e) && e.retry_count >= max_retries)
        .cloned()
        .collect()
}

/// Set an entry's status; `failed` also increments `retry_count`
///
/// Returns false when no entry has this id.
pub fn set_status(entries: &mut [QueueEntry], id: &str, status: EntryStatus) -> bool {
    match entries.iter_mut().find(|e| e.id == id) {
        Some(entry) => {
            if status == EntryStatus::Failed {
                entry.retry_count += 1;
            }
            entry.status = status;
            true
        }
        None => false,
    }
}

/// Remove an entry, returning it
pub fn remove(entries: &mut Vec<QueueEntry>, id: &str) -> Option<QueueEntry> {
    let index = entries.iter().position(|e| e.id == id)?;
    Some(entries.remove(index))
}

/// Put every `syncing` entry back to `pending`
///
/// Used at startup: no drain survives a process restart, so anything
/// still marked `syncing` was interrupted.
pub fn demote_syncing(entries: &mut [QueueEntry]) -> usize {
    let mut demoted = 0;
    for entry in entries.iter_mut().filter(|e| e.status == EntryStatus::Syncing) {
        entry.status = EntryStatus::Pending;
        demoted += 1;
    }
    demoted
}

/// Manual retry: back to `pending` with a fresh retry budget
pub fn reset_retries(entries: &mut [QueueEntry], id: &str) -> Option<QueueEntry> {
    let entry = entries.iter_mut().find(|e| e.id == id)?;
    entry.status = EntryStatus::Pending;
    entry.retry_count = 0;
    Some(entry.clone())
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Total entries in queue
    pub total: usize,
    /// Entries waiting for their first attempt or a retry
    pub pending: usize,
    /// Entries being committed right now
    pub syncing: usize,
    /// Entries whose last attempt failed
    pub failed: usize,
    /// Entries past the retry ceiling
    pub exhausted: usize,
}

/// Compute queue statistics
pub fn stats(entries: &[QueueEntry], max_retries: u32) -> QueueStats {
    let mut stats = QueueStats {
        total: entries.len(),
        ..QueueStats::default()
    };

    for entry in entries {
        match entry.status {
            EntryStatus::Pending => stats.pending += 1,
            EntryStatus::Syncing => stats.syncing += 1,
            EntryStatus::Failed => stats.failed += 1,
        }
        if needs_attention(entry) && entry.retry_count >= max_retries {
            stats.exhausted += 1;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::report::{ReportCategory, ReportDraft};

    fn entry(status: EntryStatus, retry_count: u32) -> QueueEntry {
        let mut entry = QueueEntry::new(
            ReportDraft::new("Rex", ReportCategory::Stray, 0.0, 0.0, "user-1"),
            1_700_000_000_000,
        );
        entry.status = status;
        entry.retry_count = retry_count;
        entry
    }

    #[test]
    fn test_pending_count_excludes_syncing() {
        let entries = vec![
            entry(EntryStatus::Pending, 0),
            entry(EntryStatus::Syncing, 0),
            entry(EntryStatus::Failed, 1),
            entry(EntryStatus::Failed, 3),
        ];
        assert_eq!(pending_count(&entries), 3);
    }

    #[test]
    fn test_failed_increments_retry_count_only_on_failure() {
        let mut entries = vec![entry(EntryStatus::Pending, 0)];
        let id = entries[0].id.clone();

        assert!(set_status(&mut entries, &id, EntryStatus::Syncing));
        assert_eq!(entries[0].retry_count, 0);

        assert!(set_status(&mut entries, &id, EntryStatus::Failed));
        assert_eq!(entries[0].retry_count, 1);

        assert!(set_status(&mut entries, &id, EntryStatus::Pending));
        assert_eq!(entries[0].retry_count, 1);

        assert!(!set_status(&mut entries, "missing", EntryStatus::Failed));
    }

    #[test]
    fn test_eligibility_respects_retry_ceiling() {
        let entries = vec![
            entry(EntryStatus::Pending, 0),
            entry(EntryStatus::Failed, 2),
            entry(EntryStatus::Failed, 3),
            entry(EntryStatus::Syncing, 0),
        ];
        let eligible = eligible(&entries, 3);
        assert_eq!(eligible.len(), 2);
        assert_eq!(eligible[0].id, entries[0].id);
        assert_eq!(eligible[1].id, entries[1].id);

        let exhausted = exhausted(&entries, 3);
        assert_eq!(exhausted.len(), 1);
        assert_eq!(exhausted[0].id, entries[2].id);
    }

    #[test]
    fn test_remove_and_demote() {
        let mut entries = vec![
            entry(EntryStatus::Syncing, 0),
            entry(EntryStatus::Syncing, 2),
            entry(EntryStatus::Failed, 1),
        ];
        let id = entries[2].id.clone();
        assert_eq!(remove(&mut entries, &id).map(|e| e.id), Some(id.clone()));
        assert!(remove(&mut entries, &id).is_none());

        assert_eq!(demote_syncing(&mut entries), 2);
        assert!(entries.iter().all(|e| e.status == EntryStatus::Pending));
        assert_eq!(entries[1].retry_count, 2);
    }

    #[test]
    fn test_reset_retries() {
        let mut entries = vec![entry(EntryStatus::Failed, 3)];
        let id = entries[0].id.clone();
        let reset = reset_retries(&mut entries, &id).unwrap();
        assert_eq!(reset.status, EntryStatus::Pending);
        assert_eq!(reset.retry_count, 0);
        assert!(is_retry_eligible(&entries[0], 3));
    }

    #[test]
    fn test_stats() {
        let entries = vec![
            entry(EntryStatus::Pending, 0),
            entry(EntryStatus::Syncing, 0),
            entry(EntryStatus::Failed, 3),
        ];
        let stats = stats(&entries, 3);
        assert_eq!(
            stats,
            QueueStats { total: 3, pending: 1, syncing: 1, failed: 1, exhausted: 1 }
        );
    }
}
