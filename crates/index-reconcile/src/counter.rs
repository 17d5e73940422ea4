//! Shared counters.
//!
//! [`DocCount`] is the live document total: mutated only by the
//! reconciliation worker, read by anything holding a clone of the handle.
//! [`TaskCounters`] track notifications for the drain wait.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use index_storage::{Storage, StorageError};
use tracing::warn;

/// Handle to the live document counter.
///
/// Clones share the same underlying atomic. Updates are single atomic
/// operations; a decrement at zero is clamped instead of wrapping.
#[derive(Debug, Clone, Default)]
pub struct DocCount {
    inner: Arc<AtomicU64>,
}

impl DocCount {
    /// Create a counter starting at `initial`.
    pub fn new(initial: u64) -> Self {
        Self {
            inner: Arc::new(AtomicU64::new(initial)),
        }
    }

    /// Seed a counter from the documents currently present in storage.
    pub fn from_storage(storage: &Storage) -> Result<Self, StorageError> {
        Ok(Self::new(storage.count_documents()?))
    }

    /// Current value.
    pub fn get(&self) -> u64 {
        self.inner.load(Ordering::SeqCst)
    }

    /// Apply a signed change from a [`crate::DocTransition`].
    pub(crate) fn apply(&self, delta: i64) {
        let magnitude = delta.unsigned_abs();
        if delta > 0 {
            self.inner.fetch_add(magnitude, Ordering::SeqCst);
        } else if delta < 0 {
            let updated = self
                .inner
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    n.checked_sub(magnitude)
                });
            if let Err(current) = updated {
                warn!(current, delta, "Live document count would drop below zero, keeping it");
            }
        }
    }
}

/// Queued/done/failed task totals.
///
/// Monotonic except for the rollback of a notification that never made
/// it onto the queue.
#[derive(Debug, Default)]
pub struct TaskCounters {
    queued: AtomicU64,
    done: AtomicU64,
    failed: AtomicU64,
}

impl TaskCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn rollback_queued(&self) {
        self.queued.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn record_done(&self) {
        self.done.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    /// Notifications accepted onto the queue.
    pub fn queued(&self) -> u64 {
        self.queued.load(Ordering::SeqCst)
    }

    /// Tasks reconciled to completion.
    pub fn done(&self) -> u64 {
        self.done.load(Ordering::SeqCst)
    }

    /// Tasks dropped after a reader, scan or worker failure.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// True once every queued task has completed.
    pub fn is_drained(&self) -> bool {
        self.queued() == self.done()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_storage::TermFreqRow;
    use tempfile::TempDir;

    #[test]
    fn test_doc_count_clones_share_state() {
        let count = DocCount::new(2);
        let reader = count.clone();
        count.apply(1);
        count.apply(1);
        count.apply(-1);
        count.apply(0);
        assert_eq!(reader.get(), 3);
    }

    #[test]
    fn test_doc_count_does_not_wrap_below_zero() {
        let count = DocCount::new(1);
        count.apply(-1);
        assert_eq!(count.get(), 0);

        count.apply(-1);
        assert_eq!(count.get(), 0);

        count.apply(1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_doc_count_from_storage() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::open(temp.path()).unwrap();
        storage
            .put_postings(&[
                TermFreqRow::new(b"a".to_vec(), 1, "x", 1, 1),
                TermFreqRow::new(b"a".to_vec(), 1, "y", 1, 1),
                TermFreqRow::new(b"b".to_vec(), 1, "x", 2, 1),
            ])
            .unwrap();

        let count = DocCount::from_storage(&storage).unwrap();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_task_counters() {
        let counters = TaskCounters::new();
        assert!(counters.is_drained());

        counters.record_queued();
        counters.record_queued();
        assert!(!counters.is_drained());

        counters.record_done();
        counters.record_failed();
        assert_eq!(counters.queued(), 2);
        assert_eq!(counters.done(), 1);
        assert_eq!(counters.failed(), 1);
        assert!(!counters.is_drained());

        counters.rollback_queued();
        assert!(counters.is_drained());
    }
}
