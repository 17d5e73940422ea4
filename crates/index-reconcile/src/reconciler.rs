//! Per-task reconciliation.
//!
//! For one [`ReconciliationTask`] the reconciler scans every stored posting
//! of the document, works out which doc numbers the task supersedes, hands
//! those to the [`MigrationSink`] and adjusts the live document count.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use index_storage::{PostingStore, TermFreqKey, TermFreqRow};
use index_types::{DocNumber, DocNumberList, ReconciliationTask, DELETED_DOC_NUM};

use crate::counter::DocCount;
use crate::error::ReconcileError;
use crate::sink::MigrationSink;

/// Effect of a task on the live document count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocTransition {
    /// First version of a new document (+1)
    Insert,
    /// New version replacing existing ones (0)
    Update,
    /// Existing document removed (-1)
    Delete,
    /// Deletion of a document with no postings (0)
    Noop,
}

impl DocTransition {
    /// Classify a task from whether it is a delete and whether anything was obsoleted.
    pub fn classify(obsolete_is_empty: bool, is_delete: bool) -> Self {
        match (obsolete_is_empty, is_delete) {
            (true, false) => DocTransition::Insert,
            (false, false) => DocTransition::Update,
            (false, true) => DocTransition::Delete,
            (true, true) => DocTransition::Noop,
        }
    }

    /// Change applied to the live document count.
    pub fn delta(&self) -> i64 {
        match self {
            DocTransition::Insert => 1,
            DocTransition::Delete => -1,
            DocTransition::Update | DocTransition::Noop => 0,
        }
    }
}

impl fmt::Display for DocTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocTransition::Insert => write!(f, "insert"),
            DocTransition::Update => write!(f, "update"),
            DocTransition::Delete => write!(f, "delete"),
            DocTransition::Noop => write!(f, "noop"),
        }
    }
}

/// Doc numbers that `doc_num` supersedes.
///
/// A deletion supersedes everything. Otherwise only strictly smaller doc
/// numbers are obsolete: `doc_num` itself is the version just written, and
/// anything larger belongs to a newer write that has already landed.
pub fn obsolete_doc_nums(existing: &[DocNumber], doc_num: DocNumber) -> DocNumberList {
    existing
        .iter()
        .copied()
        .filter(|&n| doc_num == DELETED_DOC_NUM || n < doc_num)
        .collect()
}

/// Result of reconciling one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Doc number the task referred to
    pub doc_num: DocNumber,
    /// Distinct doc numbers found in storage, ascending
    pub existing: DocNumberList,
    /// How many of them were handed to the sink
    pub obsolete_count: usize,
    /// Effect on the live document count
    pub transition: DocTransition,
}

/// Reconciles tasks against a posting store.
pub struct Reconciler {
    store: Arc<dyn PostingStore>,
    sink: Arc<dyn MigrationSink>,
    doc_count: DocCount,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn PostingStore>,
        sink: Arc<dyn MigrationSink>,
        doc_count: DocCount,
    ) -> Self {
        Self {
            store,
            sink,
            doc_count,
        }
    }

    /// Handle to the live document counter this reconciler maintains.
    pub fn doc_count(&self) -> &DocCount {
        &self.doc_count
    }

    /// Reconcile one task end to end.
    ///
    /// On error nothing has been migrated and the counter is untouched.
    pub fn reconcile(&self, task: &ReconciliationTask) -> Result<ReconcileOutcome, ReconcileError> {
        let existing = self.existing_doc_nums(task.doc_id())?;
        let obsolete = obsolete_doc_nums(&existing, task.doc_num());
        let transition = DocTransition::classify(obsolete.is_empty(), task.is_delete());
        let obsolete_count = obsolete.len();

        debug!(
            doc_id = %String::from_utf8_lossy(task.doc_id()),
            doc_num = task.doc_num(),
            existing = ?existing,
            obsolete = ?obsolete,
            sink = self.sink.name(),
            "Migrating obsolete postings"
        );
        self.sink.migrate(task.doc_id(), task.doc_num(), obsolete);

        self.doc_count.apply(transition.delta());

        Ok(ReconcileOutcome {
            doc_num: task.doc_num(),
            existing,
            obsolete_count,
            transition,
        })
    }

    /// Scan the store for every doc number of `doc_id`.
    fn existing_doc_nums(&self, doc_id: &[u8]) -> Result<DocNumberList, ReconcileError> {
        let prefix = TermFreqKey::doc_prefix(doc_id).map_err(ReconcileError::InvalidDocId)?;
        let reader = self.store.reader().map_err(ReconcileError::Reader)?;

        debug!(prefix = ?prefix, "Scanning postings");
        let mut doc_nums = DocNumberList::new();
        let scanned = reader.visit_prefix(&prefix, &mut |key, value| {
            let row = TermFreqRow::from_kv(key, value)?;
            debug!(
                field = row.key.field,
                term = %row.key.term,
                doc_num = row.doc_num(),
                "Saw posting"
            );
            doc_nums.push(row.doc_num());
            Ok(true)
        });

        // Close is always attempted and reported on its own; it never
        // replaces the scan result.
        if let Err(e) = reader.close() {
            warn!(
                doc_id = %String::from_utf8_lossy(doc_id),
                scan_failed = scanned.is_err(),
                error = %e,
                "Failed to close posting reader"
            );
        }
        scanned.map_err(ReconcileError::Scan)?;

        doc_nums.sort_unstable();
        doc_nums.dedup();
        Ok(doc_nums)
    }
}
