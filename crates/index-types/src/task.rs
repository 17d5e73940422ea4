//! Reconciliation task type.
//!
//! Index writers emit one task per document mutation. The task carries the
//! external document id and the doc number the write was assigned; a doc
//! number of [`DELETED_DOC_NUM`] marks a deletion.

use std::fmt;

/// Sequence number assigned to a document version at write time.
pub type DocNumber = u64;

/// A list of doc numbers, in the order they were observed.
pub type DocNumberList = Vec<DocNumber>;

/// Reserved doc number meaning "document deleted, no new version exists".
pub const DELETED_DOC_NUM: DocNumber = 0;

/// A pending reconciliation for one document.
///
/// Immutable once created; consumed exactly once by the worker.
#[derive(Clone, PartialEq, Eq)]
pub struct ReconciliationTask {
    doc_id: Vec<u8>,
    doc_num: DocNumber,
}

impl ReconciliationTask {
    /// Create a task for the given document and its newly assigned doc number.
    pub fn new(doc_id: impl Into<Vec<u8>>, doc_num: DocNumber) -> Self {
        Self {
            doc_id: doc_id.into(),
            doc_num,
        }
    }

    /// Create a deletion task for the given document.
    pub fn deletion(doc_id: impl Into<Vec<u8>>) -> Self {
        Self::new(doc_id, DELETED_DOC_NUM)
    }

    /// External document identifier (opaque bytes).
    pub fn doc_id(&self) -> &[u8] {
        &self.doc_id
    }

    /// Doc number this notification refers to.
    pub fn doc_num(&self) -> DocNumber {
        self.doc_num
    }

    /// True if the task reports a deletion.
    pub fn is_delete(&self) -> bool {
        self.doc_num == DELETED_DOC_NUM
    }
}

impl fmt::Debug for ReconciliationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconciliationTask")
            .field("doc_id", &String::from_utf8_lossy(&self.doc_id))
            .field("doc_num", &self.doc_num)
            .finish()
    }
}
