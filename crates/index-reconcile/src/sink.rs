//! Migration sinks.
//!
//! The worker hands each document's obsolete doc numbers to a
//! [`MigrationSink`], which owns physically retiring those postings.
//! The call is synchronous from the worker's side and cannot fail back
//! into it: a sink logs or retries on its own terms.

use std::sync::Arc;

use tracing::{debug, warn};

use index_storage::Storage;
use index_types::{DocNumber, DocNumberList};

/// Receiver of obsolete postings.
pub trait MigrationSink: Send + Sync {
    /// Retire `obsolete` doc numbers of `doc_id`, superseded by `doc_num`
    /// (`0` when the document was deleted).
    fn migrate(&self, doc_id: &[u8], doc_num: DocNumber, obsolete: DocNumberList);

    /// Name of this sink for logging.
    fn name(&self) -> &str {
        "migration-sink"
    }
}

impl<T: MigrationSink + ?Sized> MigrationSink for Arc<T> {
    fn migrate(&self, doc_id: &[u8], doc_num: DocNumber, obsolete: DocNumberList) {
        (**self).migrate(doc_id, doc_num, obsolete)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Sink that deletes obsolete postings straight from storage.
pub struct PostingPruner {
    storage: Arc<Storage>,
}

impl PostingPruner {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl MigrationSink for PostingPruner {
    fn migrate(&self, doc_id: &[u8], doc_num: DocNumber, obsolete: DocNumberList) {
        if obsolete.is_empty() {
            return;
        }

        match self.storage.delete_postings(doc_id, &obsolete) {
            Ok(deleted) => debug!(
                doc_id = %String::from_utf8_lossy(doc_id),
                doc_num,
                obsolete = ?obsolete,
                deleted,
                "Pruned obsolete postings"
            ),
            Err(e) => warn!(
                doc_id = %String::from_utf8_lossy(doc_id),
                doc_num,
                obsolete = ?obsolete,
                error = %e,
                "Failed to prune obsolete postings"
            ),
        }
    }

    fn name(&self) -> &str {
        "posting-pruner"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_storage::TermFreqRow;
    use tempfile::TempDir;

    #[test]
    fn test_pruner_removes_obsolete_versions() {
        let temp = TempDir::new().unwrap();
        let storage = Arc::new(Storage::open(temp.path()).unwrap());
        storage
            .put_postings(&[
                TermFreqRow::new(b"a".to_vec(), 1, "x", 3, 1),
                TermFreqRow::new(b"a".to_vec(), 1, "x", 5, 1),
                TermFreqRow::new(b"a".to_vec(), 1, "x", 7, 1),
            ])
            .unwrap();

        let pruner = PostingPruner::new(Arc::clone(&storage));
        pruner.migrate(b"a", 7, vec![3, 5]);

        let stats = storage.stats().unwrap();
        assert_eq!(stats.posting_count, 1);
        assert_eq!(stats.document_count, 1);
    }

    #[test]
    fn test_pruner_ignores_empty_obsolete_set() {
        let temp = TempDir::new().unwrap();
        let storage = Arc::new(Storage::open(temp.path()).unwrap());
        storage
            .put_postings(&[TermFreqRow::new(b"a".to_vec(), 1, "x", 3, 1)])
            .unwrap();

        let pruner = PostingPruner::new(Arc::clone(&storage));
        pruner.migrate(b"a", 3, Vec::new());
        assert_eq!(storage.stats().unwrap().posting_count, 1);
        assert_eq!(pruner.name(), "posting-pruner");
    }
}
