//! RocksDB wrapper for posting storage.
//!
//! Provides:
//! - Database open/close with column family setup
//! - Atomic posting writes and deletes via WriteBatch
//! - Snapshot readers with ordered prefix scans
//! - Document counting and a persisted live document count

use rocksdb::{ColumnFamily, Direction, IteratorMode, Options, Snapshot, WriteBatch, DB};
use std::path::Path;
use tracing::{debug, info};

use index_types::DocNumber;

use crate::column_families::{build_cf_descriptors, ALL_CF_NAMES, CF_COUNTERS, CF_POSTINGS};
use crate::error::StorageError;
use crate::keys::{TermFreqKey, DOC_COUNT_KEY};
use crate::reader::{PostingReader, PostingStore, VisitFn};
use crate::row::TermFreqRow;

/// Main storage interface for the posting index
pub struct Storage {
    db: DB,
}

/// Database statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of term-frequency rows
    pub posting_count: u64,
    /// Number of distinct documents with at least one row
    pub document_count: u64,
}

impl Storage {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening storage at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let cf_descriptors = build_cf_descriptors();
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        Ok(Self { db })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(name.to_string()))
    }

    /// Write a batch of postings atomically.
    pub fn put_postings(&self, rows: &[TermFreqRow]) -> Result<(), StorageError> {
        let cf = self.cf(CF_POSTINGS)?;

        let mut batch = WriteBatch::default();
        for row in rows {
            let (key, value) = row.to_kv()?;
            batch.put_cf(cf, key, value);
        }
        self.db.write(batch)?;

        debug!(count = rows.len(), "Stored postings");
        Ok(())
    }

    /// Delete every posting of `doc_id` whose doc number is in `doc_nums`.
    ///
    /// Returns the number of rows deleted.
    pub fn delete_postings(
        &self,
        doc_id: &[u8],
        doc_nums: &[DocNumber],
    ) -> Result<usize, StorageError> {
        if doc_nums.is_empty() {
            return Ok(0);
        }

        let cf = self.cf(CF_POSTINGS)?;
        let prefix = TermFreqKey::doc_prefix(doc_id)?;
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut batch = WriteBatch::default();
        let mut count = 0;
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let tf_key = TermFreqKey::from_bytes(&key)?;
            if doc_nums.contains(&tf_key.doc_num) {
                batch.delete_cf(cf, &key);
                count += 1;
            }
        }

        if count > 0 {
            self.db.write(batch)?;
            debug!(
                doc_id = %String::from_utf8_lossy(doc_id),
                deleted = count,
                "Deleted postings"
            );
        }

        Ok(count)
    }

    /// Open a point-in-time reader over the postings column family.
    pub fn reader(&self) -> Result<StorageReader<'_>, StorageError> {
        let cf = self.cf(CF_POSTINGS)?;
        Ok(StorageReader {
            snapshot: self.db.snapshot(),
            cf,
        })
    }

    /// Count distinct documents that have at least one posting.
    pub fn count_documents(&self) -> Result<u64, StorageError> {
        Ok(self.stats()?.document_count)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let cf = self.cf(CF_POSTINGS)?;

        let mut stats = StorageStats::default();
        let mut last_doc_id: Option<Vec<u8>> = None;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item?;
            let tf_key = TermFreqKey::from_bytes(&key)?;
            stats.posting_count += 1;
            // Rows of one document are contiguous in key order.
            if last_doc_id.as_deref() != Some(tf_key.doc_id.as_slice()) {
                stats.document_count += 1;
                last_doc_id = Some(tf_key.doc_id);
            }
        }

        Ok(stats)
    }

    /// Persist a snapshot of the live document count.
    pub fn put_doc_count(&self, count: u64) -> Result<(), StorageError> {
        let cf = self.cf(CF_COUNTERS)?;
        self.db.put_cf(cf, DOC_COUNT_KEY, count.to_be_bytes())?;
        Ok(())
    }

    /// Load the persisted live document count, if one was saved.
    pub fn get_doc_count(&self) -> Result<Option<u64>, StorageError> {
        let cf = self.cf(CF_COUNTERS)?;
        match self.db.get_cf(cf, DOC_COUNT_KEY)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StorageError::Serialization(format!(
                        "Invalid doc count length: {}",
                        bytes.len()
                    ))
                })?;
                Ok(Some(u64::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    /// Flush all column families to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.flush_cf(cf)?;
            }
        }
        Ok(())
    }
}

impl PostingStore for Storage {
    fn reader(&self) -> Result<Box<dyn PostingReader + '_>, StorageError> {
        Ok(Box::new(Storage::reader(self)?))
    }
}

/// Snapshot-backed reader over the postings column family.
pub struct StorageReader<'a> {
    snapshot: Snapshot<'a>,
    cf: &'a ColumnFamily,
}

impl PostingReader for StorageReader<'_> {
    fn visit_prefix(&self, prefix: &[u8], visit: &mut VisitFn<'_>) -> Result<(), StorageError> {
        let iter = self
            .snapshot
            .iterator_cf(self.cf, IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            if !visit(&key[..], &value[..])? {
                break;
            }
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), StorageError> {
        // Dropping the snapshot releases it inside RocksDB.
        drop(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    fn collect_doc_nums(reader: &dyn PostingReader, doc_id: &[u8]) -> Vec<DocNumber> {
        let prefix = TermFreqKey::doc_prefix(doc_id).unwrap();
        let mut seen = Vec::new();
        reader
            .visit_prefix(&prefix, &mut |key, value| {
                seen.push(TermFreqRow::from_kv(key, value)?.doc_num());
                Ok(true)
            })
            .unwrap();
        seen
    }

    #[test]
    fn test_open_creates_column_families() {
        let (storage, _temp) = create_test_storage();
        for cf_name in ALL_CF_NAMES {
            assert!(
                storage.db.cf_handle(cf_name).is_some(),
                "CF {} should exist",
                cf_name
            );
        }
    }

    #[test]
    fn test_visit_prefix_only_sees_own_document() {
        let (storage, _temp) = create_test_storage();
        storage
            .put_postings(&[
                TermFreqRow::new(b"a".to_vec(), 1, "x", 3, 1),
                TermFreqRow::new(b"a".to_vec(), 2, "y", 5, 1),
                TermFreqRow::new(b"ab".to_vec(), 1, "x", 8, 1),
                TermFreqRow::new(b"b".to_vec(), 1, "x", 9, 1),
            ])
            .unwrap();

        let reader = storage.reader().unwrap();
        assert_eq!(collect_doc_nums(&reader, b"a"), vec![3, 5]);
        assert_eq!(collect_doc_nums(&reader, b"ab"), vec![8]);
        assert!(collect_doc_nums(&reader, b"zz").is_empty());
    }

    #[test]
    fn test_visit_prefix_stops_when_asked() {
        let (storage, _temp) = create_test_storage();
        storage
            .put_postings(&[
                TermFreqRow::new(b"a".to_vec(), 1, "x", 1, 1),
                TermFreqRow::new(b"a".to_vec(), 1, "y", 1, 1),
                TermFreqRow::new(b"a".to_vec(), 1, "z", 1, 1),
            ])
            .unwrap();

        let reader = storage.reader().unwrap();
        let prefix = TermFreqKey::doc_prefix(b"a").unwrap();
        let mut visits = 0;
        reader
            .visit_prefix(&prefix, &mut |_, _| {
                visits += 1;
                Ok(visits < 2)
            })
            .unwrap();
        assert_eq!(visits, 2);
    }

    #[test]
    fn test_visit_prefix_propagates_callback_error() {
        let (storage, _temp) = create_test_storage();
        storage
            .put_postings(&[TermFreqRow::new(b"a".to_vec(), 1, "x", 1, 1)])
            .unwrap();

        let reader = storage.reader().unwrap();
        let prefix = TermFreqKey::doc_prefix(b"a").unwrap();
        let result = reader.visit_prefix(&prefix, &mut |_, _| {
            Err(StorageError::Serialization("bad row".to_string()))
        });
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_reader_is_point_in_time() {
        let (storage, _temp) = create_test_storage();
        storage
            .put_postings(&[TermFreqRow::new(b"a".to_vec(), 1, "x", 1, 1)])
            .unwrap();

        let reader = storage.reader().unwrap();
        storage
            .put_postings(&[TermFreqRow::new(b"a".to_vec(), 1, "x", 2, 1)])
            .unwrap();

        assert_eq!(collect_doc_nums(&reader, b"a"), vec![1]);
        Box::new(reader).close().unwrap();

        let fresh = storage.reader().unwrap();
        assert_eq!(collect_doc_nums(&fresh, b"a"), vec![1, 2]);
    }

    #[test]
    fn test_delete_postings_only_removes_listed_doc_nums() {
        let (storage, _temp) = create_test_storage();
        storage
            .put_postings(&[
                TermFreqRow::new(b"a".to_vec(), 1, "x", 3, 1),
                TermFreqRow::new(b"a".to_vec(), 1, "y", 3, 1),
                TermFreqRow::new(b"a".to_vec(), 1, "x", 5, 1),
                TermFreqRow::new(b"b".to_vec(), 1, "x", 3, 1),
            ])
            .unwrap();

        let deleted = storage.delete_postings(b"a", &[3]).unwrap();
        assert_eq!(deleted, 2);

        let reader = storage.reader().unwrap();
        assert_eq!(collect_doc_nums(&reader, b"a"), vec![5]);
        assert_eq!(collect_doc_nums(&reader, b"b"), vec![3]);
    }

    #[test]
    fn test_delete_postings_empty_list_is_noop() {
        let (storage, _temp) = create_test_storage();
        storage
            .put_postings(&[TermFreqRow::new(b"a".to_vec(), 1, "x", 3, 1)])
            .unwrap();
        assert_eq!(storage.delete_postings(b"a", &[]).unwrap(), 0);
        assert_eq!(storage.stats().unwrap().posting_count, 1);
    }

    #[test]
    fn test_stats_counts_distinct_documents() {
        let (storage, _temp) = create_test_storage();
        storage
            .put_postings(&[
                TermFreqRow::new(b"a".to_vec(), 1, "x", 3, 1),
                TermFreqRow::new(b"a".to_vec(), 2, "y", 4, 1),
                TermFreqRow::new(b"b".to_vec(), 1, "x", 5, 1),
            ])
            .unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.posting_count, 3);
        assert_eq!(stats.document_count, 2);
        assert_eq!(storage.count_documents().unwrap(), 2);
    }

    #[test]
    fn test_doc_count_roundtrip() {
        let (storage, _temp) = create_test_storage();
        assert_eq!(storage.get_doc_count().unwrap(), None);
        storage.put_doc_count(17).unwrap();
        assert_eq!(storage.get_doc_count().unwrap(), Some(17));
    }

    #[test]
    fn test_reopen_preserves_postings() {
        let temp_dir = TempDir::new().unwrap();
        {
            let storage = Storage::open(temp_dir.path()).unwrap();
            storage
                .put_postings(&[TermFreqRow::new(b"a".to_vec(), 1, "x", 3, 1)])
                .unwrap();
            storage.flush().unwrap();
        }
        let storage = Storage::open(temp_dir.path()).unwrap();
        assert_eq!(storage.count_documents().unwrap(), 1);
    }
}
