//! Storage layer for the posting index.
//!
//! Provides RocksDB-backed storage with:
//! - Column family isolation for postings and counters
//! - Document-prefixed term-frequency keys for per-document scans
//! - Atomic writes and deletes via WriteBatch
//! - Snapshot readers behind the [`PostingStore`] / [`PostingReader`] seams

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;
pub mod reader;
pub mod row;

pub use db::{Storage, StorageReader, StorageStats};
pub use error::StorageError;
pub use keys::TermFreqKey;
pub use reader::{PostingReader, PostingStore, VisitFn};
pub use row::{TermFreqRow, TermFreqValue};
