//! Read-only access to stored postings.
//!
//! [`PostingStore`] hands out point-in-time [`PostingReader`]s; a reader
//! walks the rows under a key prefix in key order. Consumers that only
//! need to scan (the reconciliation worker, tests with fake stores)
//! depend on these traits rather than on [`crate::Storage`] directly.

use crate::error::StorageError;

/// Callback invoked for every row under a scanned prefix.
///
/// Returning `Ok(false)` stops the scan early; an `Err` aborts it and is
/// propagated to the caller of [`PostingReader::visit_prefix`].
pub type VisitFn<'v> = dyn FnMut(&[u8], &[u8]) -> Result<bool, StorageError> + 'v;

/// A read-only, consistent view of the posting rows.
pub trait PostingReader {
    /// Visit every row whose key starts with `prefix`, in key order.
    fn visit_prefix(&self, prefix: &[u8], visit: &mut VisitFn<'_>) -> Result<(), StorageError>;

    /// Release the reader.
    fn close(self: Box<Self>) -> Result<(), StorageError>;
}

/// Factory for posting readers.
pub trait PostingStore: Send + Sync {
    /// Open a reader over the current state of the store.
    fn reader(&self) -> Result<Box<dyn PostingReader + '_>, StorageError>;
}

impl<T: PostingStore + ?Sized> PostingStore for std::sync::Arc<T> {
    fn reader(&self) -> Result<Box<dyn PostingReader + '_>, StorageError> {
        (**self).reader()
    }
}
