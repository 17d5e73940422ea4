//! Error types for the reconciliation worker.

use index_storage::StorageError;
use index_types::TypesError;
use thiserror::Error;

/// Errors that can occur while reconciling postings or driving the worker
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A read-only reader could not be opened
    #[error("Reader error: {0}")]
    Reader(#[source] StorageError),

    /// Scanning or decoding the document's postings failed
    #[error("Scan error: {0}")]
    Scan(#[source] StorageError),

    /// The document id cannot be turned into a key prefix
    #[error("Invalid doc id: {0}")]
    InvalidDocId(#[source] StorageError),

    /// The worker is no longer accepting notifications
    #[error("Notification queue closed")]
    QueueClosed,

    /// Start called on a worker that is not freshly created
    #[error("Reconciler already started")]
    AlreadyStarted,

    /// Stop called on a worker that is not running
    #[error("Reconciler is not running")]
    NotRunning,

    /// The worker task panicked or was aborted
    #[error("Worker failed: {0}")]
    Worker(String),

    /// Drain wait gave up before every queued task completed
    #[error("Timed out waiting for tasks: {done}/{queued} done")]
    DrainTimeout { queued: u64, done: u64 },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] TypesError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReconcileError::Scan(StorageError::Key("truncated".to_string()));
        assert_eq!(err.to_string(), "Scan error: Key error: truncated");

        let err = ReconcileError::DrainTimeout { queued: 5, done: 3 };
        assert_eq!(err.to_string(), "Timed out waiting for tasks: 3/5 done");

        assert!(ReconcileError::QueueClosed.to_string().contains("closed"));
        assert!(ReconcileError::NotRunning.to_string().contains("not running"));
    }

    #[test]
    fn test_from_types_error() {
        let err: ReconcileError = TypesError::Config("bad".to_string()).into();
        assert!(matches!(err, ReconcileError::Config(_)));
    }
}
