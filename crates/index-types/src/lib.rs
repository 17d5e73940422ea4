//! # index-types
//!
//! Shared domain types for the posting index.
//!
//! This crate defines the data structures passed between the index
//! writers, the storage layer and the background reconciliation worker:
//! - Tasks: notifications that a document was written or deleted
//! - Doc numbers: per-write sequence numbers (`0` means deleted)
//! - Settings: layered configuration for the admin tool and the worker
//!
//! ## Usage
//!
//! ```rust
//! use index_types::ReconciliationTask;
//!
//! let task = ReconciliationTask::new(b"doc-1".to_vec(), 7);
//! assert!(!task.is_delete());
//! ```

pub mod config;
pub mod error;
pub mod task;

pub use config::{ReconcilerConfig, Settings};
pub use error::TypesError;
pub use task::{DocNumber, DocNumberList, ReconciliationTask, DELETED_DOC_NUM};
