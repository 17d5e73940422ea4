//! Background posting reconciliation for the posting index.
//!
//! Every document write or delete is followed by a notification carrying
//! the document id and the doc number the write was assigned (`0` for a
//! delete). A single background worker consumes those notifications, scans
//! the stored postings of the document, retires the ones the new write
//! supersedes and keeps the live document count current.
//!
//! ## Key Components
//!
//! - [`Lookuper`]: owns the bounded queue and the worker task; start/stop lifecycle
//! - [`Notifier`]: cloneable producer handle used by index writers
//! - [`Reconciler`]: the per-task scan / compare / migrate / count algorithm
//! - [`MigrationSink`]: receives obsolete doc numbers; [`PostingPruner`] deletes them
//! - [`DocCount`]: shared live document counter
//! - [`DrainWait`]: test hook that waits for the queue to drain
//!
//! ## Example
//!
//! ```ignore
//! use index_reconcile::{DocCount, Lookuper, PostingPruner, Reconciler};
//!
//! let doc_count = DocCount::from_storage(&storage)?;
//! let sink = Arc::new(PostingPruner::new(storage.clone()));
//! let reconciler = Reconciler::new(storage, sink, doc_count);
//! let mut lookuper = Lookuper::new(reconciler, settings.reconciler)?;
//! lookuper.start()?;
//!
//! // After writing version 7 of "doc-1":
//! lookuper.notify(7, "doc-1").await?;
//!
//! lookuper.stop().await?;
//! ```

pub mod counter;
pub mod drain;
pub mod error;
pub mod lookuper;
pub mod reconciler;
pub mod sink;

pub use counter::{DocCount, TaskCounters};
pub use drain::{DrainWait, TaskDrain};
pub use error::ReconcileError;
pub use lookuper::{LifecycleState, Lookuper, Notifier};
pub use reconciler::{obsolete_doc_nums, DocTransition, ReconcileOutcome, Reconciler};
pub use sink::{MigrationSink, PostingPruner};
