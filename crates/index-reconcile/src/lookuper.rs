//! Background reconciliation worker.
//!
//! Index writers call [`Notifier::notify`] after every document write or
//! delete. Notifications go through a bounded FIFO queue to a single worker
//! task that reconciles them one at a time, so migrations for the same or
//! different documents never overlap and the live count sees one update at
//! a time.
//!
//! Lifecycle: `Created -> Running -> Stopping -> Stopped`, no re-entry.
//! [`Lookuper::stop`] lets the in-flight task finish, abandons anything
//! still queued, and returns once the worker has exited.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use index_types::{DocNumber, ReconcilerConfig, ReconciliationTask};

use crate::counter::{DocCount, TaskCounters};
use crate::drain::TaskDrain;
use crate::error::ReconcileError;
use crate::reconciler::Reconciler;

/// Lifecycle state of a [`Lookuper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Created => write!(f, "created"),
            LifecycleState::Running => write!(f, "running"),
            LifecycleState::Stopping => write!(f, "stopping"),
            LifecycleState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Producer handle onto the notification queue.
///
/// Cheap to clone; index writers on any thread may hold one.
#[derive(Clone)]
pub struct Notifier {
    sender: mpsc::Sender<ReconciliationTask>,
    counters: Arc<TaskCounters>,
}

impl Notifier {
    /// Queue a reconciliation for `doc_id`, written as `doc_num`
    /// (`0` for a delete).
    ///
    /// Waits while the queue is full. Fails only if the worker has gone away.
    pub async fn notify(
        &self,
        doc_num: DocNumber,
        doc_id: impl Into<Vec<u8>>,
    ) -> Result<(), ReconcileError> {
        let task = ReconciliationTask::new(doc_id, doc_num);
        self.counters.record_queued();
        if self.sender.send(task).await.is_err() {
            self.counters.rollback_queued();
            return Err(ReconcileError::QueueClosed);
        }
        Ok(())
    }

    /// Blocking variant of [`Notifier::notify`] for producers running
    /// outside the async runtime.
    ///
    /// Must not be called from within an async execution context.
    pub fn blocking_notify(
        &self,
        doc_num: DocNumber,
        doc_id: impl Into<Vec<u8>>,
    ) -> Result<(), ReconcileError> {
        let task = ReconciliationTask::new(doc_id, doc_num);
        self.counters.record_queued();
        if self.sender.blocking_send(task).is_err() {
            self.counters.rollback_queued();
            return Err(ReconcileError::QueueClosed);
        }
        Ok(())
    }
}

/// Owner of the reconciliation worker.
pub struct Lookuper {
    reconciler: Arc<Reconciler>,
    config: ReconcilerConfig,
    notifier: Notifier,
    receiver: Option<mpsc::Receiver<ReconciliationTask>>,
    counters: Arc<TaskCounters>,
    shutdown_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    state: LifecycleState,
}

impl Lookuper {
    /// Create a worker around `reconciler`. Nothing runs until [`Lookuper::start`].
    pub fn new(reconciler: Reconciler, config: ReconcilerConfig) -> Result<Self, ReconcileError> {
        config.validate()?;

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let counters = Arc::new(TaskCounters::new());

        Ok(Self {
            reconciler: Arc::new(reconciler),
            config,
            notifier: Notifier {
                sender,
                counters: Arc::clone(&counters),
            },
            receiver: Some(receiver),
            counters,
            shutdown_token: CancellationToken::new(),
            handle: None,
            state: LifecycleState::Created,
        })
    }

    /// Spawn the worker onto the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::AlreadyStarted` unless the worker is freshly created.
    pub fn start(&mut self) -> Result<(), ReconcileError> {
        if self.state != LifecycleState::Created {
            return Err(ReconcileError::AlreadyStarted);
        }
        let receiver = self
            .receiver
            .take()
            .ok_or(ReconcileError::AlreadyStarted)?;

        self.handle = Some(tokio::spawn(run(
            receiver,
            self.shutdown_token.clone(),
            Arc::clone(&self.reconciler),
            Arc::clone(&self.counters),
        )));
        self.state = LifecycleState::Running;
        info!(
            queue_capacity = self.config.queue_capacity,
            "Lookuper started"
        );
        Ok(())
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// The task being reconciled when stop is requested runs to completion;
    /// tasks still waiting in the queue are abandoned.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::NotRunning` unless the worker is running.
    pub async fn stop(&mut self) -> Result<(), ReconcileError> {
        if self.state != LifecycleState::Running {
            return Err(ReconcileError::NotRunning);
        }

        self.state = LifecycleState::Stopping;
        info!("Stopping lookuper");
        self.shutdown_token.cancel();

        let joined = match self.handle.take() {
            Some(handle) => handle.await,
            None => Ok(()),
        };
        self.state = LifecycleState::Stopped;

        joined.map_err(|e| ReconcileError::Worker(e.to_string()))?;
        info!(
            queued = self.counters.queued(),
            done = self.counters.done(),
            failed = self.counters.failed(),
            "Lookuper stopped"
        );
        Ok(())
    }

    /// Queue a reconciliation. See [`Notifier::notify`].
    pub async fn notify(
        &self,
        doc_num: DocNumber,
        doc_id: impl Into<Vec<u8>>,
    ) -> Result<(), ReconcileError> {
        self.notifier.notify(doc_num, doc_id).await
    }

    /// A producer handle that can be cloned onto writer threads.
    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Handle to the live document counter.
    pub fn doc_count(&self) -> DocCount {
        self.reconciler.doc_count().clone()
    }

    /// Queued/done/failed totals.
    pub fn counters(&self) -> Arc<TaskCounters> {
        Arc::clone(&self.counters)
    }

    /// Test hook for waiting until the queue drains. See [`crate::DrainWait`].
    pub fn drain_hook(&self) -> TaskDrain {
        TaskDrain::new(Arc::clone(&self.counters), self.config.drain_poll_interval())
    }
}

/// Worker loop: one task at a time until stopped or the queue closes.
async fn run(
    mut receiver: mpsc::Receiver<ReconciliationTask>,
    shutdown: CancellationToken,
    reconciler: Arc<Reconciler>,
    counters: Arc<TaskCounters>,
) {
    loop {
        // Stop wins over queued work.
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("Lookuper asked to quit");
                return;
            }
            next = receiver.recv() => next,
        };

        let Some(task) = next else {
            error!("Lookuper work channel closed unexpectedly, stopping");
            return;
        };

        process(&reconciler, &counters, task).await;
    }
}

async fn process(reconciler: &Arc<Reconciler>, counters: &TaskCounters, task: ReconciliationTask) {
    let doc_id = String::from_utf8_lossy(task.doc_id()).into_owned();
    let doc_num = task.doc_num();

    // Scan and migrate are blocking calls.
    let worker = Arc::clone(reconciler);
    let result = tokio::task::spawn_blocking(move || worker.reconcile(&task)).await;

    match result {
        Ok(Ok(outcome)) => {
            counters.record_done();
            debug!(
                doc_id = %doc_id,
                doc_num,
                transition = %outcome.transition,
                obsolete = outcome.obsolete_count,
                "Reconciled document"
            );
        }
        Ok(Err(e)) => {
            counters.record_failed();
            warn!(doc_id = %doc_id, doc_num, error = %e, "Dropping reconciliation task");
        }
        Err(e) => {
            counters.record_failed();
            error!(doc_id = %doc_id, doc_num, error = %e, "Reconciliation task panicked");
        }
    }
}
