//! Drain wait for tests and diagnostics.
//!
//! Reconciliation is asynchronous: a successful `notify` says nothing about
//! when the postings are reconciled. Tests that need to observe the result
//! poll the task counters through [`DrainWait`]. This is a convenience for
//! tests and tooling, not a consistency guarantee for production callers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::counter::TaskCounters;
use crate::error::ReconcileError;

/// Wait until every queued task has been reconciled.
#[async_trait]
pub trait DrainWait {
    /// Poll until `queued == done`, or fail with
    /// [`ReconcileError::DrainTimeout`] once `timeout` elapses.
    ///
    /// Tasks dropped after a failure never count as done, so a failed task
    /// keeps the wait from succeeding.
    async fn wait_tasks_done(&self, timeout: Duration) -> Result<(), ReconcileError>;
}

/// Counter-polling [`DrainWait`] handed out by the worker.
#[derive(Debug, Clone)]
pub struct TaskDrain {
    counters: Arc<TaskCounters>,
    poll_interval: Duration,
}

impl TaskDrain {
    pub fn new(counters: Arc<TaskCounters>, poll_interval: Duration) -> Self {
        Self {
            counters,
            poll_interval,
        }
    }
}

#[async_trait]
impl DrainWait for TaskDrain {
    async fn wait_tasks_done(&self, timeout: Duration) -> Result<(), ReconcileError> {
        let counters = &self.counters;
        let poll = async {
            let mut ticker = tokio::time::interval(self.poll_interval);
            loop {
                ticker.tick().await;
                if counters.is_drained() {
                    return;
                }
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| ReconcileError::DrainTimeout {
                queued: counters.queued(),
                done: counters.done(),
            })
    }
}
