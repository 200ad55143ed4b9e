//! Bounded task runner for search crawls
//!
//! Every submitted crawl becomes a tokio task tracked in a `JoinSet`. A
//! semaphore bounds how many run at once; tasks beyond that wait for a permit
//! inside their own task, so submission itself never blocks.

use crate::service::SearchError;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug)]
pub struct TaskRunner {
    permits: Arc<Semaphore>,
    tasks: Mutex<JoinSet<()>>,
    closed: AtomicBool,
}

impl TaskRunner {
    /// Creates a runner allowing at most `max_concurrent` tasks to run at once
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            tasks: Mutex::new(JoinSet::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Schedules `task`, failing once shutdown has begun
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit<Fut>(&self, task: Fut) -> Result<(), SearchError>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(SearchError::RunnerClosed);
        }

        // Reap finished tasks so the set does not grow with history
        while let Some(result) = tasks.try_join_next() {
            log_task_result(result);
        }

        let permits = Arc::clone(&self.permits);
        tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            task.await;
        });

        Ok(())
    }

    /// Number of submitted tasks not yet reaped
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stops admission, waits up to `grace` for tasks to finish, then aborts the rest
    ///
    /// Returns the number of tasks that were cancelled.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        let mut tasks = {
            let mut guard = self.tasks.lock();
            self.closed.store(true, Ordering::Release);
            std::mem::take(&mut *guard)
        };

        tracing::info!(
            "Shutting down task runner; waiting up to {:?} for {} tasks",
            grace,
            tasks.len()
        );

        let drained = tokio::time::timeout(grace, async {
            while let Some(result) = tasks.join_next().await {
                log_task_result(result);
            }
        })
        .await;

        if drained.is_ok() {
            tracing::info!("All search tasks finished");
            return 0;
        }

        let remaining = tasks.len();
        tracing::warn!("Grace period elapsed; cancelling {} search tasks", remaining);
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        remaining
    }
}

fn log_task_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!("Search task panicked: {}", e);
        }
    }
}
