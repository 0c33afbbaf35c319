use std::{future::Future, sync::Arc};

use thiserror::Error;
use tokio::{sync::Semaphore, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 10;
pub const MAX_CONCURRENT_REQUESTS: usize = Semaphore::MAX_PERMITS;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("cancelled before it started")]
    Cancelled,

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("limiter is closed")]
    Closed,
}

/// Bounds how many tasks run at once. Waiting tasks are admitted in submission order.
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_REQUESTS)
    }
}

impl ConcurrencyLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.clamp(1, MAX_CONCURRENT_REQUESTS);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.semaphore.available_permits()
    }

    /// Runs `task` on the current task once a slot is free.
    pub async fn schedule<F, T>(&self, task: F) -> Result<T, ScheduleError>
    where
        F: Future<Output = T>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ScheduleError::Closed)?;

        Ok(task.await)
    }

    /// Spawns every task behind the limiter and returns their outputs by input position.
    ///
    /// Once `cancel` fires, tasks that have not been admitted yet resolve to
    /// [`ScheduleError::Cancelled`]; admitted tasks keep running to completion.
    pub async fn run_batch<F, T>(
        &self,
        tasks: Vec<F>,
        cancel: &CancellationToken,
    ) -> Vec<Result<T, ScheduleError>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let total = tasks.len();
        let mut slots: Vec<Slot<T>> = Vec::with_capacity(total);

        for task in tasks {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&self.semaphore).acquire_owned() => Some(permit),
            };

            let slot = match permit {
                None => Slot::Done(Err(ScheduleError::Cancelled)),
                Some(Err(_)) => Slot::Done(Err(ScheduleError::Closed)),
                Some(Ok(permit)) => Slot::Running(tokio::spawn(async move {
                    let output = task.await;
                    drop(permit);
                    output
                })),
            };

            slots.push(slot);
        }

        let mut results = Vec::with_capacity(total);
        for slot in slots {
            results.push(match slot {
                Slot::Done(result) => result,
                Slot::Running(handle) => handle
                    .await
                    .map_err(|err| ScheduleError::Panicked(err.to_string())),
            });
        }

        let cancelled = results
            .iter()
            .filter(|result| matches!(result, Err(ScheduleError::Cancelled)))
            .count();
        if cancelled > 0 {
            debug!(
                "ConcurrencyLimiter: {} of {} tasks cancelled before admission",
                cancelled, total
            );
        }

        results
    }
}

enum Slot<T> {
    Running(JoinHandle<T>),
    Done(Result<T, ScheduleError>),
}
