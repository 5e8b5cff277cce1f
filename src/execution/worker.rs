//! Bounded pool for asynchronous invocations.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::WorkerPoolClosed;

/// Outcome of [`AsyncWorkerPool::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownReport {
    /// Tasks that ran to completion, over the lifetime of the pool.
    pub completed: usize,
    /// Tasks cancelled because the grace period elapsed.
    pub abandoned: usize,
}

/// Runs submitted futures on the tokio runtime, at most `max_concurrency`
/// at a time.
///
/// Cancellation is only available in aggregate through [`shutdown`](Self::shutdown).
pub struct AsyncWorkerPool {
    tasks: Mutex<JoinSet<()>>,
    permits: Arc<Semaphore>,
    closed: AtomicBool,
    completed: AtomicUsize,
}

impl AsyncWorkerPool {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            tasks: Mutex::new(JoinSet::new()),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            closed: AtomicBool::new(false),
            completed: AtomicUsize::new(0),
        }
    }

    /// Queues `task`. Must be called from within a tokio runtime.
    pub fn submit<F>(&self, task: F) -> Result<(), WorkerPoolClosed>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        // Checked under the lock so nothing lands in a set shutdown already took.
        if self.closed.load(Ordering::Acquire) {
            return Err(WorkerPoolClosed);
        }
        let permits = Arc::clone(&self.permits);
        while let Some(finished) = tasks.try_join_next() {
            self.record(finished);
        }
        tasks.spawn(async move {
            // The semaphore is never closed, so acquiring only waits.
            let _permit = permits.acquire_owned().await;
            task.await;
        });
        Ok(())
    }

    /// Tasks submitted and not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn record(&self, finished: Result<(), tokio::task::JoinError>) {
        match finished {
            Ok(()) => {
                self.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) if e.is_panic() => {
                tracing::error!(target: "wirelink::worker", error = %e, "asynchronous invocation panicked");
            }
            Err(_) => {}
        }
    }

    /// Refuses new work, waits up to `grace` for queued and running tasks,
    /// then aborts whatever is left.
    pub async fn shutdown(&self, grace: Duration) -> ShutdownReport {
        self.closed.store(true, Ordering::Release);
        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));

        let deadline = tokio::time::Instant::now() + grace;
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(finished)) => self.record(finished),
                Ok(None) => break,
                Err(_) => break,
            }
        }

        let abandoned = tasks.len();
        tasks.shutdown().await;
        let report = ShutdownReport {
            completed: self.completed.load(Ordering::Relaxed),
            abandoned,
        };
        tracing::info!(
            target: "wirelink::worker",
            completed = report.completed,
            abandoned = report.abandoned,
            "asynchronous worker pool shut down"
        );
        report
    }
}

impl std::fmt::Debug for AsyncWorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncWorkerPool")
            .field("in_flight", &self.in_flight())
            .field("available_permits", &self.permits.available_permits())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_submitted_work() {
        let pool = AsyncWorkerPool::new(4);
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let done = Arc::clone(&done);
            pool.submit(async move {
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        let report = pool.shutdown(Duration::from_secs(5)).await;
        assert_eq!(done.load(Ordering::SeqCst), 10);
        assert_eq!(report, ShutdownReport { completed: 10, abandoned: 0 });
    }

    #[tokio::test]
    async fn refuses_work_after_shutdown() {
        let pool = AsyncWorkerPool::new(1);
        pool.shutdown(Duration::from_millis(10)).await;
        assert_eq!(pool.submit(async {}), Err(WorkerPoolClosed));
        assert!(pool.is_closed());
    }

    #[tokio::test]
    async fn abandons_work_past_the_grace_period() {
        let pool = AsyncWorkerPool::new(2);
        pool.submit(async {}).unwrap();
        for _ in 0..3 {
            pool.submit(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            })
            .unwrap();
        }
        let report = pool.shutdown(Duration::from_millis(100)).await;
        assert_eq!(report.completed, 1);
        assert_eq!(report.abandoned, 3);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let pool = AsyncWorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.shutdown(Duration::from_secs(5)).await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
