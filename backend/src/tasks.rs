//! Fire-and-forget task runner.
//!
//! Work handed to [`TaskRunner::spawn`] is detached from the caller. Its only
//! error channel is the log: a panicking task is reported through `tracing`
//! and nothing else observes it.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Spawns detached background work and counts what is still running.
#[derive(Debug, Clone, Default)]
pub struct TaskRunner {
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight count when the task ends, including by panic.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` in the background. The caller never awaits it.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(self.in_flight.clone());

        let handle = tokio::spawn(task);
        tokio::spawn(async move {
            let _guard = guard;
            match handle.await {
                Ok(()) => tracing::debug!(task = name, "Background task finished"),
                Err(e) => tracing::error!(task = name, error = %e, "Background task failed"),
            }
        });
    }

    /// Number of spawned tasks that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until every spawned task has finished.
    pub async fn wait_idle(&self) {
        while self.in_flight() > 0 {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }
}
