//! Cancellable one-shot deferred work.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// A task that runs once after a delay, unless cancelled first.
///
/// [`fire_now`](Self::fire_now) skips the remaining delay.
pub struct DeferredTask {
    handle: JoinHandle<()>,
    trigger: Arc<Notify>,
}

impl DeferredTask {
    /// Schedule `work` to run after `delay`. Must be called inside a runtime.
    pub fn schedule<F, Fut>(delay: Duration, work: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let trigger = Arc::new(Notify::new());
        let fired = Arc::clone(&trigger);

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = fired.notified() => {}
            }
            work().await;
        });

        Self { handle, trigger }
    }

    /// Run the work now instead of waiting out the delay.
    pub fn fire_now(&self) {
        // notify_one keeps a permit if the task has not started waiting yet.
        self.trigger.notify_one();
    }

    /// Cancel the task. Work already running is aborted at its next
    /// suspension point.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Check whether the task ran to completion or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task. Returns `false` if it was cancelled.
    pub async fn join(self) -> bool {
        self.handle.await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_task(delay: Duration) -> (DeferredTask, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let task = DeferredTask::schedule(delay, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (task, runs)
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_after_delay() {
        let (task, runs) = counter_task(Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        assert!(task.join().await);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_now_skips_delay() {
        let (task, runs) = counter_task(Duration::from_secs(3600));
        task.fire_now();

        let start = tokio::time::Instant::now();
        assert!(task.join().await);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let (task, runs) = counter_task(Duration::from_secs(1));
        task.cancel();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(task.is_finished());
        assert!(!task.join().await);
    }
}
