//! Trailing-edge debouncer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Coalesces bursts of [`call`](Self::call)s into one run of the action,
/// `window` after the last call of the burst.
pub struct Debouncer {
    tx: mpsc::UnboundedSender<()>,
    handle: JoinHandle<()>,
}

impl Debouncer {
    /// Spawn the debouncer task. Must be called inside a runtime.
    pub fn new<F>(window: Duration, action: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let handle = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                loop {
                    tokio::select! {
                        biased;
                        signal = rx.recv() => {
                            if signal.is_none() {
                                return;
                            }
                        }
                        _ = tokio::time::sleep(window) => break,
                    }
                }
                action();
            }
        });

        Self { tx, handle }
    }

    /// Request a run of the action.
    pub fn call(&self) {
        let _ = self.tx.send(());
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(window: Duration) -> (Debouncer, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let debouncer = Debouncer::new(window, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (debouncer, runs)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_runs_once() {
        let (debouncer, runs) = counting(Duration::from_millis(50));

        for _ in 0..10 {
            debouncer.call();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_run_separately() {
        let (debouncer, runs) = counting(Duration::from_millis(50));

        debouncer.call();
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.call();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_debouncer_never_runs() {
        let (_debouncer, runs) = counting(Duration::from_millis(50));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
