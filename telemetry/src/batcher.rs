//! The event queue and its flush logic.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use ratesync_common::{epoch_seconds, DeviceId, EventParams, SyncErrorKind, TelemetryEvent};
use ratesync_gateway::RemoteGateway;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::BatcherConfig;

/// Result of one flush attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// This many events were accepted and removed from the queue.
    Sent(usize),
    /// Nothing was queued.
    Empty,
    /// The gateway rejected the batch; the queue is unchanged.
    Failed(SyncErrorKind),
    /// Another flush was already running.
    InFlight,
}

/// Point-in-time batcher counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatcherStats {
    pub tracked: u64,
    pub flushed: u64,
    pub dropped: u64,
    pub failed_flushes: u64,
    pub queued: usize,
}

struct QueuedEvent {
    seq: u64,
    event: TelemetryEvent,
}

#[derive(Default)]
struct Queue {
    events: VecDeque<QueuedEvent>,
    next_seq: u64,
    cooldown_until: Option<Instant>,
}

struct Inner {
    gateway: Arc<dyn RemoteGateway>,
    device_id: DeviceId,
    config: BatcherConfig,
    queue: Mutex<Queue>,
    flushing: AtomicBool,
    tracked: AtomicU64,
    flushed: AtomicU64,
    dropped: AtomicU64,
    failed_flushes: AtomicU64,
}

/// Releases the single-flight flag when a flush ends or is cancelled.
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Batched telemetry queue. Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct EventBatcher {
    inner: Arc<Inner>,
}

impl EventBatcher {
    /// Create a new batcher for `device_id`.
    pub fn new(gateway: Arc<dyn RemoteGateway>, device_id: DeviceId, config: BatcherConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                device_id,
                config,
                queue: Mutex::new(Queue::default()),
                flushing: AtomicBool::new(false),
                tracked: AtomicU64::new(0),
                flushed: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
                failed_flushes: AtomicU64::new(0),
            }),
        }
    }

    pub fn device_id(&self) -> DeviceId {
        self.inner.device_id
    }

    /// Enqueue an event. Never blocks on I/O and never fails.
    ///
    /// Reaching `batch_size` queued events starts a background flush unless
    /// one is already running or the post-failure cooldown is active.
    pub fn track(&self, name: impl Into<String>, params: Option<EventParams>) {
        let event = TelemetryEvent::new(name, self.inner.device_id, epoch_seconds(), params);
        self.inner.tracked.fetch_add(1, Ordering::Relaxed);

        let should_flush = {
            let mut queue = self.inner.queue.lock();
            let seq = queue.next_seq;
            queue.next_seq += 1;
            queue.events.push_back(QueuedEvent { seq, event });

            while queue.events.len() > self.inner.config.queue_capacity {
                queue.events.pop_front();
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            }

            let cooling_down = queue
                .cooldown_until
                .map_or(false, |until| Instant::now() < until);
            queue.events.len() >= self.inner.config.batch_size && !cooling_down
        };

        if should_flush {
            self.spawn_auto_flush();
        }
    }

    fn spawn_auto_flush(&self) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                debug!("No runtime available, deferring telemetry flush");
                return;
            }
        };
        if !self.try_acquire_flush() {
            return;
        }

        let batcher = self.clone();
        handle.spawn(async move {
            let _guard = FlushGuard(&batcher.inner.flushing);
            let outcome = batcher.flush_batch().await;
            debug!(?outcome, "Automatic telemetry flush finished");
        });
    }

    fn try_acquire_flush(&self) -> bool {
        self.inner
            .flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Submit up to `batch_size` events from the head of the queue.
    ///
    /// Explicit flushes ignore the failure cooldown.
    pub async fn flush(&self) -> FlushOutcome {
        if !self.try_acquire_flush() {
            return FlushOutcome::InFlight;
        }
        let _guard = FlushGuard(&self.inner.flushing);
        self.flush_batch().await
    }

    /// Caller must hold the flushing flag.
    async fn flush_batch(&self) -> FlushOutcome {
        let (batch, last_seq) = {
            let queue = self.inner.queue.lock();
            let batch: Vec<TelemetryEvent> = queue
                .events
                .iter()
                .take(self.inner.config.batch_size)
                .map(|q| q.event.clone())
                .collect();
            let last_seq = queue
                .events
                .iter()
                .take(self.inner.config.batch_size)
                .last()
                .map(|q| q.seq);
            (batch, last_seq)
        };

        let Some(last_seq) = last_seq else {
            return FlushOutcome::Empty;
        };

        match self.inner.gateway.submit_events(&batch).await {
            Ok(()) => {
                let removed = {
                    let mut queue = self.inner.queue.lock();
                    let mut removed = 0;
                    // Events may have been dropped by the cap meanwhile; only
                    // the sent ones still present are removed.
                    while queue.events.front().map_or(false, |q| q.seq <= last_seq) {
                        queue.events.pop_front();
                        removed += 1;
                    }
                    queue.cooldown_until = None;
                    removed
                };
                self.inner.flushed.fetch_add(batch.len() as u64, Ordering::Relaxed);
                debug!(sent = batch.len(), removed, "Telemetry batch delivered");
                FlushOutcome::Sent(batch.len())
            }
            Err(e) => {
                self.inner.queue.lock().cooldown_until =
                    Some(Instant::now() + self.inner.config.flush_cooldown);
                self.inner.failed_flushes.fetch_add(1, Ordering::Relaxed);
                warn!(
                    count = batch.len(),
                    kind = %e.kind(),
                    error = %e,
                    "Telemetry flush failed, events kept for retry"
                );
                FlushOutcome::Failed(e.kind())
            }
        }
    }

    /// Flush one batch when the app moves to the background.
    pub async fn on_background(&self) -> FlushOutcome {
        self.flush().await
    }

    /// Drain as much of the queue as the gateway accepts before exit.
    pub async fn on_terminate(&self) -> FlushOutcome {
        let mut total = 0;
        loop {
            match self.flush().await {
                FlushOutcome::Sent(n) => {
                    total += n;
                    if self.queue_len() == 0 {
                        break;
                    }
                }
                FlushOutcome::Empty => break,
                other => {
                    info!(sent = total, remaining = self.queue_len(), "Telemetry not fully drained on exit");
                    return other;
                }
            }
        }
        if total == 0 {
            FlushOutcome::Empty
        } else {
            FlushOutcome::Sent(total)
        }
    }

    /// Number of queued events.
    pub fn queue_len(&self) -> usize {
        self.inner.queue.lock().events.len()
    }

    /// Copy of the queued events, oldest first.
    pub fn pending(&self) -> Vec<TelemetryEvent> {
        self.inner.queue.lock().events.iter().map(|q| q.event.clone()).collect()
    }

    /// Check whether a flush is running.
    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.load(Ordering::Acquire)
    }

    /// Get current counters.
    pub fn stats(&self) -> BatcherStats {
        BatcherStats {
            tracked: self.inner.tracked.load(Ordering::Relaxed),
            flushed: self.inner.flushed.load(Ordering::Relaxed),
            dropped: self.inner.dropped.load(Ordering::Relaxed),
            failed_flushes: self.inner.failed_flushes.load(Ordering::Relaxed),
            queued: self.queue_len(),
        }
    }
}
