//! Batcher configuration.

use std::time::Duration;

use ratesync_common::time::constants;

/// Configuration for the [`EventBatcher`](crate::EventBatcher).
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    /// Events per submitted batch; reaching it triggers an automatic flush.
    pub batch_size: usize,
    /// Queue cap; the oldest events are dropped beyond it.
    pub queue_capacity: usize,
    /// Automatic flushes are suppressed this long after a failed flush.
    pub flush_cooldown: Duration,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            queue_capacity: 1000,
            flush_cooldown: constants::FLUSH_COOLDOWN,
        }
    }
}

impl BatcherConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".to_string());
        }
        if self.queue_capacity < self.batch_size {
            return Err("queue_capacity must be >= batch_size".to_string());
        }
        Ok(())
    }
}
