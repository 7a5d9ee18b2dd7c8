use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::constants::PROGRESS_INTERVAL;

/// Progress callback handed in by the collaborator: `(bytes_done, bytes_total)`.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Rate-bounded progress reporting for one transfer leg.
///
/// Callbacks fire at most once per interval, plus always once at the end,
/// so a tight chunk loop cannot flood the collaborator.
pub struct ProgressReporter {
    total: u64,
    callback: Option<ProgressFn>,
    interval: Duration,
    last_emit: Mutex<Instant>,
}

impl ProgressReporter {
    pub fn new(total: u64, callback: Option<ProgressFn>) -> Self {
        Self::with_interval(total, callback, PROGRESS_INTERVAL)
    }

    pub fn with_interval(total: u64, callback: Option<ProgressFn>, interval: Duration) -> Self {
        Self {
            total,
            callback,
            interval,
            last_emit: Mutex::new(Instant::now()),
        }
    }

    /// Reports an intermediate byte count, rate-bounded.
    pub fn tick(&self, done: u64) {
        let Some(callback) = &self.callback else {
            return;
        };
        let mut last = match self.last_emit.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        if last.elapsed() < self.interval {
            return;
        }
        *last = Instant::now();
        callback(done, self.total);
    }

    /// Reports the final byte count, unconditionally.
    pub fn finish(&self, done: u64) {
        if let Some(callback) = &self.callback {
            callback(done, self.total);
        }
    }
}
