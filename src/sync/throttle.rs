// src/sync/throttle.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Pauses briefly after every `every` downloads to stay clear of the remote's
/// rate limits. Shared by all workers; the counter is global to the run.
#[derive(Debug)]
pub struct Throttle {
    every: u64,
    pause: Duration,
    count: AtomicU64,
}

impl Throttle {
    pub fn new(every: u64, pause: Duration) -> Self {
        Self {
            every: every.max(1),
            pause,
            count: AtomicU64::new(0),
        }
    }

    /// Counts one download and sleeps if it completes a batch. Returns whether
    /// it slept.
    pub fn after_download(&self) -> bool {
        let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        if n % self.every == 0 && !self.pause.is_zero() {
            log::debug!("Pausing {:?} after {} downloads", self.pause, n);
            std::thread::sleep(self.pause);
            return true;
        }
        false
    }
}
