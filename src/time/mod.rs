//! A monotonic millisecond clock and the TTL bucket queue built on it.
//!
//! Everything downstream that cares about expiry -- the [`crate::cache`]
//! and the per-track egress queue -- reads [`Clock::now_ms`] rather than
//! calling [`std::time::Instant::now`] directly, so tests can drive time
//! without sleeping.

mod queue;
pub use queue::*;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default interval at which the background thread bumps the millisecond counter.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// A monotonic millisecond counter, bumped by a dedicated background thread.
///
/// Readers load an `AtomicU64` with no locking; the one thread spawned by
/// [`Clock::spawn`] is the only writer. Cloning a [`Clock`] shares the same
/// counter and the same background thread.
#[derive(Clone)]
pub struct Clock {
    epoch: Instant,
    millis: Arc<AtomicU64>,
}

impl Clock {
    /// Spawn the background thread and return a handle to the counter it drives.
    pub fn spawn() -> Self {
        Self::spawn_with_interval(DEFAULT_TICK_INTERVAL)
    }

    pub fn spawn_with_interval(interval: Duration) -> Self {
        let epoch = Instant::now();
        let millis = Arc::new(AtomicU64::new(0));

        let bg = millis.clone();
        thread::Builder::new()
            .name("moq-tick".into())
            .spawn(move || loop {
                thread::sleep(interval);
                let now = epoch.elapsed().as_millis() as u64;
                bg.store(now, Ordering::Relaxed);
                // The thread outlives every `Clock` handle if the last one
                // is dropped; `Weak` isn't worth the complexity for a
                // single always-on background tick, so it just spins
                // forever. Process exit reaps it.
            })
            .expect("failed to spawn tick thread");

        Self { epoch, millis }
    }

    /// The current tick in whole milliseconds since this clock was spawned.
    pub fn now_ms(&self) -> u64 {
        self.millis.load(Ordering::Relaxed)
    }

    /// Microsecond precision, computed directly from the epoch rather than
    /// from the background-updated counter.
    pub fn now_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_monotonically() {
        let clock = Clock::spawn_with_interval(Duration::from_millis(1));
        let first = clock.now_ms();
        thread::sleep(Duration::from_millis(20));
        let second = clock.now_ms();
        assert!(second > first);
    }
}
