//! Clock abstraction.
//!
//! Segment names and ages use wall-clock milliseconds. The cleanup gate
//! uses a monotonic clock so that a wall-clock jump cannot stall or flood
//! cleanup passes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of time for the engine.
pub trait TimeProvider: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;

    /// Milliseconds on a clock that never goes backwards.
    fn monotonic_ms(&self) -> u64;
}

/// The operating system clocks.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeProvider {
    start: Instant,
}

impl SystemTimeProvider {
    /// Creates a provider whose monotonic clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for SystemTimeProvider {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }

    fn monotonic_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// A manually advanced clock.
///
/// Both clocks move together on [`advance`](Self::advance);
/// [`set_now_ms`](Self::set_now_ms) only moves the wall clock.
#[derive(Debug, Default)]
pub struct FakeClock {
    wall_ms: AtomicU64,
    monotonic_ms: AtomicU64,
}

impl FakeClock {
    /// Creates a clock whose wall time is `start_ms`.
    #[must_use]
    pub fn new(start_ms: u64) -> Self {
        Self {
            wall_ms: AtomicU64::new(start_ms),
            monotonic_ms: AtomicU64::new(0),
        }
    }

    /// Moves both clocks forward.
    pub fn advance(&self, by: Duration) {
        let ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.wall_ms.fetch_add(ms, Ordering::SeqCst);
        self.monotonic_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Moves both clocks forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Sets the wall clock, leaving the monotonic clock untouched.
    pub fn set_now_ms(&self, ms: u64) {
        self.wall_ms.store(ms, Ordering::SeqCst);
    }
}

impl TimeProvider for FakeClock {
    fn now_ms(&self) -> u64 {
        self.wall_ms.load(Ordering::SeqCst)
    }

    fn monotonic_ms(&self) -> u64 {
        self.monotonic_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_after_2020() {
        let clock = SystemTimeProvider::new();
        assert!(clock.now_ms() > 1_577_836_800_000);
        let a = clock.monotonic_ms();
        assert!(clock.monotonic_ms() >= a);
    }

    #[test]
    fn fake_clock_moves_on_demand() {
        let clock = FakeClock::new(1_000);
        clock.advance_ms(250);
        assert_eq!(clock.now_ms(), 1_250);
        assert_eq!(clock.monotonic_ms(), 250);

        clock.set_now_ms(10);
        assert_eq!(clock.now_ms(), 10);
        assert_eq!(clock.monotonic_ms(), 250);
    }
}
