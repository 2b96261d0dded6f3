//! Stress drivers for batch stores.
//!
//! These verify behavior under heavy load and concurrent access.

use batchlog_codec::RawBatchEvent;
use batchlog_core::BatchStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of writes per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Size of event payloads in bytes.
    pub event_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            event_size: 128,
        }
    }
}

/// Payload of event `i` written by thread `thread`: a fixed-size record
/// starting with `t<thread>-<i>;` and padded with `.`.
#[must_use]
pub fn stress_payload(thread: usize, i: usize, size: usize) -> Vec<u8> {
    let mut data = format!("t{thread}-{i};").into_bytes();
    if data.len() < size {
        data.resize(size, b'.');
    }
    data
}

/// Runs `config.threads` writers in parallel against `store`.
pub fn stress_concurrent_writes(store: &BatchStore, config: &StressConfig) -> StressTestResult {
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let start = Instant::now();

    thread::scope(|scope| {
        for t in 0..config.threads {
            let successful = &successful;
            let failed = &failed;
            scope.spawn(move || {
                for i in 0..config.operations {
                    let event = RawBatchEvent::new(stress_payload(t, i, config.event_size));
                    if store.write(event, None).is_written() {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Drains `store` with `threads` consumers that each drop what they read.
///
/// Returns every batch id read, in no particular order.
pub fn drain_concurrently(store: &BatchStore, threads: usize) -> Vec<String> {
    thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(move || {
                    let mut ids = Vec::new();
                    while let Some(batch) = store.lock_and_read_next() {
                        store.drop_batch(&batch.id);
                        ids.push(batch.id);
                    }
                    ids
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| h.join().expect("Thread panicked"))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestStore;

    #[test]
    fn test_concurrent_writes() {
        let store = TestStore::new();
        let config = StressConfig {
            operations: 200,
            threads: 4,
            event_size: 64,
        };

        let result = stress_concurrent_writes(&store, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 800);
    }

    #[test]
    fn test_result_throughput() {
        let result = StressTestResult::new(90, 10, Duration::from_secs(2));
        assert_eq!(result.total_ops, 100);
        assert!((result.ops_per_second - 50.0).abs() < f64::EPSILON);

        assert_eq!(StressTestResult::new(1, 0, Duration::ZERO).ops_per_second, 0.0);
    }

    #[test]
    fn test_payload_shape() {
        let data = stress_payload(3, 17, 16);
        assert_eq!(data.len(), 16);
        assert!(data.starts_with(b"t3-17;"));
    }
}
