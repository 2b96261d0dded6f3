//! Benchmark utilities.

use batchlog_codec::RawBatchEvent;
use rand::Rng;

/// Generate random event data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate events with `payload_size` bytes of data and a short meta block.
pub fn generate_events(count: usize, payload_size: usize) -> Vec<RawBatchEvent> {
    (0..count)
        .map(|i| RawBatchEvent::with_metadata(random_data(payload_size), format!("{i}").into_bytes()))
        .collect()
}
