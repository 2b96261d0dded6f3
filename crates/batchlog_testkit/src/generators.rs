//! Property-based test generators using proptest.
//!
//! Provides strategies for events, metadata and store operation sequences.

use batchlog_codec::RawBatchEvent;
use proptest::prelude::*;

/// Strategy for generating non-empty event payloads (arbitrary bytes).
pub fn event_data_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..512)
}

/// Strategy for generating JSON event payloads without newlines.
pub fn json_event_strategy() -> impl Strategy<Value = Vec<u8>> {
    (
        prop::string::string_regex("[a-z]{1,12}").expect("Invalid regex"),
        any::<i64>(),
    )
        .prop_map(|(kind, value)| format!(r#"{{"kind":"{kind}","value":{value}}}"#).into_bytes())
}

/// Strategy for generating event metadata, empty included.
pub fn metadata_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// Strategy for generating JSON metadata documents.
pub fn json_metadata_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        Just(Vec::new()),
        any::<u64>().prop_map(|ts| format!(r#"{{"ts":{ts}}}"#).into_bytes()),
    ]
}

/// Strategy for generating a non-empty event.
pub fn raw_event_strategy() -> impl Strategy<Value = RawBatchEvent> {
    (event_data_strategy(), metadata_strategy())
        .prop_map(|(data, metadata)| RawBatchEvent::with_metadata(data, metadata))
}

/// Strategy for generating a sequence of events.
pub fn event_batch_strategy(
    min_events: usize,
    max_events: usize,
) -> impl Strategy<Value = Vec<RawBatchEvent>> {
    prop::collection::vec(raw_event_strategy(), min_events..max_events)
}

/// An operation against a store.
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// Write an event
    Write {
        /// Event payload
        data: Vec<u8>,
    },
    /// Close the current segment
    ForceNewBatch,
    /// Move the clock forward
    Advance {
        /// Milliseconds
        ms: u64,
    },
    /// Read the next batch and drop it
    ReadAndDrop,
    /// Read the next batch and release it
    ReadAndRelease,
}

/// Strategy for generating store operations.
pub fn store_operation_strategy() -> impl Strategy<Value = StoreOperation> {
    prop_oneof![
        6 => json_event_strategy().prop_map(|data| StoreOperation::Write { data }),
        1 => Just(StoreOperation::ForceNewBatch),
        2 => (1u64..3_000).prop_map(|ms| StoreOperation::Advance { ms }),
        2 => Just(StoreOperation::ReadAndDrop),
        1 => Just(StoreOperation::ReadAndRelease),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StoreOperation>> {
    prop::collection::vec(store_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn events_are_never_empty(event in raw_event_strategy()) {
            prop_assert!(!event.is_empty());
        }

        #[test]
        fn json_events_have_no_newline(data in json_event_strategy()) {
            prop_assert!(!data.contains(&b'\n'));
            let is_object = data.first() == Some(&b'{') && data.last() == Some(&b'}');
            prop_assert!(is_object);
        }
    }
}
