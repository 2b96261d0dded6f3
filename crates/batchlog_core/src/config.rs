//! Persistence configuration.

use crate::error::{CoreError, CoreResult};
use std::time::Duration;

/// Tuning knobs of the segment orchestrator and writer.
///
/// Defaults match a mobile telemetry pipeline: short recency window,
/// small segments, a generous disk budget and an 18 hour retention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceConfig {
    /// How long a new segment stays writable (and unreadable).
    pub recency_window: Duration,

    /// Size cap of a single segment file.
    pub max_segment_bytes: u64,

    /// Size cap of a single event payload.
    pub max_item_bytes: u64,

    /// Number of events after which a segment is closed.
    pub max_items_per_segment: u64,

    /// Age after which a segment is deleted unread.
    pub old_file_threshold: Duration,

    /// Budget for the sum of all segment sizes.
    pub max_disk_space_bytes: u64,

    /// Minimum delay between two cleanup passes.
    pub cleanup_interval: Duration,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            recency_window: Duration::from_secs(5),
            max_segment_bytes: 4 * 1024 * 1024, // 4 MiB
            max_item_bytes: 512 * 1024,         // 512 KiB
            max_items_per_segment: 500,
            old_file_threshold: Duration::from_secs(18 * 60 * 60),
            max_disk_space_bytes: 512 * 1024 * 1024, // 512 MiB
            cleanup_interval: Duration::from_secs(1),
        }
    }
}

impl PersistenceConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the recency window.
    #[must_use]
    pub const fn recency_window(mut self, value: Duration) -> Self {
        self.recency_window = value;
        self
    }

    /// Sets the segment size cap.
    #[must_use]
    pub const fn max_segment_bytes(mut self, value: u64) -> Self {
        self.max_segment_bytes = value;
        self
    }

    /// Sets the event size cap.
    #[must_use]
    pub const fn max_item_bytes(mut self, value: u64) -> Self {
        self.max_item_bytes = value;
        self
    }

    /// Sets the per-segment event count cap.
    #[must_use]
    pub const fn max_items_per_segment(mut self, value: u64) -> Self {
        self.max_items_per_segment = value;
        self
    }

    /// Sets the retention threshold.
    #[must_use]
    pub const fn old_file_threshold(mut self, value: Duration) -> Self {
        self.old_file_threshold = value;
        self
    }

    /// Sets the disk budget.
    #[must_use]
    pub const fn max_disk_space_bytes(mut self, value: u64) -> Self {
        self.max_disk_space_bytes = value;
        self
    }

    /// Sets the delay between cleanup passes.
    #[must_use]
    pub const fn cleanup_interval(mut self, value: Duration) -> Self {
        self.cleanup_interval = value;
        self
    }

    /// Checks that every cap allows at least one event.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] naming the first offending knob.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_segment_bytes == 0 {
            return Err(CoreError::invalid_config("max_segment_bytes must be > 0"));
        }
        if self.max_item_bytes == 0 {
            return Err(CoreError::invalid_config("max_item_bytes must be > 0"));
        }
        if self.max_item_bytes > self.max_segment_bytes {
            return Err(CoreError::invalid_config(
                "max_item_bytes must not exceed max_segment_bytes",
            ));
        }
        if self.max_items_per_segment == 0 {
            return Err(CoreError::invalid_config(
                "max_items_per_segment must be > 0",
            ));
        }
        if self.max_disk_space_bytes == 0 {
            return Err(CoreError::invalid_config(
                "max_disk_space_bytes must be > 0",
            ));
        }
        Ok(())
    }

    /// Recency window applied by writers, 5% shorter than configured.
    #[must_use]
    pub fn write_recency_ms(&self) -> u64 {
        scale_percent(duration_ms(self.recency_window), 95)
    }

    /// Recency window applied by readers, 5% longer than configured.
    #[must_use]
    pub fn read_recency_ms(&self) -> u64 {
        scale_percent(duration_ms(self.recency_window), 105)
    }
}

/// Milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn scale_percent(value: u64, percent: u64) -> u64 {
    let scaled = (u128::from(value) * u128::from(percent) + 50) / 100;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Bytes wrapped around the event payloads of a batch.
///
/// A batch read as `[e1, e2, e3]` becomes
/// `prefix e1 separator e2 separator e3 suffix`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadDecoration {
    /// Inserted between two payloads.
    pub separator: Vec<u8>,
    /// Written before the first payload.
    pub prefix: Vec<u8>,
    /// Written after the last payload.
    pub suffix: Vec<u8>,
}

impl PayloadDecoration {
    /// Creates a decoration.
    pub fn new(
        separator: impl Into<Vec<u8>>,
        prefix: impl Into<Vec<u8>>,
        suffix: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            separator: separator.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// `[a,b,c]`: a JSON array of JSON payloads.
    #[must_use]
    pub fn json_array() -> Self {
        Self::new(b",".to_vec(), b"[".to_vec(), b"]".to_vec())
    }

    /// One payload per line, no prefix or suffix.
    #[must_use]
    pub fn newline_separated() -> Self {
        Self::new(b"\n".to_vec(), Vec::new(), Vec::new())
    }

    /// Joins `payloads` with this decoration.
    pub fn join<'a, I>(&self, payloads: I) -> Vec<u8>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut out = self.prefix.clone();
        for (i, payload) in payloads.into_iter().enumerate() {
            if i > 0 {
                out.extend_from_slice(&self.separator);
            }
            out.extend_from_slice(payload);
        }
        out.extend_from_slice(&self.suffix);
        out
    }
}
