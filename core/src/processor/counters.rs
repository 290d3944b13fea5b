//! Processor throughput counters
//!
//! `submitted == processed + dropped` once the processor has shut down.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Running totals shared between the submitting side and the workers.
#[derive(Debug, Default)]
pub struct ProcessorCounters {
    submitted: AtomicU64,
    processed: AtomicU64,
    classified: AtomicU64,
    dropped: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`ProcessorCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    /// Lines accepted by `submit`
    pub submitted: u64,
    /// Lines a worker (or the inline path) finished handling
    pub processed: u64,
    /// Lines that matched a template
    pub classified: u64,
    /// Lines evicted from a full buffer before processing
    pub dropped: u64,
    /// Lines skipped because matching failed or panicked
    pub errors: u64,
}

impl ProcessorCounters {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_processed(&self, lines: u64) {
        self.processed.fetch_add(lines, Ordering::Relaxed);
    }

    pub(crate) fn record_classified(&self) {
        self.classified.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the new drop total.
    pub(crate) fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            classified: self.classified.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.submitted,
            &self.processed,
            &self.classified,
            &self.dropped,
            &self.errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
