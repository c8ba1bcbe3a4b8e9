//! Writer counters
//!
//! - Counters only, plus one high-water mark
//! - Monotonic increase
//! - Lock-free; `Relaxed` ordering is enough since nothing synchronizes on them

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// What caused a batch to be flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// Batch reached `max_batch_size`
    Size,
    /// Flush interval elapsed with records buffered
    Timer,
    /// Queue closed with records buffered
    Drain,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushTrigger::Size => "size",
            FlushTrigger::Timer => "timer",
            FlushTrigger::Drain => "drain",
        }
    }
}

/// Counters shared by producers and the consumer.
#[derive(Debug, Default)]
pub struct WriterMetrics {
    records_accepted: AtomicU64,
    rejected_queue_full: AtomicU64,
    rejected_closed: AtomicU64,
    records_written: AtomicU64,
    bytes_written: AtomicU64,
    batches_size: AtomicU64,
    batches_timer: AtomicU64,
    batches_drain: AtomicU64,
    syncs: AtomicU64,
    flush_failures: AtomicU64,
    records_lost: AtomicU64,
    largest_batch: AtomicU64,
}

impl WriterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    // Producer side

    pub fn record_accepted(&self) {
        self.records_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_full(&self) {
        self.rejected_queue_full.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_closed(&self) {
        self.rejected_closed.fetch_add(1, Ordering::Relaxed);
    }

    // Consumer side

    /// Records one durable batch: written in full and synced.
    pub fn record_flush(&self, trigger: FlushTrigger, records: usize, bytes: usize) {
        let counter = match trigger {
            FlushTrigger::Size => &self.batches_size,
            FlushTrigger::Timer => &self.batches_timer,
            FlushTrigger::Drain => &self.batches_drain,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.records_written.fetch_add(records as u64, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
        self.syncs.fetch_add(1, Ordering::Relaxed);
        self.largest_batch.fetch_max(records as u64, Ordering::Relaxed);
    }

    /// Records one record written and synced on its own (baseline writer).
    pub fn record_direct_write(&self, bytes: usize) {
        self.records_accepted.fetch_add(1, Ordering::Relaxed);
        self.records_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
        self.syncs.fetch_add(1, Ordering::Relaxed);
        self.largest_batch.fetch_max(1, Ordering::Relaxed);
    }

    pub fn record_flush_failure(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lost(&self, records: usize) {
        self.records_lost.fetch_add(records as u64, Ordering::Relaxed);
    }

    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_accepted: self.records_accepted.load(Ordering::Relaxed),
            rejected_queue_full: self.rejected_queue_full.load(Ordering::Relaxed),
            rejected_closed: self.rejected_closed.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            batches_size_triggered: self.batches_size.load(Ordering::Relaxed),
            batches_timer_triggered: self.batches_timer.load(Ordering::Relaxed),
            batches_drain_triggered: self.batches_drain.load(Ordering::Relaxed),
            syncs: self.syncs.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
            records_lost: self.records_lost.load(Ordering::Relaxed),
            largest_batch: self.largest_batch.load(Ordering::Relaxed),
        }
    }

    pub fn to_json(&self) -> String {
        // Only plain integers; serialization cannot fail.
        serde_json::to_string(&self.snapshot()).unwrap_or_default()
    }
}

/// A point-in-time copy of every counter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub records_accepted: u64,
    pub rejected_queue_full: u64,
    pub rejected_closed: u64,
    pub records_written: u64,
    pub bytes_written: u64,
    pub batches_size_triggered: u64,
    pub batches_timer_triggered: u64,
    pub batches_drain_triggered: u64,
    pub syncs: u64,
    pub flush_failures: u64,
    pub records_lost: u64,
    pub largest_batch: u64,
}

impl MetricsSnapshot {
    /// Batches flushed by any trigger.
    pub fn batches_flushed(&self) -> u64 {
        self.batches_size_triggered + self.batches_timer_triggered + self.batches_drain_triggered
    }
}
