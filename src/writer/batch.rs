//! In-flight batch
//!
//! - Records kept in append order; that is the order they reach the sink
//! - Never holds more than `max_records`
//! - Cleared, not reallocated, after every flush

use super::Record;

/// Records accumulated between two flushes.
#[derive(Debug)]
pub(crate) struct Batch {
    records: Vec<Record>,
    /// Sum of payload lengths
    bytes: usize,
    max_records: usize,
}

impl Batch {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: Vec::with_capacity(max_records),
            bytes: 0,
            max_records,
        }
    }

    /// Appends a record. Returns true if the batch is now full.
    pub fn push(&mut self, record: Record) -> bool {
        debug_assert!(!self.is_full(), "push into a full batch");
        self.bytes += record.len();
        self.records.push(record);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.max_records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Configured record limit.
    pub fn capacity(&self) -> usize {
        self.max_records
    }

    pub fn byte_len(&self) -> usize {
        self.bytes
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.bytes = 0;
    }
}
