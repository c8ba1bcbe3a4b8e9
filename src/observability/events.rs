//! Observable writer events
//!
//! Every `tracing` event emitted by the writers carries an `event` field set
//! to one of these names, so log consumers can filter on a stable string
//! instead of the human-readable message.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Consumer thread started
    WriterStart,
    /// `close` began refusing intake
    WriterCloseStart,
    /// `close` returned
    WriterCloseComplete,
    /// Consumer stopped after an unrecoverable flush failure
    WriterAborted,

    // Consumer loop
    /// A batch was written and synced
    BatchFlushed,
    /// A flush attempt failed
    FlushFailed,
    /// A failed flush is being re-issued
    FlushRetry,
    /// Accepted records will never reach the sink
    RecordsLost,
    /// Queue closed; flushing what remains
    DrainStart,
    /// Drain finished; consumer exiting
    DrainComplete,

    // Producers
    /// A push hit a full queue
    QueueFull,

    // Baseline writer
    /// A synchronous write failed
    BaselineWriteFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::WriterStart => "WRITER_START",
            Event::WriterCloseStart => "WRITER_CLOSE_BEGIN",
            Event::WriterCloseComplete => "WRITER_CLOSE_COMPLETE",
            Event::WriterAborted => "WRITER_ABORTED",

            Event::BatchFlushed => "BATCH_FLUSHED",
            Event::FlushFailed => "FLUSH_FAILED",
            Event::FlushRetry => "FLUSH_RETRY",
            Event::RecordsLost => "RECORDS_LOST",
            Event::DrainStart => "DRAIN_BEGIN",
            Event::DrainComplete => "DRAIN_COMPLETE",

            Event::QueueFull => "QUEUE_FULL",

            Event::BaselineWriteFailed => "BASELINE_WRITE_FAILED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
