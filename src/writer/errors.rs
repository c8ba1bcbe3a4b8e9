//! Writer error types
//!
//! Error codes:
//! - FLUSHLINE_SINK_WRITE_FAILED (ERROR severity)
//! - FLUSHLINE_SINK_SYNC_FAILED (FATAL severity)
//! - FLUSHLINE_SINK_CLOSE_FAILED (ERROR severity)
//! - FLUSHLINE_CONSUMER_PANICKED (FATAL severity)
//!
//! A failed sync is fatal: once the OS has reported a sync error, it is not
//! known which written bytes reached storage.

use std::fmt;
use std::io;

use thiserror::Error;

use super::config::ConfigError;
use super::Record;
use crate::sink::{SinkError, SinkOp};

/// Severity levels for flush errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The batch is lost; the sink may still be usable
    Error,
    /// Durability of earlier writes is unknown
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushErrorCode {
    SinkWriteFailed,
    SinkSyncFailed,
    SinkCloseFailed,
    ConsumerPanicked,
}

impl FlushErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            FlushErrorCode::SinkWriteFailed => "FLUSHLINE_SINK_WRITE_FAILED",
            FlushErrorCode::SinkSyncFailed => "FLUSHLINE_SINK_SYNC_FAILED",
            FlushErrorCode::SinkCloseFailed => "FLUSHLINE_SINK_CLOSE_FAILED",
            FlushErrorCode::ConsumerPanicked => "FLUSHLINE_CONSUMER_PANICKED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            FlushErrorCode::SinkWriteFailed => Severity::Error,
            FlushErrorCode::SinkSyncFailed => Severity::Fatal,
            FlushErrorCode::SinkCloseFailed => Severity::Error,
            FlushErrorCode::ConsumerPanicked => Severity::Fatal,
        }
    }

    fn from_op(op: SinkOp) -> Self {
        match op {
            SinkOp::Write => FlushErrorCode::SinkWriteFailed,
            SinkOp::Sync => FlushErrorCode::SinkSyncFailed,
            SinkOp::Close => FlushErrorCode::SinkCloseFailed,
        }
    }
}

impl fmt::Display for FlushErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A batch, or the writer's shutdown, did not reach durable storage.
///
/// Returned by `BatchWriter::close`.
#[derive(Debug, Clone)]
pub struct FlushError {
    code: FlushErrorCode,
    /// Records in the batch being flushed (0 for close failures)
    batch_len: usize,
    /// Flush attempts made for that batch
    attempts: u32,
    /// Accepted records that will never reach the sink
    records_lost: usize,
    source: Option<SinkError>,
}

impl FlushError {
    /// Wraps a sink failure hit while flushing a batch of `batch_len` records.
    pub fn from_sink(source: SinkError, batch_len: usize, attempts: u32) -> Self {
        Self {
            code: FlushErrorCode::from_op(source.op()),
            batch_len,
            attempts,
            records_lost: 0,
            source: Some(source),
        }
    }

    /// The consumer thread panicked; nothing is known about unflushed records.
    pub fn consumer_panicked() -> Self {
        Self {
            code: FlushErrorCode::ConsumerPanicked,
            batch_len: 0,
            attempts: 0,
            records_lost: 0,
            source: None,
        }
    }

    pub fn with_records_lost(mut self, records_lost: usize) -> Self {
        self.records_lost = records_lost;
        self
    }

    pub fn code(&self) -> FlushErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    pub fn batch_len(&self) -> usize {
        self.batch_len
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn records_lost(&self) -> usize {
        self.records_lost
    }

    pub fn sink_error(&self) -> Option<&SinkError> {
        self.source.as_ref()
    }
}

impl fmt::Display for FlushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity(), self.code)?;
        if self.batch_len > 0 {
            write!(
                f,
                ": batch of {} record(s) after {} attempt(s)",
                self.batch_len, self.attempts
            )?;
        }
        if self.records_lost > 0 {
            write!(f, ", {} record(s) lost", self.records_lost)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " ({})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for FlushError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// A record was not accepted. The record is handed back.
#[derive(Debug, Error)]
pub enum PushError {
    /// The queue holds `queue_capacity` records; retry or drop is up to the caller.
    #[error("queue is full, backpressure applied")]
    QueueFull(Record),

    /// The writer is closing, closed, or its consumer stopped.
    #[error("writer is closed")]
    Closed(Record),
}

impl PushError {
    pub fn is_queue_full(&self) -> bool {
        matches!(self, PushError::QueueFull(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, PushError::Closed(_))
    }

    pub fn record(&self) -> &[u8] {
        match self {
            PushError::QueueFull(record) | PushError::Closed(record) => record,
        }
    }

    pub fn into_record(self) -> Record {
        match self {
            PushError::QueueFull(record) | PushError::Closed(record) => record,
        }
    }
}

/// A writer could not be constructed.
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("invalid writer config: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to start consumer: {0}")]
    Start(#[source] io::Error),
}
