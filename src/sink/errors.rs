//! Sink error type
//!
//! Wraps the `io::Error` a sink returned together with the operation that
//! produced it, so callers can tell a failed `write` from a failed `sync`.

use std::fmt;
use std::io;

use thiserror::Error;

/// The sink operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOp {
    Write,
    Sync,
    Close,
}

impl SinkOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkOp::Write => "write",
            SinkOp::Sync => "sync",
            SinkOp::Close => "close",
        }
    }
}

impl fmt::Display for SinkOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sink operation failed.
#[derive(Debug, Error)]
#[error("sink {op} failed: {source}")]
pub struct SinkError {
    op: SinkOp,
    #[source]
    source: io::Error,
}

impl SinkError {
    pub fn new(op: SinkOp, source: io::Error) -> Self {
        Self { op, source }
    }

    pub fn write(source: io::Error) -> Self {
        Self::new(SinkOp::Write, source)
    }

    pub fn sync(source: io::Error) -> Self {
        Self::new(SinkOp::Sync, source)
    }

    pub fn close(source: io::Error) -> Self {
        Self::new(SinkOp::Close, source)
    }

    /// The operation that failed.
    pub fn op(&self) -> SinkOp {
        self.op
    }

    /// The underlying I/O error kind.
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }

}

impl Clone for SinkError {
    /// `io::Error` is not `Clone`; the copy keeps its kind and message.
    fn clone(&self) -> Self {
        Self::new(
            self.op,
            io::Error::new(self.source.kind(), self.source.to_string()),
        )
    }
}

/// Error returned by a sink after `close` has been called on it.
pub(crate) fn closed_sink_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "sink is closed")
}
