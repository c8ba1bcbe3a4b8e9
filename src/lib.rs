//! flushline - batched durable record writer
//!
//! Many producer threads push byte records; one consumer groups them into
//! batches and makes each batch durable with a single sync. A crash loses
//! at most the batch in flight, and a graceful `close` loses nothing.
//!
//! ```no_run
//! use std::time::Duration;
//! use flushline::sink::{FileSink, Framing};
//! use flushline::writer::{BatchWriter, FailurePolicy, WriterConfig};
//!
//! let sink = FileSink::open("records.log", Framing::Checksummed)?;
//! let config = WriterConfig::new(1024, 100, Duration::from_millis(10), FailurePolicy::Abort);
//! let writer = BatchWriter::new(sink, config)?;
//!
//! writer.push(b"hello".to_vec())?;
//! writer.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod crash_point;
pub mod frame;
pub mod observability;
pub mod sink;
pub mod writer;

pub use sink::{FileSink, Framing, MemorySink, Sink, SinkError};
pub use writer::{
    BaselineWriter, BatchWriter, FailurePolicy, FlushError, PushError, Record, WriterConfig,
    WriterError, WriterState,
};
