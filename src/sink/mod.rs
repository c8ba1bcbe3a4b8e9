//! Append-only sinks
//!
//! A sink is the only durable destination a writer knows about. The batched
//! writer hands a sink to its consumer thread and never touches it again
//! from any other thread; the baseline writer guards it with a mutex.

mod errors;
mod file;
mod memory;

pub use errors::{SinkError, SinkOp};
pub use file::{FileSink, Framing};
pub use memory::MemorySink;

pub(crate) use errors::closed_sink_error;

use std::io;

/// Append-only byte destination with explicit durability.
///
/// `write` appends bytes; they are not durable until a later `sync` returns
/// `Ok`. After `close`, further calls may fail.
pub trait Sink: Send + 'static {
    /// Appends one record.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Forces everything written so far to durable storage.
    fn sync(&mut self) -> io::Result<()>;

    /// Releases the destination.
    fn close(&mut self) -> io::Result<()>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}
