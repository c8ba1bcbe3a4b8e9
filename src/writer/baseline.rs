//! Baseline writer
//!
//! One mutex around the sink. Each push writes and syncs its record before
//! the lock is released, so a returned `Ok` means the record is durable.
//! Callers wait on contention; nobody is ever rejected.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{error, info};

use crate::observability::{Event, MetricsSnapshot, WriterMetrics};
use crate::sink::{closed_sink_error, Sink, SinkError};

struct Guarded<S> {
    sink: S,
    closed: bool,
}

/// Mutex-serialized synchronous writer.
pub struct BaselineWriter<S: Sink> {
    inner: Mutex<Guarded<S>>,
    metrics: WriterMetrics,
}

impl<S: Sink> BaselineWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            inner: Mutex::new(Guarded {
                sink,
                closed: false,
            }),
            metrics: WriterMetrics::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Guarded<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes and syncs one record while holding the lock.
    pub fn push(&self, record: impl AsRef<[u8]>) -> Result<(), SinkError> {
        let record = record.as_ref();
        let mut guard = self.lock();

        if guard.closed {
            self.metrics.record_rejected_closed();
            return Err(SinkError::write(closed_sink_error()));
        }

        match write_synced(&mut guard.sink, record) {
            Ok(()) => {
                self.metrics.record_direct_write(record.len());
                Ok(())
            }
            Err(err) => {
                self.metrics.record_flush_failure();
                error!(
                    event = Event::BaselineWriteFailed.as_str(),
                    bytes = record.len(),
                    error = %err,
                    "baseline write failed"
                );
                Err(err)
            }
        }
    }

    /// Closes the sink. Later calls return `Ok(())`.
    pub fn close(&self) -> Result<(), SinkError> {
        let mut guard = self.lock();
        if guard.closed {
            return Ok(());
        }
        guard.closed = true;

        guard.sink.close().map_err(SinkError::close)?;
        info!(
            event = Event::WriterCloseComplete.as_str(),
            records_written = self.metrics.records_written(),
            "baseline writer closed"
        );
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Hands the sink back without closing it.
    pub fn into_sink(self) -> S {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .sink
    }
}

fn write_synced<S: Sink>(sink: &mut S, record: &[u8]) -> Result<(), SinkError> {
    sink.write(record).map_err(SinkError::write)?;
    sink.sync().map_err(SinkError::sync)
}
