//! Batched writer facade
//!
//! Producers call `push` from any thread. The record goes into a bounded
//! queue with a non-blocking send; a full queue is reported to the caller
//! instead of stalling it. `close` is the only call that blocks.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use tokio::runtime;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use super::config::WriterConfig;
use super::consumer::Consumer;
use super::errors::{FlushError, PushError, WriterError};
use super::state::{Shared, WriterState};
use super::Record;
use crate::observability::{Event, MetricsSnapshot};
use crate::sink::Sink;

const CONSUMER_THREAD_NAME: &str = "flushline-consumer";

/// Consumer thread, then the outcome of joining it.
enum Shutdown {
    Running(JoinHandle<Result<(), FlushError>>),
    Done(Result<(), FlushError>),
}

/// Multi-producer, single-consumer batched durable writer.
///
/// Share it between producer threads with an `Arc`. Records pushed
/// successfully before `close` are in the sink, in acceptance order, once
/// `close` returns `Ok`.
pub struct BatchWriter {
    /// `None` once closing has begun
    sender: RwLock<Option<mpsc::Sender<Record>>>,
    /// Joined by the one `close` call that performs the shutdown
    shutdown: Mutex<Shutdown>,
    /// Set once a `close` has finished the shutdown
    close_done: AtomicBool,
    shared: Arc<Shared>,
    config: WriterConfig,
}

impl BatchWriter {
    /// Validates `config`, then starts the consumer thread that owns `sink`.
    pub fn new<S: Sink>(sink: S, config: WriterConfig) -> Result<Self, WriterError> {
        config.validate()?;

        // The consumer only needs timers; sink calls are plain blocking I/O
        // on its own thread.
        let runtime = runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(WriterError::Start)?;

        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let shared = Arc::new(Shared::new());
        let consumer = Consumer::new(sink, rx, &config, Arc::clone(&shared));

        let handle = thread::Builder::new()
            .name(CONSUMER_THREAD_NAME.to_string())
            .spawn(move || runtime.block_on(consumer.run()))
            .map_err(WriterError::Start)?;

        info!(
            event = Event::WriterStart.as_str(),
            queue_capacity = config.queue_capacity,
            max_batch_size = config.max_batch_size,
            flush_interval_ms = config.flush_interval.as_millis() as u64,
            "batch writer opened"
        );

        Ok(Self {
            sender: RwLock::new(Some(tx)),
            shutdown: Mutex::new(Shutdown::Running(handle)),
            close_done: AtomicBool::new(false),
            shared,
            config,
        })
    }

    /// Enqueues one record without blocking.
    ///
    /// Fails with `QueueFull` when `queue_capacity` records are waiting, and
    /// with `Closed` once `close` has begun or the consumer has stopped.
    /// The rejected record is handed back in the error.
    pub fn push(&self, record: impl Into<Record>) -> Result<(), PushError> {
        let record = record.into();
        let sender = self.sender.read().unwrap_or_else(PoisonError::into_inner);

        let Some(tx) = sender.as_ref() else {
            self.shared.metrics.record_rejected_closed();
            return Err(PushError::Closed(record));
        };

        match tx.try_send(record) {
            Ok(()) => {
                self.shared.metrics.record_accepted();
                Ok(())
            }
            Err(TrySendError::Full(record)) => {
                self.shared.metrics.record_rejected_full();
                debug!(
                    event = Event::QueueFull.as_str(),
                    queue_capacity = self.config.queue_capacity,
                    "push rejected"
                );
                Err(PushError::QueueFull(record))
            }
            // The consumer aborted and closed the queue.
            Err(TrySendError::Closed(record)) => {
                self.shared.metrics.record_rejected_closed();
                Err(PushError::Closed(record))
            }
        }
    }

    /// Refuses further pushes, waits until every accepted record has been
    /// flushed and the consumer has exited, then returns the first failure
    /// that cost data, if any.
    ///
    /// Concurrent calls wait for the one doing the shutdown and return the
    /// same outcome. Calls made after a close has completed return `Ok(())`.
    pub fn close(&self) -> Result<(), FlushError> {
        let arrived_after_close = self.close_done.load(Ordering::Acquire);
        let mut shutdown = self.shutdown.lock().unwrap_or_else(PoisonError::into_inner);

        let handle = match mem::replace(&mut *shutdown, Shutdown::Done(Ok(()))) {
            Shutdown::Running(handle) => handle,
            Shutdown::Done(outcome) => {
                let result = if arrived_after_close {
                    Ok(())
                } else {
                    outcome.clone()
                };
                *shutdown = Shutdown::Done(outcome);
                return result;
            }
        };

        info!(
            event = Event::WriterCloseStart.as_str(),
            queued = self.queued(),
            "closing batch writer"
        );

        {
            // Under the write lock no push is in flight, so nothing can be
            // accepted after the sender is gone.
            let mut sender = self.sender.write().unwrap_or_else(PoisonError::into_inner);
            self.shared.begin_closing();
            sender.take();
        }

        let result = handle
            .join()
            .unwrap_or_else(|_| Err(FlushError::consumer_panicked()));
        self.shared.mark_closed();
        *shutdown = Shutdown::Done(result.clone());
        self.close_done.store(true, Ordering::Release);

        let metrics = self.metrics();
        match &result {
            Ok(()) => info!(
                event = Event::WriterCloseComplete.as_str(),
                records_written = metrics.records_written,
                batches = metrics.batches_flushed(),
                metrics = %self.shared.metrics.to_json(),
                "batch writer closed"
            ),
            Err(err) => error!(
                event = Event::WriterCloseComplete.as_str(),
                code = err.code().code(),
                records_lost = metrics.records_lost,
                error = %err,
                "batch writer closed with failure"
            ),
        }

        result
    }

    pub fn state(&self) -> WriterState {
        self.shared.state()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn queue_capacity(&self) -> usize {
        self.config.queue_capacity
    }

    /// Records waiting in the queue. Zero once closing has begun.
    pub fn queued(&self) -> usize {
        let sender = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        sender
            .as_ref()
            .map(|tx| tx.max_capacity() - tx.capacity())
            .unwrap_or(0)
    }
}

impl Drop for BatchWriter {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "batch writer dropped with unflushed records");
        }
    }
}

impl std::fmt::Debug for BatchWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchWriter")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}
