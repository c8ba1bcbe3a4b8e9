//! Batch accumulator / consumer loop
//!
//! One task owns the sink and the in-flight batch. Two wakeup sources feed
//! it through a single `tokio::select!`, so exactly one code path touches the
//! batch at any time:
//!
//! 1. Record arrival: append; flush at once if the batch reached
//!    `max_batch_size` (size trigger).
//! 2. Timer tick every `flush_interval`: top the batch up from the queue
//!    without waiting, then flush if it is non-empty (timer trigger). An
//!    empty tick does nothing.
//!
//! The timer branch is polled first so a steady stream of arrivals cannot
//! push a partial batch past the interval.
//!
//! ```text
//!            record             batch full / tick
//!  WAITING ─────────▶ COLLECTING ─────────────────▶ FLUSHING ──▶ WAITING
//!     │                    │
//!     └────────┬───────────┘ queue closed and empty
//!              ▼
//!          DRAINING ──▶ CLOSED
//! ```
//!
//! A flush writes every record in batch order and then syncs once. A flush
//! that has started always runs to completion; failures are handed to the
//! configured `FailurePolicy`. A retried flush resumes at the first record
//! the sink did not accept, so no record is handed to the sink twice. A
//! failed sync is never retried.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::batch::Batch;
use super::config::{FailurePolicy, WriterConfig};
use super::errors::FlushError;
use super::state::Shared;
use super::Record;
use crate::crash_point::{maybe_crash, points};
use crate::observability::{Event, FlushTrigger};
use crate::sink::{Sink, SinkError, SinkOp};

/// Consumer loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopState {
    /// Nothing buffered
    Waiting,
    /// Batch non-empty, below the size threshold
    Collecting,
    /// Handing a batch to the sink
    Flushing,
    /// Queue closed; flushing what remains
    Draining,
    /// Loop exited
    Closed,
}

/// What the loop does after a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    Continue,
    Stop,
}

pub(crate) struct Consumer<S> {
    sink: S,
    rx: mpsc::Receiver<Record>,
    batch: Batch,
    /// Records of `batch` the sink has accepted in the current flush
    written: usize,
    flush_interval: Duration,
    policy: FailurePolicy,
    shared: Arc<Shared>,
    state: LoopState,
    /// First failure that cost data; returned from `run`
    first_failure: Option<FlushError>,
}

impl<S: Sink> Consumer<S> {
    pub(crate) fn new(
        sink: S,
        rx: mpsc::Receiver<Record>,
        config: &WriterConfig,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            sink,
            rx,
            batch: Batch::new(config.max_batch_size),
            written: 0,
            flush_interval: config.flush_interval,
            policy: config.on_flush_failure,
            shared,
            state: LoopState::Waiting,
            first_failure: None,
        }
    }

    /// Runs until the queue is closed and drained, or a failure stops it.
    ///
    /// Returns the first failure that cost accepted records, if any.
    pub(crate) async fn run(mut self) -> Result<(), FlushError> {
        debug!(
            max_batch_size = self.batch.capacity(),
            flush_interval_ms = self.flush_interval.as_millis() as u64,
            policy = ?self.policy,
            "consumer started"
        );

        let period = self.flush_interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let stopped = loop {
            tokio::select! {
                biased;

                _ = ticker.tick() => {
                    self.fill_from_queue();
                    if !self.batch.is_empty()
                        && self.flush(FlushTrigger::Timer).await == Next::Stop
                    {
                        break true;
                    }
                }

                received = self.rx.recv() => match received {
                    Some(record) => {
                        if self.append(record)
                            && self.flush(FlushTrigger::Size).await == Next::Stop
                        {
                            break true;
                        }
                    }
                    None => break false,
                },
            }
        };

        if !stopped {
            self.drain().await;
        }
        self.close_sink();

        self.state = LoopState::Closed;
        self.shared.mark_closed();

        match self.first_failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Appends one record. Returns true if the batch is now full.
    fn append(&mut self, record: Record) -> bool {
        self.state = LoopState::Collecting;
        self.batch.push(record)
    }

    /// Moves queued records into the batch without waiting, up to its limit.
    fn fill_from_queue(&mut self) {
        while !self.batch.is_full() {
            match self.rx.try_recv() {
                Ok(record) => {
                    self.append(record);
                }
                // Empty, or closed: `recv` reports closure on the next turn.
                Err(_) => break,
            }
        }
    }

    /// Queue closed and empty: flush the residual batch exactly once.
    async fn drain(&mut self) {
        let from = self.state;
        self.state = LoopState::Draining;
        info!(
            event = Event::DrainStart.as_str(),
            from = ?from,
            buffered = self.batch.len(),
            "queue closed, draining"
        );

        if !self.batch.is_empty() {
            // A failure here is already recorded in `first_failure`.
            let _ = self.flush(FlushTrigger::Drain).await;
        }

        info!(
            event = Event::DrainComplete.as_str(),
            records_written = self.shared.metrics.records_written(),
            "drain complete"
        );
    }

    async fn flush(&mut self, trigger: FlushTrigger) -> Next {
        self.state = LoopState::Flushing;
        let max_attempts = self.policy.max_attempts();
        let mut attempts = 0;

        maybe_crash(points::FLUSH_BEFORE_WRITE);
        let result = loop {
            attempts += 1;
            match self.write_batch() {
                Ok(()) => break Ok(()),
                Err(err) => {
                    self.shared.metrics.record_flush_failure();
                    error!(
                        event = Event::FlushFailed.as_str(),
                        trigger = trigger.as_str(),
                        records = self.batch.len(),
                        written = self.written,
                        attempt = attempts,
                        error = %err,
                        "batch flush failed"
                    );

                    // After a failed sync it is unknown which writes reached
                    // storage; syncing again could report them durable.
                    if attempts >= max_attempts || err.op() == SinkOp::Sync {
                        break Err(err);
                    }
                    if let FailurePolicy::Retry { backoff, .. } = self.policy {
                        warn!(
                            event = Event::FlushRetry.as_str(),
                            next_attempt = attempts + 1,
                            max_attempts,
                            resume_at = self.written,
                            backoff_ms = backoff.as_millis() as u64,
                            "retrying batch flush"
                        );
                        time::sleep(backoff).await;
                    }
                }
            }
        };

        let batch_len = self.batch.len();
        let next = match result {
            Ok(()) => {
                self.shared
                    .metrics
                    .record_flush(trigger, batch_len, self.batch.byte_len());
                debug!(
                    event = Event::BatchFlushed.as_str(),
                    trigger = trigger.as_str(),
                    records = batch_len,
                    bytes = self.batch.byte_len(),
                    "batch flushed"
                );
                Next::Continue
            }
            Err(err) if !self.policy.stops_on_failure() => {
                self.report_lost(batch_len);
                self.remember(
                    FlushError::from_sink(err, batch_len, attempts).with_records_lost(batch_len),
                );
                Next::Continue
            }
            Err(err) => {
                let abandoned = self.abandon_queue();
                let lost = batch_len + abandoned;
                self.report_lost(lost);
                error!(
                    event = Event::WriterAborted.as_str(),
                    records_lost = lost,
                    "consumer stopped after unrecoverable flush failure"
                );
                self.remember(
                    FlushError::from_sink(err, batch_len, attempts).with_records_lost(lost),
                );
                Next::Stop
            }
        };

        self.batch.clear();
        self.written = 0;
        self.state = LoopState::Waiting;
        next
    }

    /// Writes the records the sink has not yet accepted, in order, then
    /// syncs once.
    fn write_batch(&mut self) -> Result<(), SinkError> {
        for record in &self.batch.records()[self.written..] {
            self.sink.write(record).map_err(SinkError::write)?;
            self.written += 1;
        }
        maybe_crash(points::FLUSH_BEFORE_SYNC);
        self.sink.sync().map_err(SinkError::sync)?;
        maybe_crash(points::FLUSH_AFTER_SYNC);
        Ok(())
    }

    /// Refuses further pushes and discards what is still queued.
    /// Returns the number of records discarded.
    fn abandon_queue(&mut self) -> usize {
        self.shared.begin_closing();
        self.rx.close();

        let mut abandoned = 0;
        while self.rx.try_recv().is_ok() {
            abandoned += 1;
        }
        abandoned
    }

    fn close_sink(&mut self) {
        if let Err(e) = self.sink.close() {
            let err = SinkError::close(e);
            error!(error = %err, "failed to close sink");
            self.remember(FlushError::from_sink(err, 0, 1));
        }
    }

    fn report_lost(&self, records: usize) {
        if records == 0 {
            return;
        }
        self.shared.metrics.record_lost(records);
        error!(
            event = Event::RecordsLost.as_str(),
            records,
            "accepted records were not made durable"
        );
    }

    fn remember(&mut self, err: FlushError) {
        if self.first_failure.is_none() {
            self.first_failure = Some(err);
        }
    }
}
