//! Sink failure handling tests
//!
//! A failed flush is never swallowed: it is counted, logged, applied to the
//! configured policy and returned from close.

use std::io;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use flushline::sink::{MemorySink, Sink, SinkOp};
use flushline::writer::{
    BatchWriter, FailurePolicy, FlushErrorCode, PushError, WriterConfig, WriterState,
};

// =============================================================================
// Test Utilities
// =============================================================================

const LONG: Duration = Duration::from_secs(3600);

fn writer(sink: impl Sink, max_batch_size: usize, policy: FailurePolicy) -> BatchWriter {
    BatchWriter::new(sink, WriterConfig::new(16, max_batch_size, LONG, policy)).unwrap()
}

fn rec(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

/// Sink whose close always fails.
struct CloseFails(MemorySink);

impl Sink for CloseFails {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.0.write(bytes)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.0.sync()
    }

    fn close(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "close refused"))
    }
}

/// Sink that panics on its first write.
struct Panics;

impl Sink for Panics {
    fn write(&mut self, _bytes: &[u8]) -> io::Result<()> {
        panic!("sink exploded");
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink whose first write blocks until released and then fails.
struct GatedFailure {
    entered: mpsc::Sender<()>,
    release: mpsc::Receiver<()>,
    tripped: bool,
    inner: MemorySink,
}

impl Sink for GatedFailure {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        if !self.tripped {
            self.tripped = true;
            let _ = self.entered.send(());
            let _ = self.release.recv();
            return Err(io::Error::new(io::ErrorKind::Other, "write refused"));
        }
        self.inner.write(bytes)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.inner.sync()
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }
}

// =============================================================================
// Continue
// =============================================================================

/// The failed batch is lost and reported; later batches still land.
#[test]
fn test_continue_keeps_serving_after_failure() {
    let sink = MemorySink::new();
    sink.fail_next_writes(1);
    let writer = writer(sink.clone(), 2, FailurePolicy::Continue);

    for r in ["lost-1", "lost-2", "kept-1", "kept-2"] {
        writer.push(rec(r)).unwrap();
    }
    let err = writer.close().unwrap_err();

    assert_eq!(err.code(), FlushErrorCode::SinkWriteFailed);
    assert_eq!(err.batch_len(), 2);
    assert_eq!(err.records_lost(), 2);
    assert!(!err.is_fatal());
    assert_eq!(err.sink_error().map(|e| e.op()), Some(SinkOp::Write));

    assert_eq!(sink.durable_records(), vec![rec("kept-1"), rec("kept-2")]);

    let metrics = writer.metrics();
    assert_eq!(metrics.flush_failures, 1);
    assert_eq!(metrics.records_lost, 2);
    assert_eq!(metrics.records_written, 2);
}

// =============================================================================
// Abort
// =============================================================================

/// After an aborting failure pushes are refused and close reports it.
#[test]
fn test_abort_refuses_further_pushes() {
    let sink = MemorySink::new();
    sink.fail_next_syncs(1);
    let writer = writer(sink.clone(), 1, FailurePolicy::Abort);

    writer.push(rec("doomed")).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let refused = loop {
        match writer.push(rec("late")) {
            Err(PushError::Closed(_)) => break true,
            _ if Instant::now() > deadline => break false,
            _ => thread::sleep(Duration::from_millis(1)),
        }
    };
    assert!(refused, "writer kept accepting after abort");
    assert_ne!(writer.state(), WriterState::Open);

    let err = writer.close().unwrap_err();
    assert_eq!(err.code(), FlushErrorCode::SinkSyncFailed);
    assert!(err.is_fatal());
    assert!(err.records_lost() >= 1);

    assert_eq!(writer.state(), WriterState::Closed);
    assert!(sink.is_closed());
    assert!(sink.durable_records().is_empty());
}

// =============================================================================
// Retry
// =============================================================================

/// Transient write failures are retried until the batch is durable.
#[test]
fn test_retry_recovers_from_transient_failure() {
    let sink = MemorySink::new();
    sink.fail_next_writes(2);
    let writer = writer(
        sink.clone(),
        1,
        FailurePolicy::retry(3, Duration::from_millis(1)),
    );

    writer.push(rec("persistent")).unwrap();
    writer.close().unwrap();

    assert_eq!(sink.records(), vec![rec("persistent")]);
    assert_eq!(sink.durable_records(), vec![rec("persistent")]);
    assert_eq!(sink.batch_sizes(), vec![1]);

    let metrics = writer.metrics();
    assert_eq!(metrics.flush_failures, 2);
    assert_eq!(metrics.records_lost, 0);
    assert_eq!(metrics.records_written, 1);
}

/// A write failing partway through a batch resumes at that record: the
/// records before it are not written again.
#[test]
fn test_retry_after_partial_write_writes_each_record_once() {
    let sink = MemorySink::new();
    sink.fail_writes_after(1, 1);
    let writer = writer(
        sink.clone(),
        3,
        FailurePolicy::retry(3, Duration::from_millis(1)),
    );

    let records = vec![rec("a"), rec("b"), rec("c"), rec("d")];
    for record in &records {
        writer.push(record.clone()).unwrap();
    }
    writer.close().unwrap();

    assert_eq!(sink.records(), records);
    assert_eq!(sink.durable_records(), records);
    assert!(sink.batch_sizes().iter().all(|&n| n >= 1 && n <= 3));
    assert_eq!(sink.batch_sizes().iter().sum::<usize>(), 4);
    assert_eq!(writer.metrics().records_written, 4);
}

/// A failed sync is not retried; the batch is reported lost and nothing is
/// written twice.
#[test]
fn test_retry_aborts_on_sync_failure() {
    let sink = MemorySink::new();
    sink.fail_next_syncs(1);
    let writer = writer(
        sink.clone(),
        2,
        FailurePolicy::retry(3, Duration::from_millis(1)),
    );

    writer.push(rec("a")).unwrap();
    writer.push(rec("b")).unwrap();
    let err = writer.close().unwrap_err();

    assert_eq!(err.code(), FlushErrorCode::SinkSyncFailed);
    assert_eq!(err.attempts(), 1);
    assert_eq!(err.records_lost(), 2);
    assert_eq!(sink.records(), vec![rec("a"), rec("b")]);
    assert!(sink.durable_records().is_empty());
    assert!(sink.batch_sizes().is_empty());
}

/// When attempts run out the writer aborts.
#[test]
fn test_retry_exhaustion_aborts() {
    let sink = MemorySink::new();
    sink.fail_next_writes(10);
    let writer = writer(
        sink.clone(),
        1,
        FailurePolicy::retry(2, Duration::from_millis(1)),
    );

    writer.push(rec("never")).unwrap();
    let err = writer.close().unwrap_err();

    assert_eq!(err.code(), FlushErrorCode::SinkWriteFailed);
    assert_eq!(err.attempts(), 2);
    assert_eq!(writer.metrics().flush_failures, 2);
    assert!(sink.records().is_empty());
}

// =============================================================================
// Close-Time Failures
// =============================================================================

/// A sink that cannot be closed is reported by close.
#[test]
fn test_sink_close_failure_returned() {
    let inner = MemorySink::new();
    let writer = writer(CloseFails(inner.clone()), 4, FailurePolicy::Abort);

    writer.push(rec("a")).unwrap();
    let err = writer.close().unwrap_err();

    assert_eq!(err.code(), FlushErrorCode::SinkCloseFailed);
    assert_eq!(inner.durable_records(), vec![rec("a")]);
}

/// Every caller blocked in close while the shutdown runs gets its failure;
/// a close after that returns `Ok`.
#[test]
fn test_concurrent_closers_all_see_failure() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let sink = GatedFailure {
        entered: entered_tx,
        release: release_rx,
        tripped: false,
        inner: MemorySink::new(),
    };
    let writer = Arc::new(writer(sink, 1, FailurePolicy::Continue));

    writer.push(rec("lost")).unwrap();
    entered_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("flush never reached the sink");

    let closers: Vec<_> = (0..3)
        .map(|_| {
            let writer = Arc::clone(&writer);
            thread::spawn(move || writer.close())
        })
        .collect();

    let deadline = Instant::now() + Duration::from_secs(5);
    while writer.state() == WriterState::Open && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    // Give the other closers time to queue behind the first.
    thread::sleep(Duration::from_millis(200));
    release_tx.send(()).unwrap();

    for closer in closers {
        let err = closer.join().unwrap().unwrap_err();
        assert_eq!(err.code(), FlushErrorCode::SinkWriteFailed);
        assert_eq!(err.records_lost(), 1);
    }
    writer.close().unwrap();
    assert_eq!(writer.metrics().records_lost, 1);
}

/// A panicking consumer surfaces as a fatal error, not a hang.
#[test]
fn test_consumer_panic_reported() {
    let writer = writer(Panics, 1, FailurePolicy::Abort);

    writer.push(rec("boom")).unwrap();
    let err = writer.close().unwrap_err();

    assert_eq!(err.code(), FlushErrorCode::ConsumerPanicked);
    assert!(err.is_fatal());
    assert_eq!(writer.state(), WriterState::Closed);
}
