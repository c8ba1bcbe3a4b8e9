//! In-memory sink
//!
//! Clones share one buffer, so a test can hand one clone to a writer and
//! inspect the other. Write and sync failures can be injected.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{closed_sink_error, Sink};

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<Vec<u8>>,
    /// Records covered by the last successful sync
    durable: usize,
    /// Records written since the last successful sync
    pending: usize,
    /// Records per successful sync, in order
    batches: Vec<usize>,
    writes: u64,
    syncs: u64,
    closed: bool,
    /// Writes that still succeed before `fail_writes` kicks in
    writes_before_failure: u32,
    fail_writes: u32,
    fail_syncs: u32,
}

/// Shared in-memory sink.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next `n` writes fail.
    pub fn fail_next_writes(&self, n: u32) {
        self.fail_writes_after(0, n);
    }

    /// Lets `ok` more writes succeed, then makes the `n` after them fail.
    pub fn fail_writes_after(&self, ok: u32, n: u32) {
        let mut state = self.state();
        state.writes_before_failure = ok;
        state.fail_writes = n;
    }

    /// Makes the next `n` syncs fail.
    pub fn fail_next_syncs(&self, n: u32) {
        self.state().fail_syncs = n;
    }

    /// Every record written, synced or not, in write order.
    pub fn records(&self) -> Vec<Vec<u8>> {
        self.state().records.clone()
    }

    /// Records covered by a successful sync.
    pub fn durable_records(&self) -> Vec<Vec<u8>> {
        let state = self.state();
        state.records[..state.durable].to_vec()
    }

    /// Number of records written per successful sync.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state().batches.clone()
    }

    /// Successful writes.
    pub fn write_count(&self) -> u64 {
        self.state().writes
    }

    /// Successful syncs.
    pub fn sync_count(&self) -> u64 {
        self.state().syncs
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

impl Sink for MemorySink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state();
        if state.closed {
            return Err(closed_sink_error());
        }
        if state.fail_writes > 0 && state.writes_before_failure > 0 {
            state.writes_before_failure -= 1;
        } else if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }
        state.records.push(bytes.to_vec());
        state.pending += 1;
        state.writes += 1;
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        let mut state = self.state();
        if state.closed {
            return Err(closed_sink_error());
        }
        if state.fail_syncs > 0 {
            state.fail_syncs -= 1;
            return Err(io::Error::new(io::ErrorKind::Other, "injected sync failure"));
        }
        let pending = state.pending;
        state.batches.push(pending);
        state.pending = 0;
        state.durable = state.records.len();
        state.syncs += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.state().closed = true;
        Ok(())
    }
}
