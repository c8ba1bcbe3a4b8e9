//! Writer lifecycle state shared between the facade and the consumer

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::observability::WriterMetrics;

/// Lifecycle of a `BatchWriter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Accepting pushes
    Open,
    /// Intake refused, drain in progress
    Closing,
    /// Consumer exited
    Closed,
}

impl WriterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriterState::Open => "OPEN",
            WriterState::Closing => "CLOSING",
            WriterState::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<WriterState>,
    pub(crate) metrics: WriterMetrics,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(WriterState::Open),
            metrics: WriterMetrics::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> WriterState {
        *self.lock()
    }

    /// `Open → Closing`. Any other state is left alone.
    pub(crate) fn begin_closing(&self) {
        let mut state = self.lock();
        if *state == WriterState::Open {
            *state = WriterState::Closing;
        }
    }

    pub(crate) fn mark_closed(&self) {
        *self.lock() = WriterState::Closed;
    }
}
