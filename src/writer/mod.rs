//! Durable record writers
//!
//! Two writers over the same `Sink` capability:
//!
//! - `BatchWriter`: producers push into a bounded queue and return at once;
//!   one consumer thread groups records into batches and pays one sync per
//!   batch. A crash loses at most the batch in flight plus the queue.
//! - `BaselineWriter`: every push writes and syncs under a mutex. Slow, but a
//!   returned `Ok` means the record is durable.
//!
//! Batched writer guarantees:
//!
//! - Records reach the sink in queue admission order
//! - No synced batch holds more than `max_batch_size` records
//! - With records buffered, a flush happens within one `flush_interval`
//! - An idle writer never writes or syncs
//! - After `close` returns `Ok`, every record accepted before it is durable
//!
//! ```text
//!  producers ──push──▶ [ bounded queue (N) ] ──▶ consumer ──batch (≤ M)──▶ sink
//!                                                   ▲
//!                                             tick every T
//! ```

mod batch;
mod baseline;
mod batched;
mod config;
mod consumer;
mod errors;
mod state;

pub use baseline::BaselineWriter;
pub use batched::BatchWriter;
pub use config::{ConfigError, FailurePolicy, WriterConfig, MAX_FLUSH_INTERVAL};
pub use errors::{FlushError, FlushErrorCode, PushError, Severity, WriterError};
pub use state::WriterState;

/// One opaque payload. Records have no identity beyond their queue position.
pub type Record = Vec<u8>;
