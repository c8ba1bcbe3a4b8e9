//! Observability for the writers
//!
//! - Structured logging through `tracing`; every event carries an `event`
//!   field naming an [`Event`]
//! - Lock-free counters in [`WriterMetrics`]
//!
//! Observability is read-only: nothing here changes what a writer does.

mod events;
mod metrics;

pub use events::Event;
pub use metrics::{FlushTrigger, MetricsSnapshot, WriterMetrics};

use tracing_subscriber::EnvFilter;

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "FLUSHLINE_LOG";

/// Installs a global `tracing` subscriber writing to stderr.
///
/// Filter comes from `FLUSHLINE_LOG`, then `RUST_LOG`, then `info`. Calling
/// it again after a subscriber is installed is a no-op.
pub fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr);

    // try_init fails only when a global subscriber already exists.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
