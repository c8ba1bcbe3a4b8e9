//! Crash point injection for durability testing
//!
//! When `FLUSHLINE_CRASH_POINT` names a point reached by the flush path, the
//! process terminates on the spot via `std::process::abort()`: no cleanup,
//! no unwinding, no drain. Tests use it to check that a crash loses at most
//! the batch in flight.
//!
//! ```bash
//! FLUSHLINE_CRASH_POINT=flush_before_sync flushline run --config flushline.json
//! ```

use std::sync::OnceLock;

/// Environment variable naming the active crash point.
pub const CRASH_POINT_ENV: &str = "FLUSHLINE_CRASH_POINT";

static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

#[inline]
fn get_crash_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var(CRASH_POINT_ENV).ok())
        .as_deref()
}

/// Returns true if `FLUSHLINE_CRASH_POINT` equals `name`.
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    get_crash_point().map(|p| p == name).unwrap_or(false)
}

/// Aborts the process if the named crash point is enabled.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        eprintln!("[CRASH] Triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// All defined crash point names
pub mod points {
    /// Batch assembled, nothing written yet
    pub const FLUSH_BEFORE_WRITE: &str = "flush_before_write";
    /// Batch written, not yet synced
    pub const FLUSH_BEFORE_SYNC: &str = "flush_before_sync";
    /// Batch synced
    pub const FLUSH_AFTER_SYNC: &str = "flush_after_sync";

    pub fn all() -> &'static [&'static str] {
        &[FLUSH_BEFORE_WRITE, FLUSH_BEFORE_SYNC, FLUSH_AFTER_SYNC]
    }
}
