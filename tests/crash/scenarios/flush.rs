//! Flush path crash scenarios
//!
//! The first flush is where every run below dies:
//! - Crash before write → nothing in the file
//! - Crash before sync → at most one batch, intact
//! - Crash after sync → exactly the synced batch

use flushline::crash_point::points;

use crate::crash::harness::{report_failure, run_clean, run_with_crash_point, Load};
use crate::crash::utils::{assert_per_producer_prefix, read_survivors, CrashDir, MAX_BATCH};

const LOAD: Load = Load {
    producers: 2,
    records: 200,
};

/// Runs the load with `point` armed and returns what survived.
fn crash_at(point: &str) -> Vec<Vec<u8>> {
    let dir = CrashDir::new();
    let result = run_with_crash_point(point, &dir.config(), &dir.output(), LOAD);
    if !result.crashed {
        report_failure(point, "process aborted", &result);
        panic!("crash point {} never fired", point);
    }
    assert!(result.stderr.contains(point), "stderr: {}", result.stderr);

    let survivors = read_survivors(&dir.output());
    assert!(!survivors.torn_tail, "single-record writes left a torn frame");
    assert_per_producer_prefix(&survivors.records);
    survivors.records
}

#[test]
fn test_crash_before_write_leaves_nothing() {
    let records = crash_at(points::FLUSH_BEFORE_WRITE);
    assert!(records.is_empty());
}

#[test]
fn test_crash_before_sync_bounded_to_one_batch() {
    let records = crash_at(points::FLUSH_BEFORE_SYNC);
    assert!(!records.is_empty());
    assert!(records.len() <= MAX_BATCH, "{} records survived", records.len());
}

#[test]
fn test_crash_after_sync_keeps_first_batch() {
    let records = crash_at(points::FLUSH_AFTER_SYNC);
    assert!(!records.is_empty());
    assert!(records.len() <= MAX_BATCH, "{} records survived", records.len());
}

/// Without a crash point every record arrives and the summary says so.
#[test]
fn test_clean_run_writes_everything() {
    let dir = CrashDir::new();
    let result = run_clean(&dir.config(), &dir.output(), LOAD);
    if result.crashed {
        report_failure("none", "clean exit", &result);
        panic!("clean run failed");
    }

    let summary: serde_json::Value = serde_json::from_str(result.stdout.trim()).unwrap();
    assert_eq!(summary["status"], "ok");
    assert_eq!(summary["data"]["accepted"], 400);
    assert_eq!(summary["data"]["metrics"]["records_lost"], 0);

    let survivors = read_survivors(&dir.output());
    assert_eq!(survivors.records.len(), LOAD.producers * LOAD.records);
    assert!(!survivors.torn_tail);
    assert_per_producer_prefix(&survivors.records);
}
