//! `flushline verify` against damaged output

use std::fs::{self, OpenOptions};

use crate::crash::harness::{run_clean, verify, Load};
use crate::crash::utils::CrashDir;

const LOAD: Load = Load {
    producers: 1,
    records: 50,
};

fn written() -> CrashDir {
    let dir = CrashDir::new();
    let result = run_clean(&dir.config(), &dir.output(), LOAD);
    assert!(!result.crashed, "run failed: {}", result.stderr);
    dir
}

#[test]
fn test_verify_clean_file() {
    let dir = written();

    let result = verify(&dir.output());

    assert!(!result.crashed, "verify failed: {}", result.stdout);
    let report: serde_json::Value = serde_json::from_str(result.stdout.trim()).unwrap();
    assert_eq!(report["data"]["frames"], 50);
    assert_eq!(report["data"]["torn_tail"], false);
}

/// A truncated last frame is what a crash mid-write leaves: reported, not
/// rejected.
#[test]
fn test_verify_accepts_torn_tail() {
    let dir = written();
    let len = fs::metadata(dir.output()).unwrap().len();
    OpenOptions::new()
        .write(true)
        .open(dir.output())
        .unwrap()
        .set_len(len - 3)
        .unwrap();

    let result = verify(&dir.output());

    assert!(!result.crashed, "verify failed: {}", result.stdout);
    let report: serde_json::Value = serde_json::from_str(result.stdout.trim()).unwrap();
    assert_eq!(report["data"]["frames"], 49);
    assert_eq!(report["data"]["torn_tail"], true);
}

/// A flipped payload byte is corruption and fails verification.
#[test]
fn test_verify_rejects_corruption() {
    let dir = written();
    let mut bytes = fs::read(dir.output()).unwrap();
    // First payload byte, just past the 8-byte header.
    bytes[8] ^= 0xFF;
    fs::write(dir.output(), &bytes).unwrap();

    let result = verify(&dir.output());

    assert!(result.crashed);
    assert!(
        result.stdout.contains("FLUSHLINE_CLI_CORRUPTED"),
        "stdout: {}",
        result.stdout
    );
}
