//! Crash testing utilities
//!
//! - Temp directories with a writer config
//! - Reading back what a crashed run left behind
//! - Checking the per-producer prefix property

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flushline::frame::{FrameError, FrameReader};
use flushline::writer::{FailurePolicy, WriterConfig};
use tempfile::TempDir;

/// Batch size used by every crash scenario
pub const MAX_BATCH: usize = 8;

/// Scratch directory holding `flushline.json`
pub struct CrashDir {
    dir: TempDir,
}

impl CrashDir {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = WriterConfig::new(
            256,
            MAX_BATCH,
            Duration::from_millis(5),
            FailurePolicy::Abort,
        );
        fs::write(dir.path().join("flushline.json"), config.to_json_pretty())
            .expect("Failed to write config");
        Self { dir }
    }

    pub fn config(&self) -> PathBuf {
        self.dir.path().join("flushline.json")
    }

    pub fn output(&self) -> PathBuf {
        self.dir.path().join("out.log")
    }
}

/// Frames that survived, and whether a torn frame followed them.
#[derive(Debug)]
pub struct Survivors {
    pub records: Vec<Vec<u8>>,
    pub torn_tail: bool,
}

/// Reads every complete frame. Corruption fails the test; a torn tail does
/// not.
pub fn read_survivors(path: &Path) -> Survivors {
    let mut reader = FrameReader::open(path).expect("Failed to open output");
    let mut records = Vec::new();
    loop {
        match reader.read_next() {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {
                return Survivors {
                    records,
                    torn_tail: false,
                }
            }
            Err(e) if e.is_torn_tail() => {
                return Survivors {
                    records,
                    torn_tail: true,
                }
            }
            Err(FrameError::Io(e)) => panic!("I/O error reading output: {}", e),
            Err(e) => panic!("output corrupted after crash: {}", e),
        }
    }
}

/// Parses `p{id}-{seq}\n`.
pub fn parse_record(record: &[u8]) -> (usize, usize) {
    let text = std::str::from_utf8(record).expect("record is not UTF-8");
    let body = text
        .strip_prefix('p')
        .and_then(|s| s.strip_suffix('\n'))
        .unwrap_or_else(|| panic!("malformed record {:?}", text));
    let (p, seq) = body.split_once('-').expect("missing separator");
    (p.parse().unwrap(), seq.parse().unwrap())
}

/// Each producer's surviving records are its first k pushes, in order.
pub fn assert_per_producer_prefix(records: &[Vec<u8>]) {
    let mut next: BTreeMap<usize, usize> = BTreeMap::new();
    for record in records {
        let (p, seq) = parse_record(record);
        let expected = next.entry(p).or_insert(0);
        assert_eq!(seq, *expected, "producer {} has a gap or reordering", p);
        *expected += 1;
    }
}
