//! Sequential frame reader
//!
//! Reads frames strictly in file order. A checksum mismatch or an impossible
//! length stops the read with `FrameError::Corruption`; a file that simply
//! ends inside a frame stops it with `FrameError::TornTail`.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use serde::Serialize;

use super::checksum::verify_checksum;
use super::{FrameError, FRAME_HEADER_LEN, MAX_FRAME_PAYLOAD};

/// Reads frames written by a checksummed `FileSink`.
pub struct FrameReader<R> {
    reader: R,
    /// Byte offset of the next frame
    offset: u64,
}

impl FrameReader<BufReader<File>> {
    /// Opens a framed file for reading.
    pub fn open(path: &Path) -> Result<Self, FrameError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, offset: 0 }
    }

    /// Byte offset of the first frame not yet read.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the next payload.
    ///
    /// Returns `Ok(None)` when the input ends exactly on a frame boundary.
    pub fn read_next(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        let mut header = [0u8; FRAME_HEADER_LEN];
        let got = read_up_to(&mut self.reader, &mut header)?;
        if got == 0 {
            return Ok(None);
        }
        if got < FRAME_HEADER_LEN {
            return Err(FrameError::TornTail {
                offset: self.offset,
                expected: FRAME_HEADER_LEN as u64,
                available: got as u64,
            });
        }

        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let checksum = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length > MAX_FRAME_PAYLOAD {
            return Err(FrameError::Corruption {
                offset: self.offset,
                reason: format!("frame length {} exceeds limit {}", length, MAX_FRAME_PAYLOAD),
            });
        }

        let mut payload = vec![0u8; length];
        let got = read_up_to(&mut self.reader, &mut payload)?;
        if got < length {
            return Err(FrameError::TornTail {
                offset: self.offset,
                expected: (FRAME_HEADER_LEN + length) as u64,
                available: (FRAME_HEADER_LEN + got) as u64,
            });
        }

        if !verify_checksum(&payload, checksum) {
            return Err(FrameError::Corruption {
                offset: self.offset,
                reason: "checksum mismatch".to_string(),
            });
        }

        self.offset += (FRAME_HEADER_LEN + length) as u64;
        Ok(Some(payload))
    }

    /// Reads every remaining payload. Any error, torn tails included, is
    /// returned as-is.
    pub fn read_all(&mut self) -> Result<Vec<Vec<u8>>, FrameError> {
        let mut payloads = Vec::new();
        while let Some(payload) = self.read_next()? {
            payloads.push(payload);
        }
        Ok(payloads)
    }
}

/// Reads into `buf` until it is full or the input ends.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Outcome of scanning a framed file end to end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// Complete, checksum-valid frames
    pub frames: u64,
    /// Bytes covered by those frames
    pub valid_bytes: u64,
    /// Whether the file ends inside a frame
    pub torn_tail: bool,
}

/// Scans a framed file, tolerating a torn final frame.
///
/// # Errors
///
/// `FrameError::Corruption` if any complete frame fails validation.
pub fn verify_file(path: &Path) -> Result<VerifyReport, FrameError> {
    let mut reader = FrameReader::open(path)?;
    let mut frames = 0u64;

    loop {
        match reader.read_next() {
            Ok(Some(_)) => frames += 1,
            Ok(None) => {
                return Ok(VerifyReport {
                    frames,
                    valid_bytes: reader.offset(),
                    torn_tail: false,
                })
            }
            Err(e) if e.is_torn_tail() => {
                return Ok(VerifyReport {
                    frames,
                    valid_bytes: reader.offset(),
                    torn_tail: true,
                })
            }
            Err(e) => return Err(e),
        }
    }
}
