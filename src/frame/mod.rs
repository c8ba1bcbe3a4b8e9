//! Checksummed record frames
//!
//! A checksummed sink writes every record as one frame:
//!
//! ```text
//! +------------------+------------------+-----------------+
//! | length (u32 LE)  | crc32 (u32 LE)   | payload bytes   |
//! +------------------+------------------+-----------------+
//! ```
//!
//! Frames let a reader tell a record that was cut short by a crash (a torn
//! tail, only ever at the end of the file) from real corruption (a bad
//! checksum or impossible length anywhere before it).

mod checksum;
mod reader;

pub use checksum::{compute_checksum, verify_checksum};
pub use reader::{verify_file, FrameReader, VerifyReport};

use std::io;

use thiserror::Error;

/// Bytes taken by the length and checksum fields.
pub const FRAME_HEADER_LEN: usize = 8;

/// Largest payload a single frame may carry (64 MiB).
pub const MAX_FRAME_PAYLOAD: usize = 64 * 1024 * 1024;

/// Errors raised while decoding frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The file ends part-way through a frame.
    #[error("torn frame at byte offset {offset}: {available} of {expected} bytes present")]
    TornTail {
        offset: u64,
        expected: u64,
        available: u64,
    },

    /// A complete frame failed validation.
    #[error("corrupt frame at byte offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    /// Payload exceeds `MAX_FRAME_PAYLOAD`.
    #[error("payload of {0} bytes exceeds the frame limit")]
    TooLarge(usize),

    #[error("frame I/O failed: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    /// A torn tail is the expected residue of a crash between `write` and
    /// `sync`; everything else means the file cannot be trusted.
    pub fn is_torn_tail(&self) -> bool {
        matches!(self, FrameError::TornTail { .. })
    }
}

/// Encodes `payload` as a single frame.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(FrameError::TooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&compute_checksum(payload).to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}
