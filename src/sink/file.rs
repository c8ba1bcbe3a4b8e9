//! File-backed append-only sink
//!
//! - Append-only, single file
//! - Parent directories created on open
//! - `sync` is `File::sync_all`
//! - Never truncated

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{closed_sink_error, Sink};
use crate::frame::encode_frame;

/// How records are laid out in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Payload bytes written verbatim.
    Raw,
    /// Each record written as a length + CRC32 frame (see `crate::frame`).
    #[default]
    Checksummed,
}

/// Append-only file sink.
pub struct FileSink {
    path: PathBuf,
    /// `None` once closed
    file: Option<File>,
    framing: Framing,
    bytes_written: u64,
}

impl FileSink {
    /// Opens or creates `path` for appending.
    ///
    /// # Errors
    ///
    /// Any I/O error from creating the parent directory or opening the file.
    pub fn open(path: impl AsRef<Path>, framing: Framing) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Some(file),
            framing,
            bytes_written: 0,
        })
    }

    /// Returns the path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes appended through this handle, frame headers included.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn file_mut(&mut self) -> io::Result<&mut File> {
        self.file.as_mut().ok_or_else(closed_sink_error)
    }
}

impl Sink for FileSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let written = match self.framing {
            Framing::Raw => {
                self.file_mut()?.write_all(bytes)?;
                bytes.len()
            }
            Framing::Checksummed => {
                let frame = encode_frame(bytes)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
                self.file_mut()?.write_all(&frame)?;
                frame.len()
            }
        };
        self.bytes_written += written as u64;
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file_mut()?.sync_all()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(file) => file.sync_all(),
            None => Ok(()),
        }
    }
}
