//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit code.

use std::fmt;
use std::io;

use crate::frame::FrameError;
use crate::sink::SinkError;
use crate::writer::{ConfigError, FlushError, WriterError};

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file missing or invalid
    ConfigError,
    /// Refused to overwrite an existing file
    AlreadyExists,
    /// Writer could not be started
    StartFailed,
    /// Records were not made durable
    WriteFailed,
    /// Output file failed verification
    Corrupted,
    /// I/O error (files, stdout)
    IoError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "FLUSHLINE_CLI_CONFIG_ERROR",
            Self::AlreadyExists => "FLUSHLINE_CLI_ALREADY_EXISTS",
            Self::StartFailed => "FLUSHLINE_CLI_START_FAILED",
            Self::WriteFailed => "FLUSHLINE_CLI_WRITE_FAILED",
            Self::Corrupted => "FLUSHLINE_CLI_CORRUPTED",
            Self::IoError => "FLUSHLINE_CLI_IO_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::AlreadyExists, msg)
    }

    pub fn start_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::StartFailed, msg)
    }

    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::WriteFailed, msg)
    }

    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::Corrupted, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<WriterError> for CliError {
    fn from(e: WriterError) -> Self {
        match e {
            WriterError::Config(e) => e.into(),
            WriterError::Start(e) => Self::start_failed(e.to_string()),
        }
    }
}

impl From<FlushError> for CliError {
    fn from(e: FlushError) -> Self {
        Self::write_failed(e.to_string())
    }
}

impl From<SinkError> for CliError {
    fn from(e: SinkError) -> Self {
        Self::write_failed(e.to_string())
    }
}

impl From<FrameError> for CliError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Io(e) => Self::io_error(e.to_string()),
            other => Self::corrupted(other.to_string()),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
