//! CLI module for flushline
//!
//! Provides command-line interface for:
//! - init: Write a default configuration file
//! - run: Drive a writer with concurrent producers
//! - verify: Check a checksummed output file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, Mode};
pub use commands::{
    default_config, init, record_payload, run, run_command, run_load, verify, RunOptions,
    RunSummary,
};
pub use errors::{CliError, CliErrorCode, CliResult};
