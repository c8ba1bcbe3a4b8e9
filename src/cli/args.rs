//! CLI argument definitions using clap
//!
//! Commands:
//! - flushline init --config <path>
//! - flushline run --config <path> --output <path>
//! - flushline verify --input <path>

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// flushline - batched durable record writer
#[derive(Parser, Debug)]
#[command(name = "flushline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default configuration file
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./flushline.json")]
        config: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Push records from concurrent producers into an output file
    Run {
        /// Path to configuration file
        #[arg(long, default_value = "./flushline.json")]
        config: PathBuf,

        /// Output file (appended to)
        #[arg(long)]
        output: PathBuf,

        /// Writer to drive
        #[arg(long, value_enum, default_value_t = Mode::Batched)]
        mode: Mode,

        /// Producer threads
        #[arg(long, default_value_t = 4)]
        producers: usize,

        /// Records pushed by each producer
        #[arg(long, default_value_t = 1000)]
        records: usize,

        /// Write payloads without checksummed framing
        #[arg(long)]
        raw: bool,
    },

    /// Check every frame of a checksummed output file
    Verify {
        /// File written by `run`
        #[arg(long)]
        input: PathBuf,
    },
}

/// Which writer `run` drives.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Bounded queue plus batching consumer
    Batched,
    /// Mutex-serialized write and sync per record
    Baseline,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Batched => "batched",
            Mode::Baseline => "baseline",
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
