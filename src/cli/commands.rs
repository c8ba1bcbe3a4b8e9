//! CLI command implementations
//!
//! `run` is a load driver: P producer threads push R records each through
//! one writer into an output file, then the writer is closed and a summary
//! is printed. With `FLUSHLINE_CRASH_POINT` set, the process aborts inside
//! the flush path instead, leaving the file as a crash would.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::frame::verify_file;
use crate::observability::{init_tracing, MetricsSnapshot};
use crate::sink::{FileSink, Framing, SinkError};
use crate::writer::{BaselineWriter, BatchWriter, FailurePolicy, PushError, WriterConfig};

use super::args::{Cli, Command, Mode};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Jitter bounds for a producer that hit a full queue
const BACKOFF_MIN_MICROS: u64 = 50;
const BACKOFF_MAX_MICROS: u64 = 500;

/// Configuration written by `flushline init`.
pub fn default_config() -> WriterConfig {
    WriterConfig::new(
        1024,
        128,
        Duration::from_millis(10),
        FailurePolicy::retry(3, Duration::from_millis(50)),
    )
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.log_json);
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config, force } => init(&config, force),
        Command::Run {
            config,
            output,
            mode,
            producers,
            records,
            raw,
        } => {
            let config = WriterConfig::load(&config)?;
            let options = RunOptions {
                output,
                mode,
                producers,
                records_per_producer: records,
                framing: if raw { Framing::Raw } else { Framing::Checksummed },
            };
            let summary = run_load(&config, &options)?;
            write_response(serde_json::to_value(&summary)?)
        }
        Command::Verify { input } => verify(&input),
    }
}

/// Write a default configuration file
pub fn init(config_path: &Path, force: bool) -> CliResult<()> {
    if config_path.exists() && !force {
        return Err(CliError::already_exists(format!(
            "{} already exists; pass --force to overwrite",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let config = default_config();
    fs::write(config_path, config.to_json_pretty())?;

    write_response(json!({
        "config": config_path.display().to_string(),
        "settings": config,
    }))
}

/// What `run` drives and where it writes.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output: PathBuf,
    pub mode: Mode,
    pub producers: usize,
    pub records_per_producer: usize,
    pub framing: Framing,
}

/// Printed by `run` once the writer is closed.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Correlates the summary with the run's log lines
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub mode: &'static str,
    pub producers: usize,
    pub records_per_producer: usize,
    pub accepted: u64,
    /// Pushes rejected with a full queue and retried
    pub retries: u64,
    pub elapsed_ms: u64,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Default)]
struct ProducerTally {
    accepted: u64,
    retries: u64,
}

/// Payload of record `seq` from producer `producer`.
pub fn record_payload(producer: usize, seq: usize) -> Vec<u8> {
    format!("p{}-{:06}\n", producer, seq).into_bytes()
}

/// Drives one writer with concurrent producers and closes it.
pub fn run_load(config: &WriterConfig, options: &RunOptions) -> CliResult<RunSummary> {
    let run_id = Uuid::new_v4();
    let _span = info_span!("run", %run_id).entered();
    let sink = FileSink::open(&options.output, options.framing)?;

    info!(
        mode = options.mode.as_str(),
        output = %options.output.display(),
        producers = options.producers,
        records_per_producer = options.records_per_producer,
        "starting load"
    );

    let started_at = Utc::now();
    let started = Instant::now();
    let (tally, metrics) = match options.mode {
        Mode::Batched => run_batched(sink, config, options)?,
        Mode::Baseline => run_baseline(sink, options)?,
    };
    let elapsed = started.elapsed();

    info!(
        accepted = tally.accepted,
        retries = tally.retries,
        elapsed_ms = elapsed.as_millis() as u64,
        "load complete"
    );

    Ok(RunSummary {
        run_id,
        started_at,
        mode: options.mode.as_str(),
        producers: options.producers,
        records_per_producer: options.records_per_producer,
        accepted: tally.accepted,
        retries: tally.retries,
        elapsed_ms: elapsed.as_millis() as u64,
        metrics,
    })
}

fn run_batched(
    sink: FileSink,
    config: &WriterConfig,
    options: &RunOptions,
) -> CliResult<(ProducerTally, MetricsSnapshot)> {
    let writer = BatchWriter::new(sink, config.clone())?;

    let tally = thread::scope(|scope| {
        let handles: Vec<_> = (0..options.producers)
            .map(|producer| {
                let writer = &writer;
                scope.spawn(move || {
                    produce_batched(writer, producer, options.records_per_producer)
                })
            })
            .collect();

        let mut total = ProducerTally::default();
        for handle in handles {
            let tally = handle.join().unwrap_or_default();
            total.accepted += tally.accepted;
            total.retries += tally.retries;
        }
        total
    });

    writer.close()?;
    Ok((tally, writer.metrics()))
}

fn produce_batched(writer: &BatchWriter, producer: usize, records: usize) -> ProducerTally {
    let mut rng = rand::thread_rng();
    let mut tally = ProducerTally::default();

    for seq in 0..records {
        let mut record = record_payload(producer, seq);
        loop {
            match writer.push(record) {
                Ok(()) => {
                    tally.accepted += 1;
                    break;
                }
                Err(PushError::QueueFull(rejected)) => {
                    tally.retries += 1;
                    record = rejected;
                    let micros = rng.gen_range(BACKOFF_MIN_MICROS..BACKOFF_MAX_MICROS);
                    thread::sleep(Duration::from_micros(micros));
                }
                Err(PushError::Closed(_)) => {
                    // The consumer stopped; `close` reports why.
                    warn!(producer, seq, "writer closed, producer stopping");
                    return tally;
                }
            }
        }
    }

    tally
}

fn run_baseline(
    sink: FileSink,
    options: &RunOptions,
) -> CliResult<(ProducerTally, MetricsSnapshot)> {
    let writer = BaselineWriter::new(sink);

    let outcome: Result<u64, SinkError> = thread::scope(|scope| {
        let handles: Vec<_> = (0..options.producers)
            .map(|producer| {
                let writer = &writer;
                scope.spawn(move || -> Result<u64, SinkError> {
                    for seq in 0..options.records_per_producer {
                        writer.push(record_payload(producer, seq))?;
                    }
                    Ok(options.records_per_producer as u64)
                })
            })
            .collect();

        let mut accepted = 0;
        let mut first_error = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(n)) => accepted += n,
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(_) => {}
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(accepted),
        }
    });

    let close = writer.close();
    let accepted = outcome?;
    close?;

    let tally = ProducerTally {
        accepted,
        retries: 0,
    };
    Ok((tally, writer.metrics()))
}

/// Verify a checksummed output file
///
/// A truncated last frame is reported, not rejected: it is what a crash
/// during a write leaves behind. Anything else that does not decode fails.
pub fn verify(input: &Path) -> CliResult<()> {
    match verify_file(input) {
        Ok(report) => {
            if report.torn_tail {
                warn!(
                    input = %input.display(),
                    valid_bytes = report.valid_bytes,
                    "torn tail after last complete frame"
                );
            }
            write_response(serde_json::to_value(&report)?)
        }
        Err(e) => {
            let err = CliError::from(e);
            write_error(err.code_str(), err.message())?;
            Err(err)
        }
    }
}
