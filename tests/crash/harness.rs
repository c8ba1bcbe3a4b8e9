//! Crash test harness for subprocess management
//!
//! Starts the `flushline` binary, optionally with a crash point armed, and
//! captures how it ended.

use std::path::Path;
use std::process::{Command, ExitStatus};

use flushline::crash_point::CRASH_POINT_ENV;
use flushline::observability::LOG_ENV;

/// Result of one subprocess run
#[derive(Debug)]
pub struct CrashTestResult {
    /// Whether the process ended unsuccessfully
    pub crashed: bool,
    /// Exit status if the process could be started
    pub exit_status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
}

/// Shape of the `run` load
#[derive(Debug, Clone, Copy)]
pub struct Load {
    pub producers: usize,
    pub records: usize,
}

fn binary() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_flushline"));
    command.env(LOG_ENV, "warn");
    command
}

fn execute(mut command: Command) -> CrashTestResult {
    match command.output() {
        Ok(output) => CrashTestResult {
            crashed: !output.status.success(),
            exit_status: Some(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        },
        Err(e) => CrashTestResult {
            crashed: true,
            exit_status: None,
            stdout: String::new(),
            stderr: format!("Failed to execute: {}", e),
        },
    }
}

fn run_command(config: &Path, output: &Path, load: Load) -> Command {
    let mut command = binary();
    command
        .arg("run")
        .arg("--config")
        .arg(config)
        .arg("--output")
        .arg(output)
        .arg("--producers")
        .arg(load.producers.to_string())
        .arg("--records")
        .arg(load.records.to_string());
    command
}

/// `flushline run` with `crash_point` armed
pub fn run_with_crash_point(
    crash_point: &str,
    config: &Path,
    output: &Path,
    load: Load,
) -> CrashTestResult {
    let mut command = run_command(config, output, load);
    command.env(CRASH_POINT_ENV, crash_point);
    execute(command)
}

/// `flushline run` with no crash point
pub fn run_clean(config: &Path, output: &Path, load: Load) -> CrashTestResult {
    let mut command = run_command(config, output, load);
    command.env_remove(CRASH_POINT_ENV);
    execute(command)
}

/// `flushline verify`
pub fn verify(input: &Path) -> CrashTestResult {
    let mut command = binary();
    command.arg("verify").arg("--input").arg(input);
    command.env_remove(CRASH_POINT_ENV);
    execute(command)
}

/// Report crash test failure
pub fn report_failure(crash_point: &str, expected: &str, result: &CrashTestResult) {
    eprintln!("=== CRASH TEST FAILURE ===");
    eprintln!("Crash point: {}", crash_point);
    eprintln!("Expected: {}", expected);
    eprintln!("Exit status: {:?}", result.exit_status);
    eprintln!("stdout:\n{}", result.stdout);
    eprintln!("stderr:\n{}", result.stderr);
    eprintln!("==========================");
}
