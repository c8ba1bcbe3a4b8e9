//! Crash testing framework for flushline
//!
//! - Subprocess management with crash injection
//! - Post-crash inspection of the output file

pub mod harness;
pub mod scenarios;
pub mod utils;

pub use harness::*;
pub use utils::*;
