//! Crash scenarios

pub mod flush;
pub mod verify;
