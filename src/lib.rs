//! Debugger conformance runner
//!
//! Test sources carry their own check scripts in comments and mark lines of
//! interest with `@TAG@` markers. The runner extracts the script, starts the
//! debugger under test and drives it line by line through a process bridge.

pub mod bridge;
pub mod cli;
pub mod commands;
pub mod common;
pub mod delta;
pub mod record;
pub mod script;
pub mod source;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
