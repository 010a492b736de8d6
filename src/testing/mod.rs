//! Conformance test harness
//!
//! Finds test sources, runs each against a fresh debugger and reports the
//! outcome together with the test's transcript.

pub mod case;
mod runner;
mod transcript;

pub use case::{discover, TestCase};
pub use runner::{
    execute, print_result, print_summary, run_all, run_case, RunOptions, TestResult,
    SCRIPT_BANNER, SCRIPT_BANNER_END,
};
pub use transcript::Transcript;
