//! Test runner implementation
//!
//! Runs one test source end to end: collect tags, extract and compile the
//! script, start the debugger, run the script, and always shut the debugger
//! down again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use serde::Serialize;

use crate::bridge::ProcessBridge;
use crate::common::config::{Config, DebuggerTarget};
use crate::common::{ErrorKind, Result};
use crate::delta::{CommandDeltaGenerator, DeltaGenerator};
use crate::script::{self, ScriptGlobals};
use crate::source::SourceFile;

use super::case::TestCase;
use super::transcript::Transcript;

/// Opening banner around the logged script
pub const SCRIPT_BANNER: &str = "------ Test script ------";
/// Closing banner around the logged script
pub const SCRIPT_BANNER_END: &str = "-------------------------";

/// How every test in a run reaches its debugger
#[derive(Clone)]
pub struct RunOptions {
    pub target: DebuggerTarget,
    pub expect_timeout: Duration,
    pub close_grace: Duration,
    pub connect_timeout: Duration,
    pub delta: Option<Arc<dyn DeltaGenerator>>,
}

impl RunOptions {
    pub fn new(target: DebuggerTarget) -> Self {
        let defaults = Config::default();
        Self {
            target,
            expect_timeout: defaults.timeouts.expect(),
            close_grace: defaults.timeouts.close_grace(),
            connect_timeout: defaults.timeouts.connect(),
            delta: None,
        }
    }

    /// Options from config; fails if no debugger is configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let delta = CommandDeltaGenerator::from_config(&config.delta)
            .map(|generator| Arc::new(generator) as Arc<dyn DeltaGenerator>);
        Ok(Self {
            target: config.debugger_target()?,
            expect_timeout: config.timeouts.expect(),
            close_grace: config.timeouts.close_grace(),
            connect_timeout: config.timeouts.connect(),
            delta,
        })
    }
}

/// Result of a test run
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub name: String,
    pub source: String,
    pub passed: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Everything the test logged, sent and received
    pub output: Vec<String>,
}

/// Run one test case, writing its transcript to `output`
///
/// Tags are collected and the script compiled before the debugger starts,
/// so a bad source never launches anything. Once started, the debugger is
/// closed whether the script passes or not.
pub async fn execute(case: &TestCase, options: &RunOptions, output: &Transcript) -> Result<()> {
    let source = SourceFile::load(&case.source)?;
    let lines = source.tags()?;
    tracing::debug!("Collected {} line tag(s) from {}", lines.len(), case.source.display());

    let script_text = source.script()?;
    output.write_line(SCRIPT_BANNER);
    output.write_line(script_text.as_str());
    output.write_line(SCRIPT_BANNER_END);

    let compiled = script::compile(script_text.as_str())?;

    let bridge = start_bridge(options, output.clone())
        .await?
        .with_close_grace(options.close_grace);

    let mut globals = ScriptGlobals::new(lines, &case.source, &case.binary, bridge)
        .with_expect_timeout(options.expect_timeout);
    if let Some(delta) = &options.delta {
        globals = globals.with_delta(Arc::clone(delta));
    }

    let result = compiled.run(&mut globals).await;
    globals.close().await;
    result
}

async fn start_bridge(options: &RunOptions, output: Transcript) -> Result<ProcessBridge> {
    match &options.target {
        DebuggerTarget::Spawn(command) => ProcessBridge::spawn(command, output),
        DebuggerTarget::Connect(addr) => {
            ProcessBridge::connect(addr, options.connect_timeout, output).await
        }
    }
}

/// Run one test case and collect its result
pub async fn run_case(case: &TestCase, options: &RunOptions) -> TestResult {
    tracing::info!("Running test {}", case.name);
    let output = Transcript::new();
    let started = Instant::now();

    let result = execute(case, options, &output).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(()) => {
            tracing::info!("Test {} passed in {}ms", case.name, duration_ms);
            TestResult {
                name: case.name.clone(),
                source: case.source.display().to_string(),
                passed: true,
                duration_ms,
                error: None,
                error_kind: None,
                output: output.lines(),
            }
        }
        Err(e) => {
            tracing::warn!("Test {} failed: {}", case.name, e);
            TestResult {
                name: case.name.clone(),
                source: case.source.display().to_string(),
                passed: false,
                duration_ms,
                error: Some(e.to_string()),
                error_kind: Some(e.kind()),
                output: output.lines(),
            }
        }
    }
}

/// Run cases one after another
///
/// Each case gets its own debugger; they never share one.
pub async fn run_all(cases: &[TestCase], options: &RunOptions) -> Vec<TestResult> {
    let mut results = Vec::with_capacity(cases.len());
    for case in cases {
        results.push(run_case(case, options).await);
    }
    results
}

/// Print one result; failing tests also print their transcript
pub fn print_result(result: &TestResult, verbose: bool) {
    if result.passed {
        println!(
            "{} {} {}",
            "✓".green().bold(),
            result.name.white().bold(),
            format!("({}ms)", result.duration_ms).dimmed()
        );
    } else {
        println!(
            "{} {} {}",
            "✗".red().bold(),
            result.name.white().bold(),
            format!("({}ms)", result.duration_ms).dimmed()
        );
        if let Some(error) = &result.error {
            println!("  {}", error.red());
        }
    }

    if verbose || !result.passed {
        for line in &result.output {
            println!("    {}", line.dimmed());
        }
    }
}

/// Print the closing pass/fail counts
pub fn print_summary(results: &[TestResult]) {
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    println!();
    if failed == 0 {
        println!(
            "{} {}",
            "✓".green().bold(),
            format!("{passed} passed").green().bold()
        );
    } else {
        println!(
            "{} {}, {}",
            "✗".red().bold(),
            format!("{failed} failed").red().bold(),
            format!("{passed} passed").green()
        );
    }
}
