//! End-to-end integration tests for the conformance runner
//!
//! These tests drive the `mock_debugger` binary through the library and the
//! `conformance` CLI:
//! 1. Fixture sources in `tests/fixtures` carry their scripts in comments
//! 2. Each run spawns (or attaches to) a fresh mock debugger
//! 3. Results, errors and transcripts are checked

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use conformance::common::config::DebuggerTarget;
use conformance::common::ErrorKind;
use conformance::testing::{self, RunOptions, TestCase, SCRIPT_BANNER};
use conformance::Error;
use pretty_assertions::assert_eq;

/// Path to a fixture source
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Shell command running the mock debugger with extra arguments
fn mock_command(args: &str) -> String {
    format!("'{}' {}", env!("CARGO_BIN_EXE_mock_debugger"), args)
}

fn mock_options(args: &str) -> RunOptions {
    let mut options = RunOptions::new(DebuggerTarget::Spawn(mock_command(args)));
    options.expect_timeout = Duration::from_secs(5);
    options
}

/// Test context with a scratch directory and isolated config
struct TestContext {
    temp_dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a test source into the scratch directory
    fn write_source(&self, name: &str, text: &str) -> TestCase {
        let path = self.path().join(name);
        fs::write(&path, text).expect("Failed to write source");
        TestCase::new(path)
    }

    /// Run the CLI with config lookups pointed at the scratch directory
    fn run_cli(&self, args: &[&str]) -> CliOutput {
        let output = Command::new(env!("CARGO_BIN_EXE_conformance"))
            .args(args)
            .env("XDG_CONFIG_HOME", self.path().join("config"))
            .env("HOME", self.path())
            .env("NO_COLOR", "1")
            .output()
            .expect("Failed to run conformance");

        CliOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        }
    }
}

/// Output from a CLI run
#[derive(Debug)]
struct CliOutput {
    stdout: String,
    stderr: String,
    code: Option<i32>,
}

/// Mock debugger listening on TCP, killed on drop
struct ListeningMock {
    child: Child,
    addr: String,
}

impl ListeningMock {
    fn start() -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_mock_debugger"))
            .args(["--listen", "127.0.0.1:0"])
            .stdout(Stdio::piped())
            .spawn()
            .expect("Failed to start mock debugger");

        let stdout = child.stdout.take().expect("mock stdout");
        let mut line = String::new();
        BufReader::new(stdout)
            .read_line(&mut line)
            .expect("Failed to read listen address");
        let addr = line
            .trim()
            .strip_prefix("listening on ")
            .expect("listen banner")
            .to_string();

        Self { child, addr }
    }
}

impl Drop for ListeningMock {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// ============================================================================
// Library runs
// ============================================================================

#[tokio::test]
async fn test_ping_pong() {
    let case = TestCase::new(fixture("ping.rs"));
    let result = testing::run_case(&case, &mock_options("")).await;

    assert!(result.passed, "{:?}\n{}", result.error, result.output.join("\n"));
    assert!(result.output.contains(&"< ping".to_string()));
    assert!(result.output.contains(&"> pong".to_string()));
    assert!(result.output.contains(&"main is on line 1".to_string()));
}

#[tokio::test]
async fn test_breakpoints_fixture() {
    let case = TestCase::new(fixture("breakpoints.rs"));
    let result = testing::run_case(&case, &mock_options("")).await;

    assert!(result.passed, "{:?}\n{}", result.error, result.output.join("\n"));
    assert_eq!(result.output[0], SCRIPT_BANNER);
    assert!(result
        .output
        .contains(&"< 1-break-insert breakpoints.rs:8".to_string()));
    assert!(result
        .output
        .contains(&"checkpoint 'stop at call' passed".to_string()));
}

#[tokio::test]
async fn test_duplicate_tag_fails_before_launch() {
    let ctx = TestContext::new();
    let marker = ctx.path().join("launched");
    let options = RunOptions::new(DebuggerTarget::Spawn(format!(
        "touch '{}'",
        marker.display()
    )));

    let case = TestCase::new(fixture("duplicate_tag.rs"));
    let output = testing::Transcript::new();
    let err = testing::execute(&case, &options, &output).await.unwrap_err();

    match &err {
        Error::DuplicateTag {
            tag, first, second, ..
        } => {
            assert_eq!(tag, "SAME");
            assert_eq!((*first, *second), (2, 3));
        }
        other => panic!("expected duplicate tag error, got {other}"),
    }
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_compile_error_reports_every_problem() {
    let ctx = TestContext::new();
    let case = ctx.write_source(
        "broken.rs",
        "fn main() {} // //@MAIN@\n\n// send(\"ping\")\n// expect(nope);\n// sned(\"x\");\n",
    );

    let result = testing::run_case(&case, &mock_options("")).await;

    assert!(!result.passed);
    assert_eq!(result.error_kind, Some(ErrorKind::Compile));
    let error = result.error.unwrap();
    // Reported at the token after the missing ';'
    assert!(error.contains("4:2: expected ';' after expression"), "{error}");
    // Name checks wait for clean syntax
    assert!(!error.contains("sned"), "{error}");
    assert!(!error.contains("nope"), "{error}");
    assert!(!result.output.iter().any(|l| l.starts_with("< ")));
}

#[tokio::test]
async fn test_expect_times_out_on_silent_debugger() {
    let ctx = TestContext::new();
    let case = ctx.write_source(
        "silent.rs",
        "fn main() {}\n// send(\"1-gdb-version\");\n// expect(\"1^done\", 1);\n",
    );

    let started = Instant::now();
    let result = testing::run_case(&case, &mock_options("--silent")).await;

    assert!(!result.passed);
    assert_eq!(result.error.as_deref(), Some("Expected '1^done' in 1s"));
    assert_eq!(result.error_kind, Some(ErrorKind::Protocol));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_debugger_exiting_early_fails_promptly() {
    let ctx = TestContext::new();
    let case = ctx.write_source("early.rs", "fn main() {}\n// expect(\"1^done\");\n");

    let started = Instant::now();
    let result = testing::run_case(&case, &mock_options("--exit-immediately")).await;

    assert!(!result.passed);
    let error = result.error.unwrap();
    assert!(error.contains("output closed"), "{error}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_attach_over_tcp() {
    let mock = ListeningMock::start();
    let mut options = RunOptions::new(DebuggerTarget::Connect(mock.addr.clone()));
    options.expect_timeout = Duration::from_secs(5);

    let case = TestCase::new(fixture("ping.rs"));
    let result = testing::run_case(&case, &options).await;

    assert!(result.passed, "{:?}\n{}", result.error, result.output.join("\n"));
}

#[tokio::test]
async fn test_run_all_discovered_fixtures() {
    let mut cases = testing::discover(&fixture(""))
        .unwrap()
        .into_iter()
        .filter(|c| c.name != "duplicate_tag")
        .collect::<Vec<_>>();
    cases.sort_by(|a, b| a.name.cmp(&b.name));

    let results = testing::run_all(&cases, &mock_options("")).await;
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();

    assert_eq!(names, vec!["breakpoints", "ping"]);
    assert!(results.iter().all(|r| r.passed));
}

// ============================================================================
// CLI runs
// ============================================================================

#[test]
fn test_cli_run_json() {
    let ctx = TestContext::new();
    let source = fixture("ping.rs");
    let output = ctx.run_cli(&[
        "run",
        source.to_str().unwrap(),
        "--debugger",
        &mock_command(""),
        "--json",
    ]);

    assert_eq!(output.code, Some(0), "stderr: {}", output.stderr);
    let results: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(results[0]["name"], "ping");
    assert_eq!(results[0]["passed"], true);
}

#[test]
fn test_cli_run_failure_exit_code() {
    let ctx = TestContext::new();
    let case = ctx.write_source("fails.rs", "// assert(false, \"nope\");\n");
    let output = ctx.run_cli(&[
        "run",
        case.source.to_str().unwrap(),
        "--debugger",
        &mock_command(""),
    ]);

    assert_eq!(output.code, Some(1));
    assert!(output.stdout.contains("Assertion failed at line 1: nope"));
    assert!(output.stdout.contains("1 failed"));
}

#[test]
fn test_cli_run_without_debugger_is_config_error() {
    let ctx = TestContext::new();
    let source = fixture("ping.rs");
    let output = ctx.run_cli(&["run", source.to_str().unwrap()]);

    assert_eq!(output.code, Some(2));
    assert!(output.stderr.contains("no debugger command configured"));
}

#[test]
fn test_cli_extract_keeps_line_numbers() {
    let ctx = TestContext::new();
    let source = fixture("ping.rs");
    let output = ctx.run_cli(&["extract", source.to_str().unwrap()]);

    assert_eq!(output.code, Some(0), "stderr: {}", output.stderr);
    let lines: Vec<&str> = output.stdout.lines().collect();
    assert_eq!(lines[0], " //@MAIN@");
    assert_eq!(lines[1], "");
    assert_eq!(lines[2], " send(\"ping\");");
}

#[test]
fn test_cli_tags_json() {
    let ctx = TestContext::new();
    let source = fixture("breakpoints.rs");
    let output = ctx.run_cli(&["tags", source.to_str().unwrap(), "--json"]);

    assert_eq!(output.code, Some(0), "stderr: {}", output.stderr);
    let tags: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(tags, serde_json::json!({ "ADD": 4, "CALL": 8 }));
}
