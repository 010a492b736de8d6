//! CLI command handling
//!
//! Dispatches CLI commands and formats their output.

use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::script;
use crate::source::SourceFile;
use crate::testing::{self, RunOptions, TestCase};

/// Dispatch a CLI command
///
/// Returns `false` when tests ran and at least one failed.
pub async fn dispatch(command: Commands, verbose: bool) -> Result<bool> {
    match command {
        Commands::Run {
            path,
            debugger,
            connect,
            binary,
            timeout,
            config,
            json,
        } => {
            let config = match &config {
                Some(path) => Config::load_from(path)?,
                None => Config::load()?,
            };
            let mut options = RunOptions::from_config(&apply_overrides(config, debugger, connect))?;
            if let Some(secs) = timeout {
                options.expect_timeout = Duration::from_secs(secs);
            }

            let cases = collect_cases(&path, binary)?;
            if cases.is_empty() {
                return Err(Error::Config(format!(
                    "no test sources found in '{}'",
                    path.display()
                )));
            }

            if !json {
                println!(
                    "\n{} {} test(s)",
                    "Running".blue().bold(),
                    cases.len().to_string().white().bold()
                );
            }

            let mut results = Vec::with_capacity(cases.len());
            for case in &cases {
                let result = testing::run_case(case, &options).await;
                if !json {
                    testing::print_result(&result, verbose);
                }
                results.push(result);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                testing::print_summary(&results);
            }

            Ok(results.iter().all(|r| r.passed))
        }

        Commands::Extract { path } => {
            let source = SourceFile::load(&path)?;
            let script = source.script()?;
            print!("{script}");
            if !script.as_str().ends_with('\n') {
                println!();
            }

            // Also report compile errors
            if let Err(e) = script::compile(script.as_str()) {
                eprintln!("{}", e.to_string().red());
                return Ok(false);
            }
            Ok(true)
        }

        Commands::Tags { path, json } => {
            let source = SourceFile::load(&path)?;
            let tags = source.tags()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&tags)?);
            } else if tags.is_empty() {
                println!("No line tags in {}", path.display());
            } else {
                for (tag, line) in tags.iter() {
                    println!("  {:>5}  {}", line.to_string().dimmed(), tag);
                }
            }
            Ok(true)
        }
    }
}

/// Flags win over the config file
fn apply_overrides(mut config: Config, debugger: Option<String>, connect: Option<String>) -> Config {
    if let Some(command) = debugger {
        config.debugger.command = Some(command);
        config.debugger.connect = None;
    }
    if connect.is_some() {
        config.debugger.connect = connect;
    }
    config
}

fn collect_cases(path: &Path, binary: Option<PathBuf>) -> Result<Vec<TestCase>> {
    if path.is_dir() {
        if binary.is_some() {
            return Err(Error::Config(
                "--binary can only be used with a single test source".to_string(),
            ));
        }
        return testing::discover(path);
    }

    let case = TestCase::new(path);
    Ok(vec![match binary {
        Some(binary) => case.with_binary(binary),
        None => case,
    }])
}
