//! Logging and tracing configuration
//!
//! Tracing carries runner diagnostics. What a single test saw and sent is
//! kept separately in its [`Transcript`](crate::testing::Transcript).

use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use super::paths;

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
pub fn init_cli(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("conformance=debug,warn")
        } else {
            EnvFilter::new("conformance=info,warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing to a run log file plus stderr
///
/// The file gets everything down to TRACE, including every protocol line.
/// Falls back to [`init_cli`] when the log directory is unavailable.
pub fn init_file(verbose: bool) -> Option<PathBuf> {
    let dir = match paths::ensure_log_dir() {
        Ok(Some(dir)) => dir,
        Ok(None) => {
            init_cli(verbose);
            return None;
        }
        Err(e) => {
            eprintln!("Warning: Could not create log directory: {}", e);
            init_cli(verbose);
            return None;
        }
    };

    let log_file = dir.join("run.log");
    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: Could not open log file: {}", e);
            init_cli(verbose);
            return None;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("conformance=trace,info"));

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let stderr_level = if verbose { "debug" } else { "info" };
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .with_filter(EnvFilter::new(format!("conformance={stderr_level},warn")));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Some(log_file)
}
