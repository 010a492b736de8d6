//! Error types for the conformance runner
//!
//! Every failure a test can hit is one variant here. Messages are written to
//! be read in a test log: they name the file, marker, prefix or line that
//! went wrong.

use std::io;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::script::Diagnostic;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the conformance runner
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Tag '{tag}' presented more than once in file '{path}' (lines {first} and {second})")]
    DuplicateTag {
        tag: String,
        path: String,
        first: usize,
        second: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Source Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("{path}:{line}: {message}")]
    SourceParse {
        path: String,
        line: usize,
        message: String,
    },

    // === Script Errors ===
    #[error("Script failed to compile:\n{}", format_diagnostics(.0))]
    ScriptCompile(Vec<Diagnostic>),

    #[error("Script error at line {line}: {message}")]
    ScriptRuntime { line: usize, message: String },

    #[error("Assertion failed at line {line}: {message}")]
    Assertion { line: usize, message: String },

    // === Protocol Errors ===
    #[error("Expected '{prefix}' in {timeout:?}")]
    ExpectTimeout { prefix: String, timeout: Duration },

    #[error("Expected '{prefix}' but debugger output closed after {elapsed:?}")]
    StreamClosed { prefix: String, elapsed: Duration },

    #[error("Failed to parse protocol record '{line}': {reason}")]
    RecordParse { line: String, reason: String },

    // === Process Errors ===
    #[error("Unable to run process '{command}': {reason}")]
    ProcessStart { command: String, reason: String },

    #[error("Debugger input is closed")]
    InputClosed,

    // === Delta Errors ===
    #[error("Failed to generate delta for '{target}': {reason}")]
    DeltaFailed { target: String, reason: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse failure classes used when reporting a test result
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Compile,
    Protocol,
    Assertion,
    Internal,
}

impl Error {
    /// Create a duplicate tag error
    pub fn duplicate_tag(tag: &str, path: &Path, first: usize, second: usize) -> Self {
        Self::DuplicateTag {
            tag: tag.to_string(),
            path: path.display().to_string(),
            first,
            second,
        }
    }

    /// Create a file read error
    pub fn file_read(path: &Path, error: io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create a source parse error
    pub fn source_parse(path: &Path, line: usize, message: impl Into<String>) -> Self {
        Self::SourceParse {
            path: path.display().to_string(),
            line,
            message: message.into(),
        }
    }

    /// Create a script runtime error
    pub fn runtime(line: usize, message: impl Into<String>) -> Self {
        Self::ScriptRuntime {
            line,
            message: message.into(),
        }
    }

    /// Create an assertion failure
    pub fn assertion(line: usize, message: impl Into<String>) -> Self {
        Self::Assertion {
            line,
            message: message.into(),
        }
    }

    /// Create a process start error
    pub fn process_start(command: &str, reason: impl ToString) -> Self {
        Self::ProcessStart {
            command: command.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a delta generation error
    pub fn delta_failed(target: &str, reason: impl Into<String>) -> Self {
        Self::DeltaFailed {
            target: target.to_string(),
            reason: reason.into(),
        }
    }

    /// Classify the error for reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DuplicateTag { .. }
            | Error::Config(_)
            | Error::ConfigParse(_)
            | Error::FileRead { .. }
            | Error::SourceParse { .. } => ErrorKind::Configuration,
            Error::ScriptCompile(_) => ErrorKind::Compile,
            Error::ExpectTimeout { .. }
            | Error::StreamClosed { .. }
            | Error::RecordParse { .. }
            | Error::ProcessStart { .. }
            | Error::InputClosed => ErrorKind::Protocol,
            Error::Assertion { .. } => ErrorKind::Assertion,
            Error::ScriptRuntime { .. }
            | Error::DeltaFailed { .. }
            | Error::Io(_)
            | Error::Json(_) => ErrorKind::Internal,
        }
    }
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_prefix_and_duration() {
        let err = Error::ExpectTimeout {
            prefix: "*stopped".to_string(),
            timeout: Duration::from_secs(3),
        };
        let msg = err.to_string();
        assert!(msg.contains("*stopped"));
        assert!(msg.contains("3s"));
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_duplicate_tag_is_configuration_error() {
        let err = Error::duplicate_tag("A", Path::new("prog.rs"), 2, 7);
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("'A'"));
        assert!(err.to_string().contains("prog.rs"));
    }

    #[test]
    fn test_compile_error_lists_every_diagnostic() {
        let err = Error::ScriptCompile(vec![
            Diagnostic::new(3, 1, "undeclared identifier 'x'"),
            Diagnostic::new(9, 4, "unknown function 'sendd'"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("3:1: undeclared identifier 'x'"));
        assert!(msg.contains("9:4: unknown function 'sendd'"));
    }
}
