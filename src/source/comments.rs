//! Comment extraction
//!
//! Rebuilds a source file as only its comment bodies, keeping every comment
//! on the line it started on. The result is the check script hidden in the
//! file, and its line numbers match both the tag map and the source file.

use std::fmt;
use std::path::Path;

use crate::common::Result;

use super::trivia::{self, Trivia, TriviaKind};

/// Script text built from a file's comments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedScript {
    text: String,
}

impl ExtractedScript {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for ExtractedScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Extract the script from source text
///
/// Fails only when the code itself does not scan (unterminated literal,
/// unbalanced brackets). Comment contents are never validated here.
pub fn extract(source: &str, path: &Path) -> Result<ExtractedScript> {
    let trivia = trivia::scan(source, path)?;
    Ok(extract_from_trivia(&trivia))
}

/// Join comment bodies, padding with newlines so each body starts on the
/// same line as its comment
pub fn extract_from_trivia(trivia: &[Trivia]) -> ExtractedScript {
    let mut text = String::new();
    // Line the end of `text` is on, 1-based
    let mut line = 1;

    for comment in trivia {
        if comment.kind == TriviaKind::DocComment {
            continue;
        }

        while line < comment.start_line {
            text.push('\n');
            line += 1;
        }
        text.push_str(comment.body());
        line = comment.end_line;
    }

    ExtractedScript { text }
}
