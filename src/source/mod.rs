//! Test source files
//!
//! A test source is ordinary program text that doubles as a check script:
//! line tags name positions in the code and the comments hold the script.

pub mod comments;
pub mod tags;
pub mod trivia;

use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

pub use comments::ExtractedScript;
pub use tags::LineTagMap;

/// A loaded test source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
}

impl SourceFile {
    /// Read a source file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            text,
        })
    }

    /// Wrap in-memory text
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Collect the line tags of this file
    pub fn tags(&self) -> Result<LineTagMap> {
        LineTagMap::collect_text(&self.text, &self.path)
    }

    /// Extract the comment script of this file
    pub fn script(&self) -> Result<ExtractedScript> {
        comments::extract(&self.text, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csharp_source_tags_and_script() {
        let source = SourceFile::from_text(
            "Program.cs",
            "class Program {\n    /* legacy /* marker */\n    static void Main() {} // //@MAIN@\n}\n// send(\"ping\");\n",
        );

        assert_eq!(source.path(), Path::new("Program.cs"));
        assert_eq!(source.tags().unwrap().get("MAIN"), Some(3));

        let script = source.script().unwrap();
        let lines: Vec<&str> = script.as_str().lines().collect();
        assert_eq!(lines[1], " legacy /* marker ");
        assert_eq!(lines[2], " //@MAIN@");
        assert_eq!(lines[4], " send(\"ping\");");
    }
}
