//! Test cases
//!
//! A test case is a source file whose comments are its check script, plus
//! the built program the debugger should load.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::common::{Error, Result};

/// File extensions treated as test sources
pub const SOURCE_EXTENSIONS: &[&str] = &["rs", "cs", "c", "cpp"];

/// One source file to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    /// File stem of the source
    pub name: String,
    pub source: PathBuf,
    /// Program under debug, exposed to scripts as `test_bin`
    pub binary: PathBuf,
}

impl TestCase {
    /// Case for a source file; the binary defaults to the source path
    /// without its extension
    pub fn new(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let name = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.display().to_string());
        let binary = source.with_extension("");
        Self {
            name,
            source,
            binary,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }
}

/// Whether a path looks like a test source
pub fn is_test_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Find every test source under `dir`, sorted by path
pub fn discover(dir: &Path) -> Result<Vec<TestCase>> {
    let mut sources = Vec::new();
    walk(dir, &mut sources)?;
    sources.sort();
    tracing::debug!("Discovered {} test source(s) in {}", sources.len(), dir.display());
    Ok(sources.into_iter().map(TestCase::new).collect())
}

fn walk(dir: &Path, sources: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::file_read(dir, e))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, sources)?;
        } else if is_test_source(&path) {
            sources.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_defaults() {
        let case = TestCase::new("/tests/breakpoints/simple.cs");
        assert_eq!(case.name, "simple");
        assert_eq!(case.binary, PathBuf::from("/tests/breakpoints/simple"));

        let case = case.with_binary("/build/simple.dll");
        assert_eq!(case.binary, PathBuf::from("/build/simple.dll"));
    }

    #[test]
    fn test_discover_walks_tree_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.rs"), "").unwrap();
        std::fs::write(dir.path().join("a.cs"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(dir.path().join("nested").join("c.cpp"), "").unwrap();

        let cases = discover(dir.path()).unwrap();
        let names: Vec<&str> = cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_discover_missing_dir() {
        let err = discover(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
