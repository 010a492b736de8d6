//! Line tag collection
//!
//! A tag is `@NAME@` anywhere on a line, usually inside a trailing comment:
//!
//! ```text
//! println!("Hello World!"); // @STEP1@
//! ```
//!
//! Scripts refer to source positions through these names instead of
//! hard-coded line numbers.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::common::{Error, Result};

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r".*@([^@]+)@.*").expect("tag pattern is valid"))
}

/// Mapping from tag name to its 1-based line number
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct LineTagMap {
    tags: BTreeMap<String, usize>,
}

impl LineTagMap {
    /// Collect tags from a file on disk
    pub fn collect(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Self::collect_text(&text, path)
    }

    /// Collect tags from already loaded text; `path` is only used in errors
    pub fn collect_text(text: &str, path: &Path) -> Result<Self> {
        let mut tags = BTreeMap::new();

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let Some(captures) = tag_pattern().captures(line) else {
                continue;
            };
            let name = captures[1].trim().to_string();

            if let Some(&first) = tags.get(&name) {
                return Err(Error::duplicate_tag(&name, path, first, line_number));
            }
            tags.insert(name, line_number);
        }

        tracing::debug!(path = %path.display(), count = tags.len(), "collected line tags");
        Ok(Self { tags })
    }

    /// Line number of a tag
    pub fn get(&self, name: &str) -> Option<usize> {
        self.tags.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.tags.iter().map(|(name, line)| (name.as_str(), *line))
    }
}
