//! Protocol records
//!
//! The bridge only knows lines. When `expect` matches a line it hands it to a
//! [`RecordParser`], which turns it into a [`Record`] scripts can query.

pub mod mi;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::common::Result;

pub use mi::MiParser;

/// Turns a raw protocol line into a structured record
pub trait RecordParser: Send + Sync {
    fn parse(&self, line: &str) -> Result<Record>;
}

/// Parser that keeps lines as they are
#[derive(Debug, Default, Clone, Copy)]
pub struct RawParser;

impl RecordParser for RawParser {
    fn parse(&self, line: &str) -> Result<Record> {
        Ok(Record::raw(line))
    }
}

/// What sort of line a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// `^done`, `^error`, ...
    Result,
    /// `*stopped`, `*running`
    Exec,
    /// `+download`
    Status,
    /// `=thread-created`, `=breakpoint-modified`
    Notify,
    /// `~"text"`
    Console,
    /// `@"text"`
    Target,
    /// `&"text"`
    Log,
    /// `(gdb)`
    Prompt,
    /// Anything else
    Raw,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Result => "result",
            RecordKind::Exec => "exec",
            RecordKind::Status => "status",
            RecordKind::Notify => "notify",
            RecordKind::Console => "console",
            RecordKind::Target => "target",
            RecordKind::Log => "log",
            RecordKind::Prompt => "prompt",
            RecordKind::Raw => "raw",
        }
    }
}

/// A value inside a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValue {
    Const(String),
    /// Named fields in wire order; names may repeat
    Tuple(Vec<(String, RecordValue)>),
    List(Vec<RecordValue>),
}

impl RecordValue {
    /// First field with this name, for tuples
    pub fn field(&self, name: &str) -> Option<&RecordValue> {
        match self {
            RecordValue::Tuple(fields) => lookup(fields, name),
            _ => None,
        }
    }

    /// Follow a dotted path such as `frame.line` or `bkpts.0.number`
    pub fn find(&self, path: &str) -> Option<&RecordValue> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |value, segment| value.step(segment))
    }

    fn step(&self, segment: &str) -> Option<&RecordValue> {
        match self {
            RecordValue::Tuple(fields) => lookup(fields, segment),
            RecordValue::List(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)
            }
            RecordValue::Const(_) => None,
        }
    }

    pub fn as_const(&self) -> Option<&str> {
        match self {
            RecordValue::Const(s) => Some(s),
            _ => None,
        }
    }
}

fn lookup<'a>(fields: &'a [(String, RecordValue)], name: &str) -> Option<&'a RecordValue> {
    fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
}

impl Serialize for RecordValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            RecordValue::Const(s) => serializer.serialize_str(s),
            RecordValue::Tuple(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            RecordValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// A parsed protocol line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// The line as received
    pub line: String,
    /// Leading numeric token, if any
    pub token: Option<u64>,
    pub kind: RecordKind,
    /// Result or async class (`done`, `stopped`); empty for other kinds
    pub class: String,
    /// Top-level results as a tuple
    pub results: RecordValue,
    /// Decoded text of stream records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Record {
    /// A record for a line with no further structure
    pub fn raw(line: &str) -> Self {
        Self {
            line: line.to_string(),
            token: None,
            kind: RecordKind::Raw,
            class: String::new(),
            results: RecordValue::Tuple(Vec::new()),
            text: Some(line.to_string()),
        }
    }

    /// Follow a dotted path through the results
    pub fn find(&self, path: &str) -> Option<&RecordValue> {
        self.results.find(path)
    }

    /// String at a dotted path
    pub fn find_string(&self, path: &str) -> Option<&str> {
        self.find(path).and_then(RecordValue::as_const)
    }

    /// Integer at a dotted path
    pub fn find_int(&self, path: &str) -> Option<i64> {
        self.find_string(path).and_then(|s| s.trim().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        MiParser
            .parse(r#"5^done,bkpt={number="2",line="14"},bkpts=[{number="3"},{number="4"}]"#)
            .unwrap()
    }

    #[test]
    fn test_find_dotted_paths() {
        let record = sample();
        assert_eq!(record.find_string("bkpt.number"), Some("2"));
        assert_eq!(record.find_int("bkpt.line"), Some(14));
        assert_eq!(record.find_int("bkpts.1.number"), Some(4));
        assert_eq!(record.find("bkpts.7"), None);
        assert_eq!(record.find("missing"), None);
    }

    #[test]
    fn test_record_serializes_results_as_json_object() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["token"], 5);
        assert_eq!(json["kind"], "result");
        assert_eq!(json["class"], "done");
        assert_eq!(json["results"]["bkpt"]["line"], "14");
        assert_eq!(json["results"]["bkpts"][0]["number"], "3");
    }

    #[test]
    fn test_raw_parser_keeps_text() {
        let record = RawParser.parse("pong").unwrap();
        assert_eq!(record.kind, RecordKind::Raw);
        assert_eq!(record.text.as_deref(), Some("pong"));
    }
}
