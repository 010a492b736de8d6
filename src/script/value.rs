//! Runtime values

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::record::{Record, RecordValue};

/// A dynamically typed script value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// A record returned by `expect`
    Record(Arc<Record>),
    /// A tuple or list inside a record
    Node(RecordValue),
}

impl Value {
    /// Convert a record value; constants become strings
    pub fn from_record_value(value: &RecordValue) -> Value {
        match value {
            RecordValue::Const(s) => Value::Str(s.clone()),
            other => Value::Node(other.clone()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Node(RecordValue::List(_)) => "record list",
            Value::Node(_) => "record tuple",
        }
    }

    /// Text for messages, with strings quoted
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("{s:?}"),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(Value::repr).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Map(entries) => {
                let entries: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.repr()))
                    .collect();
                write!(f, "{{{}}}", entries.join(", "))
            }
            Value::Record(record) => f.write_str(&record.line),
            Value::Node(node) => match serde_json::to_string(node) {
                Ok(json) => f.write_str(&json),
                Err(_) => write!(f, "{node:?}"),
            },
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_repr() {
        assert_eq!(Value::from("x").to_string(), "x");
        assert_eq!(Value::from("x").repr(), "\"x\"");
        let list = Value::List(vec![Value::Int(1), Value::from("a"), Value::Null]);
        assert_eq!(list.to_string(), "[1, \"a\", null]");
    }

    #[test]
    fn test_record_values_convert() {
        assert_eq!(
            Value::from_record_value(&RecordValue::Const("7".into())),
            Value::from("7")
        );
        let tuple = RecordValue::Tuple(vec![("line".into(), RecordValue::Const("7".into()))]);
        let value = Value::from_record_value(&tuple);
        assert_eq!(value.type_name(), "record tuple");
        assert_eq!(value.to_string(), r#"{"line":"7"}"#);
    }

    #[test]
    fn test_no_coercion_between_int_and_string() {
        assert_ne!(Value::Int(7), Value::from("7"));
    }
}
