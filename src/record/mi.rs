//! GDB/MI line parser
//!
//! Grammar, one record per line:
//!
//! ```text
//! result-record  = [token] "^" class ("," result)*
//! async-record   = [token] ("*" | "+" | "=") class ("," result)*
//! stream-record  = ("~" | "@" | "&") c-string
//! result         = variable "=" value
//! value          = c-string | "{" [result ("," result)*] "}" | "[" [value|result ...] "]"
//! ```
//!
//! Lines that are none of these (program output, banners) become raw records
//! instead of errors, so `expect` can wait on arbitrary text.

use crate::common::{Error, Result};

use super::{Record, RecordKind, RecordParser, RecordValue};

const RESULT_CLASSES: &[&str] = &["done", "running", "connected", "error", "exit"];

/// Parser for GDB/MI output lines
#[derive(Debug, Default, Clone, Copy)]
pub struct MiParser;

impl RecordParser for MiParser {
    fn parse(&self, line: &str) -> Result<Record> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.trim() == "(gdb)" {
            return Ok(Record {
                kind: RecordKind::Prompt,
                text: None,
                ..Record::raw(line)
            });
        }

        let digits = line.bytes().take_while(u8::is_ascii_digit).count();
        let token = if digits > 0 {
            line[..digits].parse().ok()
        } else {
            None
        };
        let rest = &line[digits..];

        let kind = match rest.as_bytes().first() {
            Some(b'^') => RecordKind::Result,
            Some(b'*') => RecordKind::Exec,
            Some(b'+') => RecordKind::Status,
            Some(b'=') => RecordKind::Notify,
            Some(b'~') if token.is_none() => RecordKind::Console,
            Some(b'@') if token.is_none() => RecordKind::Target,
            Some(b'&') if token.is_none() => RecordKind::Log,
            _ => return Ok(Record::raw(line)),
        };

        let mut cursor = Cursor::new(line, digits + 1);

        if matches!(
            kind,
            RecordKind::Console | RecordKind::Target | RecordKind::Log
        ) {
            let text = cursor.c_string()?;
            cursor.expect_end()?;
            return Ok(Record {
                line: line.to_string(),
                token: None,
                kind,
                class: String::new(),
                results: RecordValue::Tuple(Vec::new()),
                text: Some(text),
            });
        }

        let class = cursor.class();
        if class.is_empty() {
            return Err(cursor.error("missing record class"));
        }
        if kind == RecordKind::Result && !RESULT_CLASSES.contains(&class.as_str()) {
            return Err(cursor.error(&format!("unknown result class '{class}'")));
        }

        let mut results = Vec::new();
        while !cursor.at_end() {
            cursor.eat(',')?;
            results.push(cursor.result()?);
        }

        Ok(Record {
            line: line.to_string(),
            token,
            kind,
            class,
            results: RecordValue::Tuple(results),
            text: None,
        })
    }
}

struct Cursor<'a> {
    line: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a str, pos: usize) -> Self {
        Self {
            line,
            bytes: line.as_bytes(),
            pos,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn error(&self, reason: &str) -> Error {
        Error::RecordParse {
            line: self.line.to_string(),
            reason: format!("{reason} at column {}", self.pos + 1),
        }
    }

    fn eat(&mut self, expected: char) -> Result<()> {
        if self.peek() == Some(expected as u8) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{expected}'")))
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing text"))
        }
    }

    fn class(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b',' {
                break;
            }
            self.pos += 1;
        }
        self.line[start..self.pos].to_string()
    }

    fn variable(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'=' {
                break;
            }
            if matches!(b, b',' | b'{' | b'}' | b'[' | b']' | b'"') {
                return Err(self.error("expected '=' after variable name"));
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("empty variable name"));
        }
        Ok(self.line[start..self.pos].to_string())
    }

    fn result(&mut self) -> Result<(String, RecordValue)> {
        let name = self.variable()?;
        self.eat('=')?;
        let value = self.value()?;
        Ok((name, value))
    }

    fn value(&mut self) -> Result<RecordValue> {
        match self.peek() {
            Some(b'"') => Ok(RecordValue::Const(self.c_string()?)),
            Some(b'{') => self.tuple(),
            Some(b'[') => self.list(),
            _ => Err(self.error("expected value")),
        }
    }

    fn tuple(&mut self) -> Result<RecordValue> {
        self.eat('{')?;
        let mut fields = Vec::new();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(RecordValue::Tuple(fields));
        }
        loop {
            fields.push(self.result()?);
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(RecordValue::Tuple(fields));
                }
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn list(&mut self) -> Result<RecordValue> {
        self.eat('[')?;
        let mut items = Vec::new();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(RecordValue::List(items));
        }
        let holds_values = matches!(self.peek(), Some(b'"') | Some(b'{') | Some(b'['));
        loop {
            if holds_values {
                items.push(self.value()?);
            } else {
                let (name, value) = self.result()?;
                items.push(RecordValue::Tuple(vec![(name, value)]));
            }
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(RecordValue::List(items));
                }
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    /// Quoted C string with escapes decoded
    fn c_string(&mut self) -> Result<String> {
        self.eat('"')?;
        let mut out = String::new();
        let mut chars = self.line[self.pos..].char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += offset + 1;
                    return Ok(out);
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, '0')) => out.push('\0'),
                    Some((_, other)) => out.push(other),
                    None => break,
                },
                c => out.push(c),
            }
        }
        self.pos = self.bytes.len();
        Err(self.error("unterminated string"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Record {
        MiParser.parse(line).unwrap()
    }

    #[test]
    fn test_result_record_with_token() {
        let record = parse(r#"1^done,value="42""#);
        assert_eq!(record.token, Some(1));
        assert_eq!(record.kind, RecordKind::Result);
        assert_eq!(record.class, "done");
        assert_eq!(record.find_string("value"), Some("42"));
    }

    #[test]
    fn test_stopped_async_record() {
        let record = parse(
            r#"*stopped,reason="breakpoint-hit",thread-id="1",frame={func="main",line="12",args=[]}"#,
        );
        assert_eq!(record.token, None);
        assert_eq!(record.kind, RecordKind::Exec);
        assert_eq!(record.class, "stopped");
        assert_eq!(record.find_string("reason"), Some("breakpoint-hit"));
        assert_eq!(record.find_int("frame.line"), Some(12));
        assert_eq!(record.find("frame.args"), Some(&RecordValue::List(vec![])));
    }

    #[test]
    fn test_notify_without_results() {
        let record = parse("=thread-group-added");
        assert_eq!(record.kind, RecordKind::Notify);
        assert_eq!(record.class, "thread-group-added");
    }

    #[test]
    fn test_result_list_elements() {
        let record = parse(r#"3^done,stack=[frame={level="0"},frame={level="1"}]"#);
        assert_eq!(record.find_string("stack.1.frame.level"), Some("1"));
    }

    #[test]
    fn test_escaped_quotes_in_const() {
        let record = parse(r#"4^error,msg="name \"x\" not found""#);
        assert_eq!(record.class, "error");
        assert_eq!(record.find_string("msg"), Some(r#"name "x" not found"#));
    }

    #[test]
    fn test_stream_record_decodes_escapes() {
        let record = parse(r#"~"Hello\n""#);
        assert_eq!(record.kind, RecordKind::Console);
        assert_eq!(record.text.as_deref(), Some("Hello\n"));
    }

    #[test]
    fn test_prompt_and_plain_text() {
        assert_eq!(parse("(gdb)").kind, RecordKind::Prompt);
        let record = parse("Hello World!");
        assert_eq!(record.kind, RecordKind::Raw);
        assert_eq!(record.text.as_deref(), Some("Hello World!"));
    }

    #[test]
    fn test_unknown_result_class_is_error() {
        assert!(matches!(
            MiParser.parse("7^maybe"),
            Err(Error::RecordParse { .. })
        ));
    }

    #[test]
    fn test_malformed_tuple_is_error() {
        assert!(MiParser.parse(r#"*stopped,frame={line="1""#).is_err());
        assert!(MiParser.parse(r#"2^done,value="open"#).is_err());
    }
}
