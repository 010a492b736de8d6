//! Comment trivia scanner
//!
//! Walks a C-family source file (Rust, C, C#) the way a compiler front end
//! would, skipping string and character literals, and reports every comment
//! with its line span. Doc comments are attributes in Rust rather than trivia,
//! so they are reported with their own kind and left out of scripts.
//!
//! Block comments nest only in Rust sources. In C, C++ and C# an inner
//! `/*` is plain comment text.
//!
//! The scanner also checks that brackets balance and literals terminate, so a
//! file whose code does not even tokenize is rejected before any script is
//! built from it.

use std::path::Path;

use crate::common::{Error, Result};

/// Kind of a comment trivia node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriviaKind {
    /// `// ...`
    LineComment,
    /// `/* ... */`
    BlockComment,
    /// `/// ...`, `//! ...`, `/** ... */`, `/*! ... */`
    DocComment,
}

/// A comment with its position in the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trivia {
    pub kind: TriviaKind,
    /// Full comment text including delimiters
    pub text: String,
    /// 1-based line of the opening delimiter
    pub start_line: usize,
    /// 1-based line of the last character
    pub end_line: usize,
}

impl Trivia {
    /// Comment body without its delimiters
    pub fn body(&self) -> &str {
        match self.kind {
            TriviaKind::LineComment => &self.text[2..],
            TriviaKind::BlockComment => &self.text[2..self.text.len() - 2],
            TriviaKind::DocComment => {
                if self.text.starts_with("/*") {
                    &self.text[3..self.text.len() - 2]
                } else {
                    &self.text[3..]
                }
            }
        }
    }
}

/// Scanner state
struct Scanner<'a> {
    path: &'a Path,
    chars: Vec<char>,
    /// Whether `/*` inside a block comment opens another level
    nested_comments: bool,
    current: usize,
    line: usize,
    /// Open brackets with the line they were opened on
    brackets: Vec<(char, usize)>,
    trivia: Vec<Trivia>,
}

/// Scan a source file and return its comments in document order
pub fn scan(source: &str, path: &Path) -> Result<Vec<Trivia>> {
    let mut scanner = Scanner {
        path,
        chars: source.chars().collect(),
        nested_comments: path.extension().is_some_and(|ext| ext == "rs"),
        current: 0,
        line: 1,
        brackets: Vec::new(),
        trivia: Vec::new(),
    };
    scanner.run()?;
    Ok(scanner.trivia)
}

impl<'a> Scanner<'a> {
    fn run(&mut self) -> Result<()> {
        while !self.is_at_end() {
            let c = self.peek();
            match c {
                '/' if self.peek_at(1) == Some('/') => self.line_comment(),
                '/' if self.peek_at(1) == Some('*') => self.block_comment()?,
                '"' => {
                    self.advance();
                    self.string()?;
                }
                '\'' => self.char_or_lifetime()?,
                '@' if self.peek_at(1) == Some('"') => {
                    self.advance();
                    self.advance();
                    self.verbatim_string()?;
                }
                '(' | '[' | '{' => {
                    self.brackets.push((c, self.line));
                    self.advance();
                }
                ')' | ']' | '}' => {
                    self.close_bracket(c)?;
                    self.advance();
                }
                c if c.is_alphabetic() || c == '_' => self.identifier()?,
                c if c.is_ascii_digit() => self.number(),
                _ => {
                    self.advance();
                }
            }
        }

        if let Some((open, line)) = self.brackets.pop() {
            return Err(Error::source_parse(
                self.path,
                line,
                format!("unclosed delimiter '{open}'"),
            ));
        }
        Ok(())
    }

    fn line_comment(&mut self) {
        let start = self.current;
        let start_line = self.line;
        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
        let mut text: String = self.chars[start..self.current].iter().collect();
        if text.ends_with('\r') {
            text.pop();
        }

        let third = text.chars().nth(2);
        let fourth = text.chars().nth(3);
        let is_doc = third == Some('!') || (third == Some('/') && fourth != Some('/'));

        self.trivia.push(Trivia {
            kind: if is_doc {
                TriviaKind::DocComment
            } else {
                TriviaKind::LineComment
            },
            text,
            start_line,
            end_line: start_line,
        });
    }

    fn block_comment(&mut self) -> Result<()> {
        let start = self.current;
        let start_line = self.line;
        self.advance(); // /
        self.advance(); // *

        let mut depth = 1;
        while depth > 0 {
            if self.is_at_end() {
                return Err(Error::source_parse(
                    self.path,
                    start_line,
                    "unterminated block comment",
                ));
            }
            if self.nested_comments && self.peek() == '/' && self.peek_at(1) == Some('*') {
                self.advance();
                self.advance();
                depth += 1;
            } else if self.peek() == '*' && self.peek_at(1) == Some('/') {
                self.advance();
                self.advance();
                depth -= 1;
            } else {
                self.advance();
            }
        }

        let text: String = self.chars[start..self.current].iter().collect();
        // `/**/` and `/***` are plain comments
        let is_doc = text.len() > 4
            && (text.starts_with("/*!")
                || (text.starts_with("/**") && !text.starts_with("/***")));

        self.trivia.push(Trivia {
            kind: if is_doc {
                TriviaKind::DocComment
            } else {
                TriviaKind::BlockComment
            },
            text,
            start_line,
            end_line: self.line,
        });
        Ok(())
    }

    /// Body of a `"..."` literal; the opening quote is already consumed
    fn string(&mut self) -> Result<()> {
        let start_line = self.line;
        loop {
            if self.is_at_end() {
                return Err(Error::source_parse(
                    self.path,
                    start_line,
                    "unterminated string literal",
                ));
            }
            match self.advance() {
                '\\' => {
                    if !self.is_at_end() {
                        self.advance();
                    }
                }
                '"' => return Ok(()),
                _ => {}
            }
        }
    }

    /// C# `@"..."` literal, where `""` is an escaped quote
    fn verbatim_string(&mut self) -> Result<()> {
        let start_line = self.line;
        loop {
            if self.is_at_end() {
                return Err(Error::source_parse(
                    self.path,
                    start_line,
                    "unterminated verbatim string literal",
                ));
            }
            if self.advance() == '"' {
                if self.peek_at(0) == Some('"') {
                    self.advance();
                } else {
                    return Ok(());
                }
            }
        }
    }

    /// Rust `r"..."` / `r#"..."#`; positioned on the first `#` or `"`
    fn raw_string(&mut self) -> Result<()> {
        let start_line = self.line;
        let mut hashes = 0;
        while self.peek_at(0) == Some('#') {
            self.advance();
            hashes += 1;
        }
        if self.peek_at(0) != Some('"') {
            return Err(Error::source_parse(
                self.path,
                start_line,
                "malformed raw string literal",
            ));
        }
        self.advance();

        loop {
            if self.is_at_end() {
                return Err(Error::source_parse(
                    self.path,
                    start_line,
                    "unterminated raw string literal",
                ));
            }
            if self.advance() == '"' {
                let closing = (0..hashes).all(|i| self.peek_at(i) == Some('#'));
                if closing {
                    for _ in 0..hashes {
                        self.advance();
                    }
                    return Ok(());
                }
            }
        }
    }

    fn char_or_lifetime(&mut self) -> Result<()> {
        let start_line = self.line;
        self.advance(); // '

        match (self.peek_at(0), self.peek_at(1)) {
            (Some('\\'), _) => {
                loop {
                    match self.peek_at(0) {
                        None | Some('\n') => {
                            return Err(Error::source_parse(
                                self.path,
                                start_line,
                                "unterminated character literal",
                            ));
                        }
                        Some('\\') => {
                            self.advance();
                            if !self.is_at_end() {
                                self.advance();
                            }
                        }
                        Some('\'') => {
                            self.advance();
                            return Ok(());
                        }
                        Some(_) => {
                            self.advance();
                        }
                    }
                }
            }
            (Some(c), Some('\'')) if c != '\n' => {
                self.advance();
                self.advance();
                Ok(())
            }
            // Lifetime or label: the name is scanned as an identifier next
            _ => Ok(()),
        }
    }

    fn identifier(&mut self) -> Result<()> {
        let start = self.current;
        while !self.is_at_end() && (self.peek().is_alphanumeric() || self.peek() == '_') {
            self.advance();
        }
        let ident: String = self.chars[start..self.current].iter().collect();

        let next = self.peek_at(0);
        if matches!(ident.as_str(), "r" | "br" | "cr") && matches!(next, Some('"') | Some('#')) {
            // `r#ident` is a raw identifier, not a string
            if next == Some('#') && self.peek_at(1).is_some_and(|c| c != '"' && c != '#') {
                self.advance();
                return Ok(());
            }
            return self.raw_string();
        }
        Ok(())
    }

    fn number(&mut self) {
        while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == '_') {
            self.advance();
        }
    }

    fn close_bracket(&mut self, close: char) -> Result<()> {
        let expected = match close {
            ')' => '(',
            ']' => '[',
            _ => '{',
        };
        match self.brackets.pop() {
            Some((open, _)) if open == expected => Ok(()),
            Some((open, line)) => Err(Error::source_parse(
                self.path,
                self.line,
                format!("mismatched closing delimiter '{close}' for '{open}' opened on line {line}"),
            )),
            None => Err(Error::source_parse(
                self.path,
                self.line,
                format!("unexpected closing delimiter '{close}'"),
            )),
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn peek(&self) -> char {
        self.chars[self.current]
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.current + offset).copied()
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
        }
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comments(source: &str) -> Vec<Trivia> {
        scan(source, Path::new("test.rs")).unwrap()
    }

    #[test]
    fn test_line_and_block_comments_in_order() {
        let trivia = comments("// one\nfn main() { /* two\n three */ }\n");
        assert_eq!(trivia.len(), 2);
        assert_eq!(trivia[0].kind, TriviaKind::LineComment);
        assert_eq!(trivia[0].body(), " one");
        assert_eq!((trivia[0].start_line, trivia[0].end_line), (1, 1));
        assert_eq!(trivia[1].kind, TriviaKind::BlockComment);
        assert_eq!(trivia[1].body(), " two\n three ");
        assert_eq!((trivia[1].start_line, trivia[1].end_line), (2, 3));
    }

    #[test]
    fn test_comment_markers_inside_strings_are_not_comments() {
        let trivia = comments(
            "let a = \"// not\";\nlet b = r#\"/* nor \"this\" */\"#;\nlet c = '/'; // yes\n",
        );
        assert_eq!(trivia.len(), 1);
        assert_eq!(trivia[0].body(), " yes");
        assert_eq!(trivia[0].start_line, 3);
    }

    #[test]
    fn test_lifetimes_do_not_open_char_literals() {
        let trivia = comments("fn f<'a>(x: &'a str) -> &'a str { x } // ok\n");
        assert_eq!(trivia.len(), 1);
        assert_eq!(trivia[0].body(), " ok");
    }

    #[test]
    fn test_nested_block_comments() {
        let trivia = comments("/* outer /* inner */ still outer */ fn f() {}\n");
        assert_eq!(trivia.len(), 1);
        assert_eq!(trivia[0].body(), " outer /* inner */ still outer ");
    }

    #[test]
    fn test_doc_comments_are_classified() {
        let trivia = comments("/// doc\n//! inner\n//// plain\n/** doc */\n/**/\n");
        let kinds: Vec<_> = trivia.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TriviaKind::DocComment,
                TriviaKind::DocComment,
                TriviaKind::LineComment,
                TriviaKind::DocComment,
                TriviaKind::BlockComment,
            ]
        );
    }

    #[test]
    fn test_block_comments_do_not_nest_outside_rust() {
        let source = "class P {\n  /* old /* note */\n  static void Main() {} // send(\"x\");\n}\n";
        for name in ["Program.cs", "main.c", "main.cpp"] {
            let trivia = scan(source, Path::new(name)).unwrap();
            assert_eq!(trivia.len(), 2, "{name}");
            assert_eq!(trivia[0].kind, TriviaKind::BlockComment);
            assert_eq!(trivia[0].body(), " old /* note ");
            assert_eq!((trivia[0].start_line, trivia[0].end_line), (2, 2));
            assert_eq!(trivia[1].body(), " send(\"x\");");
            assert_eq!(trivia[1].start_line, 3);
        }

        let err = scan(source, Path::new("main.rs")).unwrap_err();
        assert!(matches!(err, Error::SourceParse { line: 2, .. }));
    }

    #[test]
    fn test_csharp_verbatim_string() {
        let trivia = comments("var p = @\"C:\\dir\"\"//x\"; // real\n");
        assert_eq!(trivia.len(), 1);
        assert_eq!(trivia[0].body(), " real");
    }

    #[test]
    fn test_unterminated_block_comment_is_rejected() {
        let err = scan("fn main() {}\n/* open\n", Path::new("bad.rs")).unwrap_err();
        assert!(matches!(err, Error::SourceParse { line: 2, .. }));
    }

    #[test]
    fn test_unbalanced_brackets_are_rejected() {
        let err = scan("fn main() {\n    call(1;\n}\n", Path::new("bad.rs")).unwrap_err();
        assert!(matches!(err, Error::SourceParse { .. }));
        let err = scan("fn main() {\n", Path::new("bad.rs")).unwrap_err();
        assert!(matches!(err, Error::SourceParse { line: 1, .. }));
    }

    #[test]
    fn test_crlf_line_comment_drops_carriage_return() {
        let trivia = comments("x(); // a\r\ny(); // b\r\n");
        assert_eq!(trivia[0].body(), " a");
        assert_eq!(trivia[1].start_line, 2);
    }
}
