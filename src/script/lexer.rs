//! Script lexer

use super::token::{Token, TokenKind};
use super::Diagnostic;

/// Lexer state for tokenizing script text
pub struct Lexer {
    chars: Vec<char>,
    current: usize,
    line: usize,
    column: usize,
    start_line: usize,
    start_column: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            current: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
            diagnostics: Vec::new(),
        }
    }

    /// Tokenize the whole script, returning tokens and any diagnostics
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            if let Scanned::Token(token) = self.next_token() {
                let is_eof = token.kind == TokenKind::Eof;
                tokens.push(token);
                if is_eof {
                    break;
                }
            }
        }
        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Scanned {
        self.skip_whitespace_and_comments();

        self.start_line = self.line;
        self.start_column = self.column;

        if self.is_at_end() {
            return self.make(TokenKind::Eof);
        }

        let c = self.advance();
        match c {
            '(' => self.make(TokenKind::LeftParen),
            ')' => self.make(TokenKind::RightParen),
            '{' => self.make(TokenKind::LeftBrace),
            '}' => self.make(TokenKind::RightBrace),
            '[' => self.make(TokenKind::LeftBracket),
            ']' => self.make(TokenKind::RightBracket),
            ',' => self.make(TokenKind::Comma),
            ';' => self.make(TokenKind::Semicolon),
            '.' => self.make(TokenKind::Dot),
            '+' => self.make(TokenKind::Plus),
            '-' => self.make(TokenKind::Minus),
            '*' => self.make(TokenKind::Star),
            '/' => self.make(TokenKind::Slash),
            '%' => self.make(TokenKind::Percent),
            '=' => self.either('=', TokenKind::EqualEqual, TokenKind::Equal),
            '!' => self.either('=', TokenKind::BangEqual, TokenKind::Bang),
            '<' => self.either('=', TokenKind::LessEqual, TokenKind::Less),
            '>' => self.either('=', TokenKind::GreaterEqual, TokenKind::Greater),
            '&' if self.match_char('&') => self.make(TokenKind::AmpAmp),
            '|' if self.match_char('|') => self.make(TokenKind::PipePipe),
            '"' => self.string(),
            c if c.is_ascii_digit() => self.number(c),
            c if c.is_alphabetic() || c == '_' => self.identifier(c),
            _ => self.error(format!("unexpected character '{c}'")),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                ' ' | '\r' | '\t' | '\n' => {
                    self.advance();
                }
                '/' if self.peek_next() == Some('/') => {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                '/' if self.peek_next() == Some('*') => {
                    let line = self.line;
                    let column = self.column;
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while !self.is_at_end() {
                        if self.peek() == '*' && self.peek_next() == Some('/') {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        self.diagnostics
                            .push(Diagnostic::new(line, column, "unterminated comment"));
                    }
                }
                _ => return,
            }
        }
    }

    fn string(&mut self) -> Scanned {
        let mut value = String::new();
        loop {
            if self.is_at_end() || self.peek() == '\n' {
                return self.error("unterminated string literal".to_string());
            }
            match self.advance() {
                '"' => return self.make(TokenKind::Str(value)),
                '\\' => {
                    if self.is_at_end() {
                        return self.error("unterminated string literal".to_string());
                    }
                    match self.advance() {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '0' => value.push('\0'),
                        '"' => value.push('"'),
                        '\\' => value.push('\\'),
                        other => {
                            self.diagnostics.push(Diagnostic::new(
                                self.line,
                                self.column - 1,
                                format!("unknown escape '\\{other}'"),
                            ));
                        }
                    }
                }
                c => value.push(c),
            }
        }
    }

    fn number(&mut self, first: char) -> Scanned {
        let mut digits = String::from(first);
        while !self.is_at_end() && (self.peek().is_ascii_digit() || self.peek() == '_') {
            let c = self.advance();
            if c != '_' {
                digits.push(c);
            }
        }
        match digits.parse() {
            Ok(n) => self.make(TokenKind::Int(n)),
            Err(_) => self.error(format!("integer literal '{digits}' is too large")),
        }
    }

    fn identifier(&mut self, first: char) -> Scanned {
        let mut name = String::from(first);
        while !self.is_at_end() && (self.peek().is_alphanumeric() || self.peek() == '_') {
            name.push(self.advance());
        }
        let kind = TokenKind::keyword(&name).unwrap_or(TokenKind::Ident(name));
        self.make(kind)
    }

    fn either(&mut self, next: char, matched: TokenKind, single: TokenKind) -> Scanned {
        if self.match_char(next) {
            self.make(matched)
        } else {
            self.make(single)
        }
    }

    fn make(&self, kind: TokenKind) -> Scanned {
        Scanned::Token(Token {
            kind,
            line: self.start_line,
            column: self.start_column,
        })
    }

    fn error(&mut self, message: String) -> Scanned {
        self.diagnostics
            .push(Diagnostic::new(self.start_line, self.start_column, message));
        Scanned::Skipped
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn peek(&self) -> char {
        self.chars[self.current]
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.current + 1).copied()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }
}

/// Outcome of scanning one token
enum Scanned {
    Token(Token),
    /// Bad input, already reported
    Skipped,
}
