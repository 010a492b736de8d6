//! Script parser
//!
//! Recursive descent for statements, precedence climbing for expressions.
//! On a syntax error the parser reports it, skips to the next `;` or `}`
//! and keeps going, so one compile shows every mistake.
//!
//! Nesting is capped at [`MAX_NESTING`] levels. Operator and postfix chains
//! count towards it, since they deepen the tree just like parentheses do.

use super::ast::*;
use super::token::{Token, TokenKind};
use super::Diagnostic;

/// Deepest nesting of blocks and expressions a script may use
pub const MAX_NESTING: usize = 64;

/// Operator precedence levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Or,         // ||
    And,        // &&
    Equality,   // == !=
    Comparison, // < <= > >=
    Term,       // + -
    Factor,     // * / %
}

fn binary_op(kind: &TokenKind) -> Option<(BinaryOp, Precedence)> {
    Some(match kind {
        TokenKind::PipePipe => (BinaryOp::Or, Precedence::Or),
        TokenKind::AmpAmp => (BinaryOp::And, Precedence::And),
        TokenKind::EqualEqual => (BinaryOp::Eq, Precedence::Equality),
        TokenKind::BangEqual => (BinaryOp::Ne, Precedence::Equality),
        TokenKind::Less => (BinaryOp::Lt, Precedence::Comparison),
        TokenKind::LessEqual => (BinaryOp::Le, Precedence::Comparison),
        TokenKind::Greater => (BinaryOp::Gt, Precedence::Comparison),
        TokenKind::GreaterEqual => (BinaryOp::Ge, Precedence::Comparison),
        TokenKind::Plus => (BinaryOp::Add, Precedence::Term),
        TokenKind::Minus => (BinaryOp::Sub, Precedence::Term),
        TokenKind::Star => (BinaryOp::Mul, Precedence::Factor),
        TokenKind::Slash => (BinaryOp::Div, Precedence::Factor),
        TokenKind::Percent => (BinaryOp::Rem, Precedence::Factor),
        _ => return None,
    })
}

/// Marker for an error that has already been recorded
struct Reported;

type ParseResult<T> = Result<T, Reported>;

/// Parser state for building a program from tokens
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    diagnostics: Vec<Diagnostic>,
    /// Current nesting level
    depth: usize,
}

impl Parser {
    /// `tokens` must end with an `Eof` token
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    pub fn parse(mut self) -> (Program, Vec<Diagnostic>) {
        let mut stmts = Vec::new();
        while !self.is_at_end() {
            let start = self.current;
            let result = self.statement();
            self.depth = 0;
            match result {
                Ok(stmt) => stmts.push(stmt),
                Err(Reported) => {
                    self.synchronize();
                    // A stray `}` stops synchronize without moving
                    if self.current == start {
                        self.advance();
                    }
                }
            }
        }
        (Program { stmts }, self.diagnostics)
    }

    // === Statements ===

    fn statement(&mut self) -> ParseResult<Stmt> {
        let line = self.peek().line;
        let kind = match self.peek().kind {
            TokenKind::Let => self.let_statement()?,
            TokenKind::If => return self.if_statement(),
            TokenKind::While => {
                self.advance();
                let cond = self.expression()?;
                let body = self.block()?;
                StmtKind::While { cond, body }
            }
            TokenKind::For => {
                self.advance();
                let var = self.identifier("a loop variable")?;
                self.consume(TokenKind::In, "'in' after loop variable")?;
                let iter = self.expression()?;
                let body = self.block()?;
                StmtKind::For { var, iter, body }
            }
            TokenKind::Checkpoint => {
                self.advance();
                let name = match self.peek().kind.clone() {
                    TokenKind::Str(name) => {
                        self.advance();
                        name
                    }
                    _ => return Err(self.error_here("expected checkpoint name string")),
                };
                let body = self.block()?;
                StmtKind::Checkpoint { name, body }
            }
            TokenKind::LeftBrace => StmtKind::Block(self.block()?),
            TokenKind::Ident(_) if self.peek_at(1) == Some(&TokenKind::Equal) => {
                let name = self.identifier("a variable name")?;
                self.advance(); // =
                let value = self.expression()?;
                self.consume(TokenKind::Semicolon, "';' after assignment")?;
                StmtKind::Assign { name, value }
            }
            _ => {
                let expr = self.expression()?;
                self.consume(TokenKind::Semicolon, "';' after expression")?;
                StmtKind::Expr(expr)
            }
        };
        Ok(Stmt { kind, line })
    }

    fn let_statement(&mut self) -> ParseResult<StmtKind> {
        self.advance(); // let
        let name = self.identifier("a variable name")?;
        self.consume(TokenKind::Equal, "'=' after variable name")?;
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "';' after let statement")?;
        Ok(StmtKind::Let { name, value })
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.advance().line; // if
        let cond = self.expression()?;
        let then_block = self.block()?;

        let else_branch = if self.match_token(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                Some(Box::new(self.if_statement()?))
            } else {
                let else_line = self.peek().line;
                Some(Box::new(Stmt {
                    kind: StmtKind::Block(self.block()?),
                    line: else_line,
                }))
            }
        } else {
            None
        };

        Ok(Stmt {
            kind: StmtKind::If {
                cond,
                then_block,
                else_branch,
            },
            line,
        })
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.consume(TokenKind::LeftBrace, "'{'")?;
        self.enter()?;
        let base = self.depth;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            let result = self.statement();
            self.depth = base;
            match result {
                Ok(stmt) => stmts.push(stmt),
                Err(Reported) => self.synchronize(),
            }
        }
        self.consume(TokenKind::RightBrace, "'}' to close block")?;
        self.leave();
        Ok(stmts)
    }

    // === Expressions ===

    fn expression(&mut self) -> ParseResult<Expr> {
        self.binary(Precedence::Lowest)
    }

    /// Parse operators binding tighter than `min`
    fn binary(&mut self, min: Precedence) -> ParseResult<Expr> {
        let mut left = self.unary()?;
        let base = self.depth;
        while let Some((op, prec)) = binary_op(&self.peek().kind) {
            if prec <= min {
                break;
            }
            self.enter()?;
            let token = self.advance();
            let right = self.binary(prec)?;
            left = Expr {
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line: token.line,
                column: token.column,
            };
        }
        self.depth = base;
        Ok(left)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.postfix(),
        };
        self.enter()?;
        let token = self.advance();
        let operand = self.unary()?;
        self.leave();
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            line: token.line,
            column: token.column,
        })
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        let base = self.depth;
        loop {
            if matches!(
                self.peek().kind,
                TokenKind::Dot | TokenKind::LeftBracket | TokenKind::LeftParen
            ) {
                self.enter()?;
            }
            if self.check(&TokenKind::Dot) {
                let dot = self.advance();
                let name = self.identifier("a field or method name after '.'")?;
                if self.match_token(&TokenKind::LeftParen) {
                    let args = self.arguments()?;
                    expr = Expr {
                        kind: ExprKind::MethodCall {
                            object: Box::new(expr),
                            method: name,
                            args,
                        },
                        line: dot.line,
                        column: dot.column,
                    };
                } else {
                    expr = Expr {
                        kind: ExprKind::Field {
                            object: Box::new(expr),
                            name,
                        },
                        line: dot.line,
                        column: dot.column,
                    };
                }
            } else if self.check(&TokenKind::LeftBracket) {
                let bracket = self.advance();
                let index = self.expression()?;
                self.consume(TokenKind::RightBracket, "']' after index")?;
                expr = Expr {
                    kind: ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    line: bracket.line,
                    column: bracket.column,
                };
            } else if self.check(&TokenKind::LeftParen) {
                let ExprKind::Ident(name) = &expr.kind else {
                    return Err(self.error_here("only functions and methods can be called"));
                };
                let name = name.clone();
                self.advance();
                let args = self.arguments()?;
                expr = Expr {
                    kind: ExprKind::Call { name, args },
                    line: expr.line,
                    column: expr.column,
                };
            } else {
                self.depth = base;
                return Ok(expr);
            }
        }
    }

    /// Arguments after the opening parenthesis
    fn arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.expression()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "')' after arguments")?;
        Ok(args)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        let kind = match token.kind {
            TokenKind::Int(n) => ExprKind::Int(n),
            TokenKind::Str(s) => ExprKind::Str(s),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::Null => ExprKind::Null,
            TokenKind::Ident(name) => ExprKind::Ident(name),
            TokenKind::LeftParen => {
                self.enter()?;
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RightParen, "')' after expression")?;
                self.leave();
                return Ok(inner);
            }
            TokenKind::LeftBracket => {
                self.enter()?;
                self.advance();
                let mut items = Vec::new();
                if !self.check(&TokenKind::RightBracket) {
                    loop {
                        items.push(self.expression()?);
                        if !self.match_token(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenKind::RightBracket, "']' after list")?;
                self.leave();
                return Ok(Expr {
                    kind: ExprKind::List(items),
                    line: token.line,
                    column: token.column,
                });
            }
            _ => return Err(self.error_here("expected expression")),
        };
        self.advance();
        Ok(Expr {
            kind,
            line: token.line,
            column: token.column,
        })
    }

    // === Helpers ===

    fn enter(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_here(&format!("nesting deeper than {MAX_NESTING} levels")));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn identifier(&mut self, what: &str) -> ParseResult<String> {
        match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_here(&format!("expected {what}"))),
        }
    }

    fn consume(&mut self, kind: TokenKind, what: &str) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(&format!("expected {what}")))
        }
    }

    fn error_here(&mut self, message: &str) -> Reported {
        let token = self.peek();
        let message = format!("{message}, found {}", token.kind);
        self.diagnostics
            .push(Diagnostic::new(token.line, token.column, message));
        Reported
    }

    /// Skip to just past the next `;`, or up to a `}` or statement keyword
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            match self.peek().kind {
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::RightBrace
                | TokenKind::Let
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Checkpoint => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }
}
