//! Compile-time checks
//!
//! Runs after parsing and before the debugger is started. Everything that
//! can be known without running the script is checked here: names must be
//! declared, globals are read-only, builtins and methods must exist and get
//! the right number of arguments.

use std::collections::HashSet;

use super::ast::*;
use super::globals::ScriptGlobals;
use super::interp::Interpreter;
use super::Diagnostic;
use crate::common::Result;

/// Read-only names every script can use
pub const GLOBALS: &[&str] = &["lines", "test_source", "test_bin"];

/// Argument count accepted by a builtin or method
#[derive(Debug, Clone, Copy)]
pub struct Arity {
    pub min: usize,
    /// `None` for variadic
    pub max: Option<usize>,
}

impl Arity {
    const fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    const fn between(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }

    fn describe(&self) -> String {
        match self.max {
            Some(max) if max == self.min => format!("{max}"),
            Some(max) => format!("{} to {max}", self.min),
            None => format!("at least {}", self.min),
        }
    }
}

const BUILTINS: &[(&str, Arity)] = &[
    ("send", Arity::exactly(1)),
    ("expect", Arity::between(1, 2)),
    ("assert", Arity::between(1, 2)),
    ("assert_eq", Arity::between(2, 3)),
    ("assert_ne", Arity::between(2, 3)),
    ("log", Arity::at_least(0)),
    ("format", Arity::at_least(1)),
    ("int", Arity::exactly(1)),
    ("str", Arity::exactly(1)),
    ("len", Arity::exactly(1)),
    ("line", Arity::exactly(1)),
    ("file_name", Arity::exactly(1)),
    ("generate_delta", Arity::exactly(2)),
];

const METHODS: &[(&str, Arity)] = &[
    ("find", Arity::exactly(1)),
    ("find_string", Arity::exactly(1)),
    ("find_int", Arity::exactly(1)),
    ("has", Arity::exactly(1)),
    ("class", Arity::exactly(0)),
    ("token", Arity::exactly(0)),
    ("kind", Arity::exactly(0)),
    ("text", Arity::exactly(0)),
    ("contains", Arity::exactly(1)),
    ("starts_with", Arity::exactly(1)),
];

fn builtin(name: &str) -> Option<Arity> {
    BUILTINS.iter().find(|(n, _)| *n == name).map(|(_, a)| *a)
}

fn method(name: &str) -> Option<Arity> {
    METHODS.iter().find(|(n, _)| *n == name).map(|(_, a)| *a)
}

/// A script that passed every compile-time check
#[derive(Debug, Clone)]
pub struct CompiledScript {
    program: Program,
}

impl CompiledScript {
    pub(super) fn new(program: Program) -> Self {
        Self { program }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Execute the script against a live debugger
    pub async fn run(&self, globals: &mut ScriptGlobals) -> Result<()> {
        Interpreter::new(globals).run(&self.program).await
    }
}

/// Check names and calls, returning every problem found
pub fn resolve(program: &Program) -> Vec<Diagnostic> {
    let mut resolver = Resolver {
        scopes: vec![HashSet::new()],
        diagnostics: Vec::new(),
    };
    resolver.block(&program.stmts);
    resolver.diagnostics
}

struct Resolver {
    scopes: Vec<HashSet<String>>,
    diagnostics: Vec<Diagnostic>,
}

impl Resolver {
    fn block(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn scoped(&mut self, stmts: &[Stmt], binding: Option<&str>) {
        let mut scope = HashSet::new();
        if let Some(name) = binding {
            scope.insert(name.to_string());
        }
        self.scopes.push(scope);
        self.block(stmts);
        self.scopes.pop();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Let { name, value } => {
                self.expr(value);
                if GLOBALS.contains(&name.as_str()) {
                    self.report(stmt.line, 1, format!("cannot redeclare global '{name}'"));
                } else if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name.clone());
                }
            }
            StmtKind::Assign { name, value } => {
                self.expr(value);
                if GLOBALS.contains(&name.as_str()) {
                    self.report(stmt.line, 1, format!("cannot assign to global '{name}'"));
                } else if !self.is_declared(name) {
                    self.report(
                        stmt.line,
                        1,
                        format!("assignment to undeclared variable '{name}'"),
                    );
                }
            }
            StmtKind::Expr(expr) => self.expr(expr),
            StmtKind::If {
                cond,
                then_block,
                else_branch,
            } => {
                self.expr(cond);
                self.scoped(then_block, None);
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch);
                }
            }
            StmtKind::While { cond, body } => {
                self.expr(cond);
                self.scoped(body, None);
            }
            StmtKind::For { var, iter, body } => {
                self.expr(iter);
                if GLOBALS.contains(&var.as_str()) {
                    self.report(stmt.line, 1, format!("cannot redeclare global '{var}'"));
                }
                self.scoped(body, Some(var));
            }
            StmtKind::Block(body) | StmtKind::Checkpoint { body, .. } => {
                self.scoped(body, None);
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Int(_) | ExprKind::Str(_) | ExprKind::Bool(_) | ExprKind::Null => {}
            ExprKind::List(items) => items.iter().for_each(|item| self.expr(item)),
            ExprKind::Ident(name) => {
                if !self.is_declared(name) && !GLOBALS.contains(&name.as_str()) {
                    let hint = if builtin(name).is_some() {
                        format!("'{name}' is a function and must be called")
                    } else {
                        format!("undeclared identifier '{name}'")
                    };
                    self.report(expr.line, expr.column, hint);
                }
            }
            ExprKind::Unary { operand, .. } => self.expr(operand),
            ExprKind::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            ExprKind::Field { object, .. } => self.expr(object),
            ExprKind::Index { object, index } => {
                self.expr(object);
                self.expr(index);
            }
            ExprKind::Call { name, args } => {
                match builtin(name) {
                    Some(arity) if !arity.accepts(args.len()) => self.report(
                        expr.line,
                        expr.column,
                        format!(
                            "'{name}' takes {} argument(s), {} given",
                            arity.describe(),
                            args.len()
                        ),
                    ),
                    Some(_) => {}
                    None => {
                        self.report(expr.line, expr.column, format!("unknown function '{name}'"))
                    }
                }
                args.iter().for_each(|arg| self.expr(arg));
            }
            ExprKind::MethodCall {
                object,
                method: name,
                args,
            } => {
                self.expr(object);
                match method(name) {
                    Some(arity) if !arity.accepts(args.len()) => self.report(
                        expr.line,
                        expr.column,
                        format!(
                            "method '{name}' takes {} argument(s), {} given",
                            arity.describe(),
                            args.len()
                        ),
                    ),
                    Some(_) => {}
                    None => {
                        self.report(expr.line, expr.column, format!("unknown method '{name}'"))
                    }
                }
                args.iter().for_each(|arg| self.expr(arg));
            }
        }
    }

    fn is_declared(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains(name))
    }

    fn report(&mut self, line: usize, column: usize, message: String) {
        self.diagnostics.push(Diagnostic::new(line, column, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::lexer::Lexer;
    use crate::script::parser::Parser;

    fn check(source: &str) -> Vec<Diagnostic> {
        let (tokens, lex) = Lexer::new(source).tokenize();
        assert!(lex.is_empty());
        let (program, parse) = Parser::new(tokens).parse();
        assert!(parse.is_empty(), "{parse:?}");
        resolve(&program)
    }

    #[test]
    fn test_valid_script_has_no_diagnostics() {
        let diagnostics = check(
            "send(\"1-break-insert \" + str(lines[\"BP\"]));\n\
             let r = expect(\"1^done\");\n\
             assert_eq(lines[\"BP\"], r.find_int(\"bkpt.line\"));\n\
             for l in [1, 2] { log(l, test_source, test_bin); }",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn test_undeclared_identifier() {
        let diagnostics = check("send(x);");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "undeclared identifier 'x'");
    }

    #[test]
    fn test_block_scoping() {
        let diagnostics = check("if true { let a = 1; }\nlog(a);");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 2);
    }

    #[test]
    fn test_globals_are_read_only() {
        let diagnostics = check("lines = 1;\nlet test_bin = 2;");
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].message.contains("cannot assign to global"));
        assert!(diagnostics[1].message.contains("cannot redeclare global"));
    }

    #[test]
    fn test_unknown_function_and_arity() {
        let diagnostics = check("sned(\"x\");\nsend();\nexpect(\"a\", 1, 2);");
        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics[0].message, "unknown function 'sned'");
        assert_eq!(diagnostics[1].message, "'send' takes 1 argument(s), 0 given");
        assert_eq!(
            diagnostics[2].message,
            "'expect' takes 1 to 2 argument(s), 3 given"
        );
    }

    #[test]
    fn test_unknown_method() {
        let diagnostics = check("let r = expect(\"x\");\nr.findd(\"a\");");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 2);
        assert_eq!(diagnostics[0].message, "unknown method 'findd'");
    }

    #[test]
    fn test_builtin_name_used_as_value() {
        let diagnostics = check("let f = send;");
        assert!(diagnostics[0].message.contains("must be called"));
    }
}
